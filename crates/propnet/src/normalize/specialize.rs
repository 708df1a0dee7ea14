use rustc_hash::FxHashMap;

use crate::{
    symbol::{Keywords, Symbol, SymbolTable},
    term::{Expression, Fact, FxIndexSet, Implication, Substitution, Term},
};

/// What can stand at an argument path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Occupant {
    Constant,
    Functor(Symbol, usize),
}

/// A canonical relation plus the argument indices leading into nested function terms.
type Path = (Symbol, Vec<usize>);

fn walk_term(
    term: &Term,
    path: &mut Vec<usize>,
    relation: Symbol,
    visit: &mut impl FnMut(&Path, &Term),
) {
    visit(&(relation, path.clone()), term);

    if let Term::Function(_, arguments) = term {
        for (index, argument) in arguments.iter().enumerate() {
            path.push(index);
            walk_term(argument, path, relation, visit);
            path.pop();
        }
    }
}

fn walk_fact(fact: &Fact, keywords: &Keywords, visit: &mut impl FnMut(&Path, &Term)) {
    if fact.relation == keywords.distinct {
        return;
    }

    let relation = keywords.canonical_relation(fact.relation);
    let mut path = Vec::new();

    for (index, argument) in fact.arguments.iter().enumerate() {
        path.push(index);
        walk_term(argument, &mut path, relation, visit);
        path.pop();
    }
}

fn walk_expression(
    expression: &Expression,
    keywords: &Keywords,
    visit: &mut impl FnMut(&Path, &Term),
) {
    match expression {
        Expression::Fact(fact) => walk_fact(fact, keywords, visit),
        Expression::Implication(implication) => {
            walk_fact(&implication.head, keywords, visit);

            for conjunct in &implication.body {
                walk_expression(conjunct, keywords, visit);
            }
        }
        Expression::Negation(inner) => walk_expression(inner, keywords, visit),
        Expression::Disjunction(alternatives) => {
            for alternative in alternatives {
                walk_expression(alternative, keywords, visit);
            }
        }
    }
}

fn collect_occupants(
    expressions: &FxIndexSet<Expression>,
    keywords: &Keywords,
) -> FxHashMap<Path, FxIndexSet<Occupant>> {
    let mut occupants = FxHashMap::<Path, FxIndexSet<Occupant>>::default();

    for expression in expressions {
        walk_expression(expression, keywords, &mut |path, term| {
            let occupant = match term {
                Term::Constant(_) => Occupant::Constant,
                Term::Function(name, arguments) => Occupant::Functor(*name, arguments.len()),
                Term::Variable(_) => return,
            };

            occupants.entry(path.clone()).or_default().insert(occupant);
        });
    }

    occupants
}

/// The deepest path at which a function term occurs. Variables below it are never expanded,
/// which keeps self-nesting rules such as `foo(f(?x)) <= foo(?x)` from expanding forever.
pub(super) fn compound_depth(expressions: &[Expression], keywords: &Keywords) -> usize {
    let mut depth = 0;

    for expression in expressions {
        walk_expression(expression, keywords, &mut |path, term| {
            if let Term::Function(..) = term {
                depth = depth.max(path.1.len());
            }
        });
    }

    depth
}

// Intersection over every path of the variable in the fact
fn fact_candidates(
    fact: &Fact,
    variable: Symbol,
    occupants: &FxHashMap<Path, FxIndexSet<Occupant>>,
    depth: usize,
    keywords: &Keywords,
    too_deep: &mut bool,
) -> Option<FxIndexSet<Occupant>> {
    let mut candidates: Option<FxIndexSet<Occupant>> = None;
    let mut unconstrained = false;

    walk_fact(fact, keywords, &mut |path, term| {
        if *term != Term::Variable(variable) {
            return;
        }

        *too_deep |= path.1.len() > depth;

        // A path only variables occupy
        let Some(possible) = occupants.get(path) else {
            unconstrained = true;

            return;
        };

        candidates = Some(match candidates.take() {
            Some(mut candidates) => {
                candidates.retain(|occupant| possible.contains(occupant));
                candidates
            }
            None => possible.clone(),
        });
    });

    if unconstrained {
        None
    } else {
        candidates
    }
}

/// The shapes a variable of a rule may take, judged by the positive literals binding it.
/// `None` if nothing constrains it.
fn candidates(
    implication: &Implication,
    variable: Symbol,
    occupants: &FxHashMap<Path, FxIndexSet<Occupant>>,
    depth: usize,
    keywords: &Keywords,
) -> Option<FxIndexSet<Occupant>> {
    let mut candidates: Option<FxIndexSet<Occupant>> = None;
    let mut too_deep = false;

    for conjunct in &implication.body {
        let allowed = match conjunct {
            Expression::Fact(fact) => {
                fact_candidates(fact, variable, occupants, depth, keywords, &mut too_deep)
            }
            // Whatever any alternative allows, as long as every alternative binds the variable
            Expression::Disjunction(alternatives) => {
                alternatives
                    .iter()
                    .try_fold(FxIndexSet::default(), |mut allowed, alternative| {
                        let Expression::Fact(fact) = alternative else {
                            return None;
                        };

                        allowed.extend(fact_candidates(
                            fact,
                            variable,
                            occupants,
                            depth,
                            keywords,
                            &mut too_deep,
                        )?);

                        Some(allowed)
                    })
            }
            _ => None,
        };

        let Some(allowed) = allowed else {
            continue;
        };

        candidates = Some(match candidates.take() {
            Some(mut candidates) => {
                candidates.retain(|occupant| allowed.contains(occupant));
                candidates
            }
            None => allowed,
        });
    }

    if too_deep {
        None
    } else {
        candidates
    }
}

fn fresh_term(variable: Symbol, functor: Symbol, arity: usize, symbols: &mut SymbolTable) -> Term {
    let prefix = format!("{}.{}", symbols.resolve(variable), symbols.resolve(functor));

    Term::Function(
        functor,
        (0..arity)
            .map(|index| Term::Variable(symbols.intern(&format!("{prefix}.{index}"))))
            .collect(),
    )
}

fn specialize_rule(
    implication: &Implication,
    occupants: &FxHashMap<Path, FxIndexSet<Occupant>>,
    depth: usize,
    symbols: &mut SymbolTable,
) -> Vec<Implication> {
    let keywords = *symbols.keywords();
    let variables = Expression::Implication(implication.clone()).variables();

    // Each entry is a variable with the terms it may be replaced by, `None` keeping it as is
    let mut choices = Vec::new();

    for variable in variables {
        let Some(candidates) = candidates(implication, variable, occupants, depth, &keywords) else {
            continue;
        };

        if !candidates
            .iter()
            .any(|candidate| matches!(candidate, Occupant::Functor(..)))
        {
            continue;
        }

        let options = candidates
            .iter()
            .map(|candidate| match *candidate {
                Occupant::Constant => None,
                Occupant::Functor(functor, arity) => {
                    Some(fresh_term(variable, functor, arity, symbols))
                }
            })
            .collect::<Vec<_>>();

        choices.push((variable, options));
    }

    let mut substitutions = vec![Substitution::default()];

    for (variable, options) in &choices {
        substitutions = substitutions
            .into_iter()
            .flat_map(|substitution| {
                options.iter().map(move |option| {
                    let mut substitution = substitution.clone();

                    if let Some(term) = option {
                        substitution.insert(*variable, term.clone());
                    }

                    substitution
                })
            })
            .collect();
    }

    substitutions
        .iter()
        .map(|substitution| Implication {
            head: implication.head.substitute(substitution),
            body: implication
                .body
                .iter()
                .map(|conjunct| conjunct.substitute(substitution))
                .collect(),
        })
        .collect()
}

/// Replace variables that stand for whole compound terms by the compound shapes the program
/// actually uses at their positions, so that grounding by shape can see them.
pub(super) fn specialize(
    expressions: FxIndexSet<Expression>,
    depth: usize,
    symbols: &mut SymbolTable,
) -> Vec<Expression> {
    let keywords = *symbols.keywords();
    let occupants = collect_occupants(&expressions, &keywords);

    let mut output = FxIndexSet::default();

    for expression in expressions {
        match expression {
            Expression::Implication(implication) => {
                output.extend(
                    specialize_rule(&implication, &occupants, depth, symbols)
                        .into_iter()
                        .map(Expression::Implication),
                );
            }
            expression => {
                output.insert(expression);
            }
        }
    }

    output.into_iter().collect()
}

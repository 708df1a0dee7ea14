mod order;
mod specialize;

use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, trace};

pub use order::order_body;

use crate::{
    config::CompileConfig,
    error::CompileError,
    symbol::{Keywords, Symbol, SymbolTable},
    term::{Expression, Fact, FxIndexSet, Implication, Term},
};

/// Rewrites a raw description into the canonical form the grounder expects.
///
/// Rewrites are applied until a pass leaves the description unchanged, after which every rule
/// body is reordered so equality literals only follow the literals binding their variables.
pub struct Normalizer<'a> {
    symbols: &'a mut SymbolTable,
    config: CompileConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(symbols: &'a mut SymbolTable, config: CompileConfig) -> Self {
        Self { symbols, config }
    }

    pub fn normalize(
        &mut self,
        expressions: Vec<Expression>,
    ) -> Result<Vec<Expression>, CompileError> {
        let _span = debug_span!("normalize", expressions = expressions.len()).entered();

        let keywords = *self.symbols.keywords();
        let depth = specialize::compound_depth(&expressions, &keywords);

        let mut current = expressions;

        for pass in 0..self.config.max_normalization_passes {
            let next = self.pass(&current, depth)?;

            if next == current {
                debug!(passes = pass + 1, expressions = next.len(), "normalization converged");

                return Ok(self.order(next));
            }

            trace!(pass, before = current.len(), after = next.len(), "normalization pass");

            current = next;
        }

        Err(CompileError::NormalizationDiverged(
            self.config.max_normalization_passes,
        ))
    }

    fn order(&self, expressions: Vec<Expression>) -> Vec<Expression> {
        let keywords = *self.symbols.keywords();

        expressions
            .into_iter()
            .map(|expression| match expression {
                Expression::Implication(Implication { head, body }) => {
                    Expression::Implication(Implication::new(head, order_body(body, &keywords)))
                }
                expression => expression,
            })
            .collect()
    }

    fn pass(
        &mut self,
        expressions: &[Expression],
        depth: usize,
    ) -> Result<Vec<Expression>, CompileError> {
        let keywords = *self.symbols.keywords();
        let strip_base = has_legacy_base(expressions, &keywords);

        let mut output = FxIndexSet::default();

        for expression in expressions {
            let expression =
                clean_expression(collapse_trivial_rule(expression.clone()), &keywords)?;

            validate(&expression, &keywords)?;

            let expression = match expression {
                Expression::Implication(implication) => {
                    match eliminate_equalities(implication, &keywords)? {
                        Some(implication) => Expression::Implication(implication),
                        None => continue,
                    }
                }
                expression => expression,
            };

            if strip_base && is_ground_fact_of(&expression, keywords.base) {
                continue;
            }

            output.insert(expression);
        }

        if self.config.specialize_compound_variables {
            Ok(specialize::specialize(output, depth, self.symbols))
        } else {
            Ok(output.into_iter().collect())
        }
    }
}

fn collapse_trivial_rule(expression: Expression) -> Expression {
    match expression {
        Expression::Implication(Implication { head, body }) if body.is_empty() => {
            Expression::Fact(head)
        }
        expression => expression,
    }
}

fn clean_term(term: Term) -> Term {
    match term {
        Term::Function(name, arguments) if arguments.is_empty() => Term::Constant(name),
        Term::Function(name, arguments) => {
            Term::Function(name, arguments.into_iter().map(clean_term).collect())
        }
        term => term,
    }
}

fn clean_fact(fact: Fact, keywords: &Keywords) -> Result<Fact, CompileError> {
    if fact.arguments.is_empty() && keywords.is_state_relation(fact.relation) {
        return Err(CompileError::DegenerateTerm {
            relation: fact.relation,
        });
    }

    Ok(Fact {
        relation: fact.relation,
        arguments: fact.arguments.into_iter().map(clean_term).collect(),
    })
}

fn clean_expression(
    expression: Expression,
    keywords: &Keywords,
) -> Result<Expression, CompileError> {
    Ok(match expression {
        Expression::Fact(fact) => Expression::Fact(clean_fact(fact, keywords)?),
        Expression::Implication(Implication { head, body }) => Expression::Implication(Implication {
            head: clean_fact(head, keywords)?,
            body: body
                .into_iter()
                .map(|conjunct| clean_expression(conjunct, keywords))
                .collect::<Result<_, _>>()?,
        }),
        Expression::Negation(inner) => {
            Expression::Negation(Box::new(clean_expression(*inner, keywords)?))
        }
        Expression::Disjunction(alternatives) => Expression::Disjunction(
            alternatives
                .into_iter()
                .map(|alternative| clean_expression(alternative, keywords))
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn first_relation(expression: &Expression) -> Option<Symbol> {
    match expression {
        Expression::Fact(fact) => Some(fact.relation),
        Expression::Implication(implication) => Some(implication.head.relation),
        Expression::Negation(inner) => first_relation(inner),
        Expression::Disjunction(alternatives) => alternatives.iter().find_map(first_relation),
    }
}

fn validate_literal(
    literal: &Expression,
    relation: Symbol,
    keywords: &Keywords,
) -> Result<(), CompileError> {
    let unsupported = || CompileError::UnsupportedLiteral { relation };

    match literal {
        Expression::Fact(fact) if fact.relation == keywords.distinct && fact.arity() != 2 => {
            Err(unsupported())
        }
        Expression::Fact(_) => Ok(()),
        Expression::Negation(inner) => match &**inner {
            Expression::Fact(_) => validate_literal(inner, relation, keywords),
            _ => Err(unsupported()),
        },
        Expression::Disjunction(alternatives) => alternatives.iter().try_for_each(|alternative| {
            match alternative {
                Expression::Disjunction(_) => Err(unsupported()),
                alternative => validate_literal(alternative, relation, keywords),
            }
        }),
        Expression::Implication(_) => Err(unsupported()),
    }
}

fn validate(expression: &Expression, keywords: &Keywords) -> Result<(), CompileError> {
    match expression {
        Expression::Fact(_) => Ok(()),
        Expression::Implication(implication) => implication
            .body
            .iter()
            .try_for_each(|conjunct| {
                validate_literal(conjunct, implication.head.relation, keywords)
            }),
        expression => Err(CompileError::UnsupportedLiteral {
            relation: first_relation(expression).unwrap_or(keywords.anonymous),
        }),
    }
}

fn negated_distinct<'e>(
    conjunct: &'e Expression,
    keywords: &Keywords,
) -> Option<(&'e Term, &'e Term)> {
    match conjunct {
        Expression::Negation(inner) => match &**inner {
            Expression::Fact(fact) if fact.relation == keywords.distinct => {
                match fact.arguments.as_slice() {
                    [left, right] => Some((left, right)),
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

enum Equality {
    /// Both sides are the same term.
    Trivial(usize),
    /// A variable forced equal to a term.
    Binding(Symbol, Term),
    /// Two different ground terms.
    Impossible,
    Unsupported(Symbol, Symbol),
}

fn classify_equality(index: usize, left: &Term, right: &Term) -> Equality {
    if left == right {
        return Equality::Trivial(index);
    }

    match (left, right) {
        (Term::Variable(variable), other) | (other, Term::Variable(variable)) => {
            Equality::Binding(*variable, other.clone())
        }
        (Term::Function(left, _), Term::Function(right, _)) => Equality::Unsupported(*left, *right),
        _ => Equality::Impossible,
    }
}

/// Removes every `not(distinct(a, b))` of a rule. `None` means the rule can never fire.
fn eliminate_equalities(
    mut implication: Implication,
    keywords: &Keywords,
) -> Result<Option<Implication>, CompileError> {
    loop {
        let equality = implication
            .body
            .iter()
            .enumerate()
            .find_map(|(index, conjunct)| {
                negated_distinct(conjunct, keywords)
                    .map(|(left, right)| classify_equality(index, left, right))
            });

        match equality {
            None => return Ok(Some(implication)),
            Some(Equality::Trivial(index)) => {
                implication.body.remove(index);
            }
            // The substituted literal turns trivial and is removed on the next iteration
            Some(Equality::Binding(variable, term)) => {
                let substitution = FxHashMap::from_iter([(variable, term)]);

                implication = Implication {
                    head: implication.head.substitute(&substitution),
                    body: implication
                        .body
                        .iter()
                        .map(|conjunct| conjunct.substitute(&substitution))
                        .collect(),
                };
            }
            Some(Equality::Impossible) => return Ok(None),
            Some(Equality::Unsupported(left, right)) => {
                return Err(CompileError::UnsupportedEquality { left, right })
            }
        }
    }
}

fn visit_facts<'e>(expression: &'e Expression, visit: &mut impl FnMut(&'e Fact)) {
    match expression {
        Expression::Fact(fact) => visit(fact),
        Expression::Implication(implication) => {
            visit(&implication.head);

            for conjunct in &implication.body {
                visit_facts(conjunct, visit);
            }
        }
        Expression::Negation(inner) => visit_facts(inner, visit),
        Expression::Disjunction(alternatives) => {
            for alternative in alternatives {
                visit_facts(alternative, visit);
            }
        }
    }
}

fn has_legacy_base(expressions: &[Expression], keywords: &Keywords) -> bool {
    let mut legacy = false;

    for expression in expressions {
        visit_facts(expression, &mut |fact| {
            legacy |= fact.relation == keywords.base && fact.arity() != 1;
        });
    }

    legacy
}

fn is_ground_fact_of(expression: &Expression, relation: Symbol) -> bool {
    matches!(expression, Expression::Fact(fact) if fact.relation == relation && fact.is_ground())
}

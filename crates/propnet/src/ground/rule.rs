use rustc_hash::FxHashMap;

use super::{domain::Assignment, shape::leaves};
use crate::{
    id::Id,
    symbol::{Keywords, Symbol},
    term::{Expression, Fact, FxIndexSet, Term},
};

pub type DomainId = Id;
pub type RuleId = Id;

/// One position of a flattened fact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Slot {
    Constant(Symbol),
    /// Index into the variables of the owning rule.
    Variable(usize),
}

/// A positive body literal, as a domain plus the slots its assignments must fit.
#[derive(Clone, Debug)]
pub(crate) struct Condition {
    pub(crate) domain: DomainId,
    pub(crate) template: Vec<Slot>,
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
    }
}

impl Eq for Condition {}

#[derive(Clone, Debug)]
pub(crate) enum Step {
    Match(Condition),
    /// `distinct(left, right)`, or its negation when `negated` is set.
    Distinct {
        left: Term,
        right: Term,
        negated: bool,
    },
}

/// A rule prepared for grounding. Rules with disjunctions are split into one reference per
/// combination of alternatives before reaching this point.
#[derive(Debug)]
pub(crate) struct RuleReference {
    pub(crate) head: Fact,
    pub(crate) body: Vec<Expression>,
    pub(crate) variables: Vec<Symbol>,
    pub(crate) steps: Vec<Step>,
    pub(crate) target: DomainId,
    pub(crate) production: Vec<Slot>,
    /// Every complete substitution found so far, as constants indexed like `variables`.
    pub(crate) substitutions: FxIndexSet<Box<[Symbol]>>,
}

impl RuleReference {
    /// `domain_of` resolves (or creates) the domain a fact draws its values from.
    pub(crate) fn new(
        head: Fact,
        body: Vec<Expression>,
        keywords: &Keywords,
        mut domain_of: impl FnMut(&Fact) -> DomainId,
    ) -> Self {
        let mut variables = FxIndexSet::default();

        head.collect_variables(&mut variables);

        for conjunct in &body {
            conjunct.collect_variables(&mut variables);
        }

        let variable_indices = variables
            .iter()
            .enumerate()
            .map(|(index, variable)| (*variable, index))
            .collect::<FxHashMap<_, _>>();

        let mut steps = Vec::new();

        for conjunct in &body {
            match conjunct {
                Expression::Fact(fact) if fact.relation == keywords.distinct => {
                    if let Some(step) = distinct_step(fact, false) {
                        steps.push(step);
                    }
                }
                Expression::Fact(fact) => steps.push(Step::Match(Condition {
                    domain: domain_of(fact),
                    template: template(fact, &variable_indices),
                })),
                Expression::Negation(inner) => {
                    // Negated relations are decided by the circuit, and only an over-approximation
                    // is needed here
                    if let Expression::Fact(fact) = &**inner {
                        if fact.relation == keywords.distinct {
                            if let Some(step) = distinct_step(fact, true) {
                                steps.push(step);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            target: domain_of(&head),
            production: template(&head, &variable_indices),
            head,
            body,
            variables: variables.into_iter().collect(),
            steps,
            substitutions: FxIndexSet::default(),
        }
    }

    pub(crate) fn conditions(&self) -> impl Iterator<Item = (usize, &Condition)> + '_ {
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| match step {
                Step::Match(condition) => Some((index, condition)),
                Step::Distinct { .. } => None,
            })
    }

    /// The head assignment a complete substitution produces.
    pub(crate) fn produce(&self, substitution: &[Symbol]) -> Assignment {
        Assignment::new(
            self.production
                .iter()
                .map(|slot| match *slot {
                    Slot::Constant(constant) => constant,
                    Slot::Variable(index) => substitution[index],
                })
                .collect::<Vec<_>>(),
        )
    }
}

fn template(fact: &Fact, variable_indices: &FxHashMap<Symbol, usize>) -> Vec<Slot> {
    leaves(fact)
        .into_iter()
        .filter_map(|leaf| match leaf {
            Term::Constant(constant) => Some(Slot::Constant(*constant)),
            Term::Variable(variable) => variable_indices.get(variable).copied().map(Slot::Variable),
            Term::Function(..) => None,
        })
        .collect()
}

fn distinct_step(fact: &Fact, negated: bool) -> Option<Step> {
    match fact.arguments.as_slice() {
        [left, right] => Some(Step::Distinct {
            left: left.clone(),
            right: right.clone(),
            negated,
        }),
        _ => None,
    }
}

/// One body per combination of disjunction alternatives.
pub(crate) fn split_disjunctions(body: &[Expression]) -> Vec<Vec<Expression>> {
    let mut bodies = vec![Vec::with_capacity(body.len())];

    for conjunct in body {
        match conjunct {
            Expression::Disjunction(alternatives) => {
                bodies = bodies
                    .into_iter()
                    .flat_map(|body| {
                        alternatives.iter().map(move |alternative| {
                            let mut body = body.clone();

                            body.push(alternative.clone());

                            body
                        })
                    })
                    .collect();
            }
            conjunct => {
                for body in &mut bodies {
                    body.push(conjunct.clone());
                }
            }
        }
    }

    bodies
}

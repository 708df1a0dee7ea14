mod domain;
mod rule;
mod shape;

use either::Either;
use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, trace};

pub use domain::{Assignment, Domain};
pub use rule::{DomainId, RuleId};
pub use shape::{Shape, ShapeKey};

use rule::{split_disjunctions, RuleReference, Slot, Step};

use crate::{
    config::CompileConfig,
    error::CompileError,
    id::{Id, IdGenerator},
    normalize::order_body,
    symbol::{Keywords, Symbol},
    term::{Expression, Fact, FxIndexSet, Implication, Substitution, Term},
};

/// Statistics of one grounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundingReport {
    pub rounds: usize,
    pub domains: usize,
    pub assignments: usize,
    pub rules: usize,
    pub substitutions: usize,
}

/// Computes every ground instantiation of a normalized description.
///
/// Domains grow by semi-naive rounds: after the first round, which searches every rule, a
/// rule is only searched again when one of its conditions drew new assignments, and then only
/// with that condition restricted to the new assignments.
#[derive(Debug)]
pub struct Grounder {
    keywords: Keywords,
    config: CompileConfig,
    domain_ids: IdGenerator,
    rule_ids: IdGenerator,
    domains: Vec<Domain>,
    shapes: FxHashMap<ShapeKey, DomainId>,
    rules: Vec<RuleReference>,
    facts: FxIndexSet<Fact>,
    rounds: usize,
}

impl Grounder {
    pub fn new(keywords: Keywords, config: CompileConfig) -> Self {
        Self {
            keywords,
            config,
            domain_ids: IdGenerator::new(),
            rule_ids: IdGenerator::new(),
            domains: Vec::new(),
            shapes: FxHashMap::default(),
            rules: Vec::new(),
            facts: FxIndexSet::default(),
            rounds: 0,
        }
    }

    /// Load, run and emit in one go.
    pub fn ground(&mut self, expressions: &[Expression]) -> Result<Vec<Expression>, CompileError> {
        let _span = debug_span!("ground", expressions = expressions.len()).entered();

        self.load(expressions)?;

        let report = self.run()?;
        let emitted = self.emit()?;

        debug!(
            rounds = report.rounds,
            domains = report.domains,
            assignments = report.assignments,
            rules = report.rules,
            substitutions = report.substitutions,
            emitted = emitted.len(),
            "grounding finished"
        );

        Ok(emitted)
    }

    /// Seed domains with the ground facts and prepare one rule reference per rule and
    /// disjunct.
    pub fn load(&mut self, expressions: &[Expression]) -> Result<(), CompileError> {
        for expression in expressions {
            match expression {
                Expression::Fact(fact) if fact.is_ground() => {
                    let domain = self.domain_id(fact);

                    self.insert(domain, Assignment::new(constants(fact)))?;
                    self.facts.insert(fact.clone());
                }
                // Only reachable for unsafe facts, which fail on the first search
                Expression::Fact(fact) => self.add_rule(fact.clone(), Vec::new()),
                // An alternative may hold an equality literal that has to wait for its bindings
                Expression::Implication(implication) => {
                    for body in split_disjunctions(&implication.body) {
                        let body = order_body(body, &self.keywords);

                        self.add_rule(implication.head.clone(), body);
                    }
                }
                Expression::Negation(_) | Expression::Disjunction(_) => {
                    return Err(CompileError::UnsupportedLiteral {
                        relation: self.keywords.anonymous,
                    });
                }
            }
        }

        Ok(())
    }

    fn add_rule(&mut self, head: Fact, body: Vec<Expression>) {
        let keywords = self.keywords;
        let rule = RuleReference::new(head, body, &keywords, |fact| self.domain_id(fact));
        let rule_id = self.rule_ids.generate_id();

        self.domains[rule.target].producers.push(rule_id);

        for (_, condition) in rule.conditions() {
            let consumers = &mut self.domains[condition.domain].consumers;

            if !consumers.contains(&rule_id) {
                consumers.push(rule_id);
            }
        }

        self.rules.push(rule);
    }

    fn domain_id(&mut self, fact: &Fact) -> DomainId {
        let shape = ShapeKey::of(fact, &self.keywords);

        if let Some(&domain_id) = self.shapes.get(&shape) {
            return domain_id;
        }

        let domain_id = self.domain_ids.generate_id();

        self.domains.push(Domain::new(shape.clone()));
        self.shapes.insert(shape, domain_id);

        domain_id
    }

    fn insert(
        &mut self,
        domain_id: DomainId,
        assignment: Assignment,
    ) -> Result<bool, CompileError> {
        let domain = &mut self.domains[domain_id];
        let inserted = domain.insert(assignment);

        if let Some(limit) = self.config.max_domain_size {
            if domain.len() > limit {
                return Err(CompileError::DomainLimitExceeded {
                    relation: domain.shape.relation,
                    limit,
                });
            }
        }

        Ok(inserted)
    }

    /// Grow every domain to its fixed point.
    pub fn run(&mut self) -> Result<GroundingReport, CompileError> {
        loop {
            let changed = self
                .domains
                .iter_mut()
                .enumerate()
                .filter_map(|(index, domain)| domain.advance_round().then_some(Id(index)))
                .collect::<FxIndexSet<DomainId>>();

            let considered = if self.rounds == 0 {
                (0..self.rules.len()).map(Id).collect::<FxIndexSet<RuleId>>()
            } else {
                changed
                    .iter()
                    .flat_map(|domain_id| self.domains[*domain_id].consumers.iter().copied())
                    .collect()
            };

            if considered.is_empty() {
                break;
            }

            let mut added = 0;

            for rule_id in considered {
                let rule = &self.rules[rule_id];

                let found = if self.rounds == 0 {
                    self.search(rule, None)?
                } else {
                    let mut found = Vec::new();

                    for (step, condition) in rule.conditions() {
                        if changed.contains(&condition.domain) {
                            found.extend(self.search(rule, Some(step))?);
                        }
                    }

                    found
                };

                added += self.absorb(rule_id, found)?;
            }

            trace!(round = self.rounds, changed = changed.len(), added, "grounding round");

            self.rounds += 1;
        }

        Ok(self.report())
    }

    fn absorb(
        &mut self,
        rule_id: RuleId,
        found: Vec<Box<[Symbol]>>,
    ) -> Result<usize, CompileError> {
        let mut added = 0;

        for substitution in found {
            let rule = &mut self.rules[rule_id];
            let assignment = rule.produce(&substitution);

            if !rule.substitutions.insert(substitution) {
                continue;
            }

            let target = rule.target;

            if self.insert(target, assignment)? {
                added += 1;
            }
        }

        Ok(added)
    }

    // With `restricted`, the condition at that step only ranges over the previous round
    fn search(
        &self,
        rule: &RuleReference,
        restricted: Option<usize>,
    ) -> Result<Vec<Box<[Symbol]>>, CompileError> {
        let mut binding = vec![None; rule.variables.len()];
        let mut found = Vec::new();

        self.descend(rule, 0, restricted, &mut binding, &mut found)?;

        Ok(found)
    }

    fn descend(
        &self,
        rule: &RuleReference,
        step_index: usize,
        restricted: Option<usize>,
        binding: &mut Vec<Option<Symbol>>,
        found: &mut Vec<Box<[Symbol]>>,
    ) -> Result<(), CompileError> {
        let Some(step) = rule.steps.get(step_index) else {
            let substitution = binding
                .iter()
                .zip(&rule.variables)
                .map(|(value, variable)| {
                    value.ok_or(CompileError::UnboundVariable {
                        variable: *variable,
                        relation: rule.head.relation,
                    })
                })
                .collect::<Result<Box<[_]>, _>>()?;

            found.push(substitution);

            return Ok(());
        };

        match step {
            Step::Distinct {
                left,
                right,
                negated,
            } => {
                let left = resolve(left, rule, binding)?;
                let right = resolve(right, rule, binding)?;

                if (left != right) != *negated {
                    self.descend(rule, step_index + 1, restricted, binding, found)?;
                }

                Ok(())
            }
            Step::Match(condition) => {
                let domain = &self.domains[condition.domain];

                let range = if restricted == Some(step_index) {
                    domain.delta()
                } else {
                    0..domain.len()
                };

                let selective = condition
                    .template
                    .iter()
                    .enumerate()
                    .filter_map(|(position, slot)| match *slot {
                        Slot::Constant(constant) => Some((position, constant)),
                        Slot::Variable(variable) => {
                            binding[variable].map(|value| (position, value))
                        }
                    })
                    .min_by_key(|(position, constant)| domain.matching(*position, *constant).len());

                let candidates = match selective {
                    Some((position, constant)) => Either::Left(
                        domain
                            .matching(position, constant)
                            .iter()
                            .copied()
                            .filter(move |index| range.contains(index)),
                    ),
                    None => Either::Right(range),
                };

                let inconsistent = || CompileError::InconsistentIndex {
                    relation: domain.shape.relation,
                };

                for index in candidates {
                    let assignment = domain.get(index).ok_or_else(inconsistent)?;

                    if assignment.constants().len() != condition.template.len() {
                        return Err(inconsistent());
                    }

                    let mut newly_bound = Vec::new();
                    let mut fits = true;

                    for (slot, constant) in condition.template.iter().zip(assignment.constants()) {
                        match *slot {
                            Slot::Constant(expected) => fits = expected == *constant,
                            Slot::Variable(variable) => match binding[variable] {
                                Some(value) => fits = value == *constant,
                                None => {
                                    binding[variable] = Some(*constant);
                                    newly_bound.push(variable);
                                }
                            },
                        }

                        if !fits {
                            break;
                        }
                    }

                    if fits {
                        self.descend(rule, step_index + 1, restricted, binding, found)?;
                    }

                    for variable in newly_bound {
                        binding[variable] = None;
                    }
                }

                Ok(())
            }
        }
    }

    /// The ground source facts plus every rule instantiated with every substitution found.
    pub fn emit(&self) -> Result<Vec<Expression>, CompileError> {
        let mut emitted = self
            .facts
            .iter()
            .cloned()
            .map(Expression::Fact)
            .collect::<FxIndexSet<_>>();

        for rule in &self.rules {
            for substitution in &rule.substitutions {
                let substitution = rule
                    .variables
                    .iter()
                    .zip(substitution.iter())
                    .map(|(variable, constant)| (*variable, Term::Constant(*constant)))
                    .collect::<Substitution>();

                let head = rule.head.substitute(&substitution);
                let body = rule
                    .body
                    .iter()
                    .map(|conjunct| conjunct.substitute(&substitution))
                    .collect::<Vec<_>>();

                let expression = if body.is_empty() {
                    Expression::Fact(head)
                } else {
                    Expression::Implication(Implication::new(head, body))
                };

                if let Some(&variable) = expression.variables().first() {
                    return Err(CompileError::UnboundVariable {
                        variable,
                        relation: rule.head.relation,
                    });
                }

                emitted.insert(expression);
            }
        }

        Ok(emitted.into_iter().collect())
    }

    /// The domain a fact draws its values from, if grounding has seen its shape.
    pub fn domain(&self, fact: &Fact) -> Option<&Domain> {
        self.shapes
            .get(&ShapeKey::of(fact, &self.keywords))
            .map(|domain_id| &self.domains[*domain_id])
    }

    pub fn domains(&self) -> impl ExactSizeIterator<Item = &Domain> + '_ {
        self.domains.iter()
    }

    pub fn report(&self) -> GroundingReport {
        GroundingReport {
            rounds: self.rounds,
            domains: self.domains.len(),
            assignments: self.domains.iter().map(Domain::len).sum(),
            rules: self.rules.len(),
            substitutions: self.rules.iter().map(|rule| rule.substitutions.len()).sum(),
        }
    }
}

fn constants(fact: &Fact) -> Vec<Symbol> {
    shape::leaves(fact)
        .into_iter()
        .filter_map(|leaf| match leaf {
            Term::Constant(constant) => Some(*constant),
            _ => None,
        })
        .collect()
}

fn resolve(
    term: &Term,
    rule: &RuleReference,
    binding: &[Option<Symbol>],
) -> Result<Term, CompileError> {
    match term {
        Term::Constant(_) => Ok(term.clone()),
        Term::Variable(variable) => rule
            .variables
            .iter()
            .position(|candidate| candidate == variable)
            .and_then(|index| binding[index])
            .map(Term::Constant)
            .ok_or(CompileError::UnboundVariable {
                variable: *variable,
                relation: rule.head.relation,
            }),
        Term::Function(name, arguments) => Ok(Term::Function(
            *name,
            arguments
                .iter()
                .map(|argument| resolve(argument, rule, binding))
                .collect::<Result<_, _>>()?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{symbol::SymbolTable, term::gdl};

    #[test]
    fn test_mismatched_templates_are_reported() {
        let mut symbols = SymbolTable::new();

        let rules = gdl!(symbols =>
            q(a);
            p('x) <= q('x);
        );

        let mut grounder = Grounder::new(*symbols.keywords(), CompileConfig::default());
        grounder.load(&rules).unwrap();

        for rule in &mut grounder.rules {
            for step in &mut rule.steps {
                if let Step::Match(condition) = step {
                    condition.template.push(Slot::Variable(0));
                }
            }
        }

        let q = symbols.intern("q");

        assert_eq!(
            grounder.run(),
            Err(CompileError::InconsistentIndex { relation: q })
        );
    }
}

use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, trace, warn};

use super::{Circuit, ComponentId, ComponentKind};
use crate::{
    error::CompileError,
    symbol::{Keywords, Symbol, SymbolTable},
    term::{Expression, Fact, FxIndexMap},
};

/// Turns a ground description into a [`Circuit`].
pub struct CircuitBuilder<'a> {
    symbols: &'a SymbolTable,
    keywords: Keywords,
    circuit: Circuit,
    true_constant: ComponentId,
    false_constant: ComponentId,
    init_proposition: ComponentId,
    // `true` proposition -> the transition feeding it
    transitions: FxHashMap<ComponentId, ComponentId>,
    // `true` fact -> what drives it on the first turn
    initial: FxIndexMap<Fact, Vec<ComponentId>>,
}

impl<'a> CircuitBuilder<'a> {
    pub fn new(symbols: &'a SymbolTable, roles: Vec<Symbol>) -> Self {
        let keywords = *symbols.keywords();

        let mut circuit = Circuit::new(roles);

        let true_constant = circuit.add_component(ComponentKind::Constant(true));
        let false_constant = circuit.add_component(ComponentKind::Constant(false));
        let init_proposition = circuit.named_proposition(Fact::proposition(keywords.init_marker));

        Self {
            symbols,
            keywords,
            circuit,
            true_constant,
            false_constant,
            init_proposition,
            transitions: FxHashMap::default(),
            initial: FxIndexMap::default(),
        }
    }

    pub fn build(mut self, expressions: &[Expression]) -> Result<Circuit, CompileError> {
        let _span = debug_span!("build", expressions = expressions.len()).entered();

        for expression in expressions {
            self.add_expression(expression)?;
        }

        self.wire_initial_state();

        let repaired = self.repair_disjunctions();
        let synthesized = self.synthesize_inputs();

        self.circuit.classify(self.symbols);

        if self.circuit.terminal_proposition().is_none() {
            warn!("description has no terminal proposition");
        }

        if self.circuit.init_proposition().is_none() {
            warn!("description has no init proposition");
        }

        debug!(
            components = self.circuit.len(),
            base = self.circuit.base_propositions().len(),
            inputs = self.circuit.input_propositions().len(),
            repaired,
            synthesized,
            "circuit built"
        );

        Ok(self.circuit)
    }

    fn add_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::Fact(fact) if fact.relation == self.keywords.init => {
                let state = self.initial_fact(fact)?;

                self.initial.entry(state).or_default().push(self.init_proposition);
            }
            Expression::Fact(fact) => {
                let head = self.head(fact)?;

                self.circuit.link(self.true_constant, head);
            }
            Expression::Implication(implication) => {
                let and = self.circuit.add_component(ComponentKind::And);

                for literal in &implication.body {
                    let input = self.literal(literal, implication.head.relation)?;

                    self.circuit.link(input, and);
                }

                // A conditional initial fact only holds on the first turn
                if implication.head.relation == self.keywords.init {
                    let state = self.initial_fact(&implication.head)?;

                    self.circuit.link(self.init_proposition, and);
                    self.initial.entry(state).or_default().push(and);
                } else {
                    let head = self.head(&implication.head)?;

                    self.circuit.link(and, head);
                }
            }
            Expression::Negation(_) | Expression::Disjunction(_) => {
                return Err(CompileError::UnsupportedLiteral {
                    relation: self.keywords.anonymous,
                });
            }
        }

        Ok(())
    }

    fn initial_fact(&self, fact: &Fact) -> Result<Fact, CompileError> {
        match fact.arguments.as_slice() {
            [_] => Ok(Fact::new(self.keywords.true_, fact.arguments.clone())),
            _ => Err(CompileError::MalformedHead {
                relation: fact.relation,
            }),
        }
    }

    /// The proposition a rule or fact concludes.
    fn head(&mut self, fact: &Fact) -> Result<ComponentId, CompileError> {
        let relation = fact.relation;

        if relation == self.keywords.true_
            || relation == self.keywords.does
            || relation == self.keywords.distinct
        {
            return Err(CompileError::MalformedHead { relation });
        }

        if relation != self.keywords.next {
            return Ok(self.circuit.named_proposition(fact.clone()));
        }

        if fact.arity() != 1 {
            return Err(CompileError::MalformedHead { relation });
        }

        let next = self.circuit.named_proposition(fact.clone());
        let state = self
            .circuit
            .named_proposition(Fact::new(self.keywords.true_, fact.arguments.clone()));

        if !self.transitions.contains_key(&state) {
            let transition = self.circuit.add_component(ComponentKind::Transition);

            self.circuit.link(next, transition);
            self.circuit.link(transition, state);
            self.transitions.insert(state, transition);
        }

        Ok(next)
    }

    fn anonymous_proposition(&mut self) -> ComponentId {
        self.circuit.add_component(ComponentKind::Proposition {
            name: Fact::proposition(self.keywords.anonymous),
            underlying: None,
        })
    }

    fn literal(
        &mut self,
        literal: &Expression,
        relation: Symbol,
    ) -> Result<ComponentId, CompileError> {
        match literal {
            Expression::Fact(fact) if fact.relation == self.keywords.distinct => {
                let [left, right] = fact.arguments.as_slice() else {
                    return Err(CompileError::UnsupportedLiteral { relation });
                };

                let constant = if left != right {
                    self.true_constant
                } else {
                    self.false_constant
                };

                let proposition = self.anonymous_proposition();

                self.circuit.link(constant, proposition);

                Ok(proposition)
            }
            Expression::Fact(fact) => Ok(self.circuit.named_proposition(fact.clone())),
            Expression::Negation(inner) if matches!(**inner, Expression::Fact(_)) => {
                let input = self.literal(inner, relation)?;
                let not = self.circuit.add_component(ComponentKind::Not);
                let proposition = self.anonymous_proposition();

                self.circuit.link(input, not);
                self.circuit.link(not, proposition);

                Ok(proposition)
            }
            _ => Err(CompileError::UnsupportedLiteral { relation }),
        }
    }

    /// Feed every initial fact through the transition of its `true` proposition, so asserting
    /// the init proposition once seeds the first state.
    fn wire_initial_state(&mut self) {
        for (state, sources) in std::mem::take(&mut self.initial) {
            let state = self.circuit.named_proposition(state);

            let driver = match self.transitions.get(&state) {
                // The `next` proposition, which disjunction repair later turns into an `or`
                Some(&transition) => self
                    .circuit
                    .component(transition)
                    .and_then(|transition| transition.single_input()),
                None => None,
            };

            let driver = match driver {
                Some(driver) => driver,
                None => {
                    let transition = self.circuit.add_component(ComponentKind::Transition);

                    self.circuit.link(transition, state);
                    self.transitions.insert(state, transition);

                    match sources.as_slice() {
                        [_] => transition,
                        _ => {
                            let proposition = self.anonymous_proposition();

                            self.circuit.link(proposition, transition);

                            proposition
                        }
                    }
                }
            };

            for source in sources {
                self.circuit.link(source, driver);
            }
        }
    }

    /// Give every proposition with several inputs an `or` gate over one disjunct proposition
    /// per input. Returns the number of repaired propositions.
    fn repair_disjunctions(&mut self) -> usize {
        let crowded = self
            .circuit
            .components()
            .filter(|(_, component)| component.is_proposition() && component.inputs.len() > 1)
            .map(|(component_id, _)| component_id)
            .collect::<Vec<_>>();

        for &proposition in &crowded {
            let Some(component) = self.circuit.component(proposition) else {
                continue;
            };

            let inputs = component.inputs.iter().copied().collect::<Vec<_>>();
            let underlying = component.name().cloned();

            let or = self.circuit.add_component(ComponentKind::Or);

            for input in &inputs {
                let disjunct = self.circuit.add_component(ComponentKind::Proposition {
                    name: Fact::proposition(self.keywords.disjunct),
                    underlying: underlying.clone(),
                });

                self.circuit.unlink(*input, proposition);
                self.circuit.link(*input, disjunct);
                self.circuit.link(disjunct, or);
            }

            self.circuit.link(or, proposition);

            trace!(%proposition, disjuncts = inputs.len(), "repaired disjunction");
        }

        crowded.len()
    }

    /// Create the `does` proposition of every legal move that lacks one. Returns the number
    /// created.
    fn synthesize_inputs(&mut self) -> usize {
        let legals = self
            .circuit
            .components()
            .filter_map(|(_, component)| match component.kind() {
                ComponentKind::Proposition {
                    name,
                    underlying: None,
                } if name.relation == self.keywords.legal => Some(name.arguments.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        let mut synthesized = 0;

        for arguments in legals {
            if self
                .circuit
                .find_proposition(self.keywords.does, &arguments)
                .is_none()
            {
                self.circuit
                    .named_proposition(Fact::new(self.keywords.does, arguments));

                synthesized += 1;
            }
        }

        synthesized
    }
}

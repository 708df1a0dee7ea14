use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Circuit, Component, ComponentId, ComponentKind};
use crate::{error::CircuitError, symbol::Symbol};

/// The base propositions that hold in a state of the game.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct MachineState {
    base: BTreeSet<ComponentId>,
}

impl MachineState {
    pub fn contains(&self, proposition: ComponentId) -> bool {
        self.base.contains(&proposition)
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.base.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// Plays a game on a borrowed [`Circuit`] by forward propagation.
///
/// Components are evaluated in one topological order, computed once, in which the edges
/// leaving transitions are cut. A simulator is meant for a single thread of play.
#[derive(Debug)]
pub struct Simulator<'c> {
    circuit: &'c Circuit,
    order: Vec<ComponentId>,
}

impl<'c> Simulator<'c> {
    pub fn new(circuit: &'c Circuit) -> Result<Self, CircuitError> {
        let mut in_degrees = vec![0_usize; circuit.capacity()];

        for (_, component) in circuit.components() {
            if component.is_transition() {
                continue;
            }

            for output in component.outputs() {
                in_degrees[output.0] += 1;
            }
        }

        let mut ready = circuit
            .components()
            .filter(|(component_id, _)| in_degrees[component_id.0] == 0)
            .map(|(component_id, _)| component_id)
            .collect::<VecDeque<_>>();

        let mut order = Vec::with_capacity(circuit.len());

        while let Some(component_id) = ready.pop_front() {
            order.push(component_id);

            let Some(component) = circuit.component(component_id) else {
                continue;
            };

            if component.is_transition() {
                continue;
            }

            for output in component.outputs() {
                in_degrees[output.0] -= 1;

                if in_degrees[output.0] == 0 {
                    ready.push_back(*output);
                }
            }
        }

        if let Some((stuck, _)) = circuit
            .components()
            .find(|(component_id, _)| in_degrees[component_id.0] > 0)
        {
            return Err(CircuitError::CombinationalCycle(stuck));
        }

        debug!(components = order.len(), "simulator ready");

        Ok(Self { circuit, order })
    }

    pub fn circuit(&self) -> &'c Circuit {
        self.circuit
    }

    fn propagate(
        &self,
        state: &MachineState,
        moves: &FxHashSet<ComponentId>,
        init: bool,
    ) -> Vec<bool> {
        let circuit = self.circuit;
        let mut values = vec![false; circuit.capacity()];

        for &component_id in &self.order {
            let Some(component) = circuit.component(component_id) else {
                continue;
            };

            let single = |component: &Component| {
                component
                    .single_input()
                    .is_some_and(|input| values[input.0])
            };

            let value = match component.kind() {
                ComponentKind::Proposition { .. } => {
                    if circuit.base_propositions().contains(&component_id) {
                        state.contains(component_id)
                    } else if circuit.input_propositions().contains(&component_id) {
                        moves.contains(&component_id)
                    } else if circuit.init_proposition() == Some(component_id) {
                        init
                    } else {
                        single(component)
                    }
                }
                ComponentKind::And => component.inputs().iter().all(|input| values[input.0]),
                ComponentKind::Or => component.inputs().iter().any(|input| values[input.0]),
                ComponentKind::Not => !single(component),
                ComponentKind::Constant(value) => *value,
                ComponentKind::Transition => single(component),
            };

            values[component_id.0] = value;
        }

        values
    }

    fn advance(&self, values: &[bool]) -> MachineState {
        MachineState {
            base: self
                .circuit
                .base_propositions()
                .iter()
                .copied()
                .filter(|proposition| {
                    self.circuit
                        .component(*proposition)
                        .and_then(Component::single_input)
                        .is_some_and(|transition| values[transition.0])
                })
                .collect(),
        }
    }

    /// The state reached by asserting the init proposition once.
    pub fn initial_state(&self) -> MachineState {
        let values = self.propagate(&MachineState::default(), &FxHashSet::default(), true);

        self.advance(&values)
    }

    pub fn legal_moves(&self, state: &MachineState, role: Symbol) -> Vec<ComponentId> {
        let values = self.propagate(state, &FxHashSet::default(), false);

        self.circuit
            .legal_propositions(role)
            .filter(|legal| values[legal.0])
            .collect()
    }

    pub fn is_terminal(&self, state: &MachineState) -> bool {
        let values = self.propagate(state, &FxHashSet::default(), false);

        self.circuit
            .terminal_proposition()
            .is_some_and(|terminal| values[terminal.0])
    }

    /// The score of a role, from the first goal proposition that holds.
    pub fn goal(&self, state: &MachineState, role: Symbol) -> Option<u32> {
        let values = self.propagate(state, &FxHashSet::default(), false);

        self.circuit
            .goal_propositions(role)
            .find(|goal| values[goal.0])
            .and_then(|goal| self.circuit.goal_value(goal))
    }

    /// Play exactly one legal proposition per role.
    pub fn next_state(
        &self,
        state: &MachineState,
        moves: &[ComponentId],
    ) -> Result<MachineState, CircuitError> {
        let circuit = self.circuit;
        let values = self.propagate(state, &FxHashSet::default(), false);

        if let Some(&stray) = moves.iter().find(|legal| {
            !circuit
                .roles()
                .iter()
                .any(|role| circuit.legal_propositions(*role).any(|other| other == **legal))
        }) {
            return Err(CircuitError::IllegalMove(stray));
        }

        let mut inputs = FxHashSet::default();

        for &role in circuit.roles() {
            let mut chosen = moves.iter().copied().filter(|chosen| {
                circuit
                    .legal_propositions(role)
                    .any(|legal| legal == *chosen)
            });

            let legal = chosen.next().ok_or(CircuitError::MissingMove(role))?;

            if chosen.next().is_some() {
                return Err(CircuitError::DuplicateMove(role));
            }

            if !values[legal.0] {
                return Err(CircuitError::IllegalMove(legal));
            }

            inputs.insert(
                circuit
                    .legal_input(legal)
                    .ok_or(CircuitError::IllegalMove(legal))?,
            );
        }

        let values = self.propagate(state, &inputs, false);

        Ok(self.advance(&values))
    }
}

mod builder;
mod component;
mod dot;
mod simulate;

use hashbrown::{Equivalent, HashMap};
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::trace;

pub use builder::CircuitBuilder;
pub use component::{Component, ComponentKind};
pub use dot::Dot;
pub use simulate::{MachineState, Simulator};

use crate::{
    error::CircuitError,
    id::Id,
    symbol::{Symbol, SymbolTable},
    term::{Fact, FxIndexMap, FxIndexSet, Term},
};

pub type ComponentId = Id;

/// A fact given by parts, for lookups that would otherwise allocate a [`Fact`].
#[derive(Hash)]
struct FactRef<'a> {
    relation: Symbol,
    arguments: &'a [Term],
}

impl Equivalent<Fact> for FactRef<'_> {
    fn equivalent(&self, key: &Fact) -> bool {
        self.relation == key.relation && self.arguments == key.arguments
    }
}

/// A propositional network: components in an arena, plus the classification of its
/// propositions.
///
/// Propositions carry no value here; evaluation lives in [`Simulator`], which borrows the
/// circuit, so a circuit is never evaluated while its structure changes.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    roles: Vec<Symbol>,
    // Removed components leave a `None` behind, so handles stay stable
    components: Vec<Option<Component>>,
    names: HashMap<Fact, ComponentId, FxBuildHasher>,
    base_propositions: FxIndexSet<ComponentId>,
    input_propositions: FxIndexSet<ComponentId>,
    legal_propositions: FxIndexMap<Symbol, FxIndexSet<ComponentId>>,
    goal_propositions: FxIndexMap<Symbol, FxIndexSet<ComponentId>>,
    goal_values: FxHashMap<ComponentId, u32>,
    init_proposition: Option<ComponentId>,
    terminal_proposition: Option<ComponentId>,
    legal_inputs: FxHashMap<ComponentId, ComponentId>,
    input_legals: FxHashMap<ComponentId, ComponentId>,
}

impl Circuit {
    pub(crate) fn new(roles: Vec<Symbol>) -> Self {
        Self {
            roles,
            ..Self::default()
        }
    }

    pub fn roles(&self) -> &[Symbol] {
        &self.roles
    }

    pub fn component(&self, component_id: ComponentId) -> Option<&Component> {
        self.components.get(component_id.0).and_then(Option::as_ref)
    }

    /// Every live component with its handle.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(index, component)| {
                component.as_ref().map(|component| (Id(index), component))
            })
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.components.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the arena, including removed slots. Every handle is below this bound.
    pub fn capacity(&self) -> usize {
        self.components.len()
    }

    /// The proposition named by a fact. Anonymous and disjunct propositions have no name.
    pub fn proposition(&self, fact: &Fact) -> Option<ComponentId> {
        self.names.get(fact).copied()
    }

    pub fn find_proposition(&self, relation: Symbol, arguments: &[Term]) -> Option<ComponentId> {
        self.names
            .get(&FactRef {
                relation,
                arguments,
            })
            .copied()
    }

    /// Propositions holding one bit of game state, each fed by a single transition.
    pub fn base_propositions(&self) -> &FxIndexSet<ComponentId> {
        &self.base_propositions
    }

    /// The `does` propositions.
    pub fn input_propositions(&self) -> &FxIndexSet<ComponentId> {
        &self.input_propositions
    }

    pub fn legal_propositions(&self, role: Symbol) -> impl Iterator<Item = ComponentId> + '_ {
        self.legal_propositions
            .get(&role)
            .into_iter()
            .flat_map(|propositions| propositions.iter().copied())
    }

    pub fn goal_propositions(&self, role: Symbol) -> impl Iterator<Item = ComponentId> + '_ {
        self.goal_propositions
            .get(&role)
            .into_iter()
            .flat_map(|propositions| propositions.iter().copied())
    }

    /// The numeric score of a goal proposition.
    pub fn goal_value(&self, proposition: ComponentId) -> Option<u32> {
        self.goal_values.get(&proposition).copied()
    }

    pub fn init_proposition(&self) -> Option<ComponentId> {
        self.init_proposition
    }

    pub fn terminal_proposition(&self) -> Option<ComponentId> {
        self.terminal_proposition
    }

    /// The `does` proposition paired with a `legal` one.
    pub fn legal_input(&self, legal: ComponentId) -> Option<ComponentId> {
        self.legal_inputs.get(&legal).copied()
    }

    /// The `legal` proposition paired with a `does` one.
    pub fn input_legal(&self, input: ComponentId) -> Option<ComponentId> {
        self.input_legals.get(&input).copied()
    }

    pub fn legal_input_map(&self) -> &FxHashMap<ComponentId, ComponentId> {
        &self.legal_inputs
    }

    /// Render the circuit in the DOT language, for debugging.
    pub fn to_dot<'a>(&'a self, symbols: &'a SymbolTable) -> Dot<'a> {
        Dot::new(self, symbols)
    }

    /// Remove a component, unlinking it from its neighbours and every index.
    ///
    /// The init and terminal propositions cannot be removed. A proposition whose transition
    /// is removed stops being a base proposition.
    pub fn remove_component(
        &mut self,
        component_id: ComponentId,
    ) -> Result<Component, CircuitError> {
        if Some(component_id) == self.init_proposition
            || Some(component_id) == self.terminal_proposition
        {
            return Err(CircuitError::ProtectedComponent(component_id));
        }

        let component = self
            .components
            .get_mut(component_id.0)
            .and_then(Option::take)
            .ok_or(CircuitError::UnknownComponent(component_id))?;

        for input in &component.inputs {
            if let Some(Some(neighbour)) = self.components.get_mut(input.0) {
                neighbour.outputs.shift_remove(&component_id);
            }
        }

        for output in &component.outputs {
            if let Some(Some(neighbour)) = self.components.get_mut(output.0) {
                neighbour.inputs.shift_remove(&component_id);
            }

            if self.base_propositions.contains(output) && !self.is_base(*output) {
                trace!(proposition = %output, "no longer a base proposition");

                self.base_propositions.shift_remove(output);
            }
        }

        if let Some(name) = component.name() {
            if self.names.get(name) == Some(&component_id) {
                self.names.remove(name);
            }
        }

        self.base_propositions.shift_remove(&component_id);
        self.input_propositions.shift_remove(&component_id);

        for propositions in self
            .legal_propositions
            .values_mut()
            .chain(self.goal_propositions.values_mut())
        {
            propositions.shift_remove(&component_id);
        }

        self.goal_values.remove(&component_id);

        if let Some(input) = self.legal_inputs.remove(&component_id) {
            self.input_legals.remove(&input);
        }

        if let Some(legal) = self.input_legals.remove(&component_id) {
            self.legal_inputs.remove(&legal);
        }

        Ok(component)
    }

    fn is_base(&self, proposition: ComponentId) -> bool {
        self.component(proposition)
            .is_some_and(|component| is_base(&self.components, component))
    }

    pub(crate) fn add_component(&mut self, kind: ComponentKind) -> ComponentId {
        let component_id = Id(self.components.len());

        self.components.push(Some(Component::new(kind)));

        component_id
    }

    /// Get or create the proposition named by `fact`.
    pub(crate) fn named_proposition(&mut self, fact: Fact) -> ComponentId {
        if let Some(&component_id) = self.names.get(&fact) {
            return component_id;
        }

        let component_id = self.add_component(ComponentKind::Proposition {
            name: fact.clone(),
            underlying: None,
        });

        self.names.insert(fact, component_id);

        component_id
    }

    pub(crate) fn component_mut(&mut self, component_id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(component_id.0).and_then(Option::as_mut)
    }

    pub(crate) fn link(&mut self, from: ComponentId, to: ComponentId) {
        if let Some(component) = self.component_mut(from) {
            component.outputs.insert(to);
        }

        if let Some(component) = self.component_mut(to) {
            component.inputs.insert(from);
        }
    }

    pub(crate) fn unlink(&mut self, from: ComponentId, to: ComponentId) {
        if let Some(component) = self.component_mut(from) {
            component.outputs.shift_remove(&to);
        }

        if let Some(component) = self.component_mut(to) {
            component.inputs.shift_remove(&from);
        }
    }

    /// Rebuild every index from the final wiring.
    pub(crate) fn classify(&mut self, symbols: &SymbolTable) {
        let keywords = *symbols.keywords();

        self.base_propositions.clear();
        self.input_propositions.clear();
        self.legal_propositions.clear();
        self.goal_propositions.clear();
        self.goal_values.clear();
        self.init_proposition = None;
        self.terminal_proposition = None;
        self.legal_inputs.clear();
        self.input_legals.clear();

        for role in &self.roles {
            self.legal_propositions.entry(*role).or_default();
            self.goal_propositions.entry(*role).or_default();
        }

        for (index, slot) in self.components.iter().enumerate() {
            let Some(component) = slot else {
                continue;
            };

            let ComponentKind::Proposition {
                name,
                underlying: None,
            } = &component.kind
            else {
                continue;
            };

            let component_id = Id(index);

            if is_base(&self.components, component) {
                self.base_propositions.insert(component_id);
            }

            let role = match name.arguments.first() {
                Some(Term::Constant(role)) => Some(*role),
                _ => None,
            };

            if name.relation == keywords.does {
                self.input_propositions.insert(component_id);
            } else if name.relation == keywords.legal {
                if let Some(role) = role {
                    self.legal_propositions.entry(role).or_default().insert(component_id);
                }
            } else if name.relation == keywords.goal {
                if let Some(role) = role {
                    self.goal_propositions.entry(role).or_default().insert(component_id);
                }

                if let Some(Term::Constant(value)) = name.arguments.get(1) {
                    if let Ok(value) = symbols.resolve(*value).parse::<u32>() {
                        self.goal_values.insert(component_id, value);
                    }
                }
            } else if name.relation == keywords.init_marker && name.arguments.is_empty() {
                self.init_proposition = Some(component_id);
            } else if name.relation == keywords.terminal && name.arguments.is_empty() {
                self.terminal_proposition = Some(component_id);
            }
        }

        let pairs = self
            .legal_propositions
            .values()
            .flatten()
            .filter_map(|legal| {
                let name = self.component(*legal)?.name()?;

                self.find_proposition(keywords.does, &name.arguments)
                    .map(|input| (*legal, input))
            })
            .collect::<Vec<_>>();

        for (legal, input) in pairs {
            self.legal_inputs.insert(legal, input);
            self.input_legals.insert(input, legal);
        }
    }
}

fn is_base(components: &[Option<Component>], proposition: &Component) -> bool {
    proposition.is_proposition()
        && proposition
            .single_input()
            .and_then(|input| components.get(input.0))
            .and_then(Option::as_ref)
            .is_some_and(Component::is_transition)
}

use super::ComponentId;
use crate::term::{Fact, FxIndexSet};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ComponentKind {
    /// A named boolean. `underlying` is set on the propositions inserted by disjunction
    /// repair, and names the fact they contribute to.
    Proposition {
        name: Fact,
        underlying: Option<Fact>,
    },
    And,
    Or,
    Not,
    Constant(bool),
    /// One turn of delay: its input becomes visible at its output only after the state
    /// advances.
    Transition,
}

/// A node of the circuit, linked to its neighbours by handle.
#[derive(Clone, Debug)]
pub struct Component {
    pub(crate) kind: ComponentKind,
    pub(crate) inputs: FxIndexSet<ComponentId>,
    pub(crate) outputs: FxIndexSet<ComponentId>,
}

impl Component {
    pub(crate) fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            inputs: FxIndexSet::default(),
            outputs: FxIndexSet::default(),
        }
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn inputs(&self) -> &FxIndexSet<ComponentId> {
        &self.inputs
    }

    pub fn outputs(&self) -> &FxIndexSet<ComponentId> {
        &self.outputs
    }

    /// The fact naming a proposition.
    pub fn name(&self) -> Option<&Fact> {
        match &self.kind {
            ComponentKind::Proposition { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn underlying(&self) -> Option<&Fact> {
        match &self.kind {
            ComponentKind::Proposition { underlying, .. } => underlying.as_ref(),
            _ => None,
        }
    }

    pub fn is_proposition(&self) -> bool {
        matches!(self.kind, ComponentKind::Proposition { .. })
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, ComponentKind::Transition)
    }

    /// The only input, if there is exactly one.
    pub fn single_input(&self) -> Option<ComponentId> {
        match self.inputs.len() {
            1 => self.inputs.first().copied(),
            _ => None,
        }
    }
}

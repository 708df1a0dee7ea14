use std::ops::Range;

use rustc_hash::FxHashMap;

use super::{rule::RuleId, shape::ShapeKey};
use crate::{symbol::Symbol, term::FxIndexSet};

/// One tuple of constants filling the positions of a shape, in order.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Assignment {
    pub(crate) constants: Box<[Symbol]>,
}

impl Assignment {
    pub fn new(constants: impl Into<Box<[Symbol]>>) -> Self {
        Self {
            constants: constants.into(),
        }
    }

    pub fn constants(&self) -> &[Symbol] {
        &self.constants
    }
}

/// Every assignment discovered so far for one shape.
#[derive(Debug)]
pub struct Domain {
    pub(crate) shape: ShapeKey,
    assignments: FxIndexSet<Assignment>,
    // Position -> constant -> indices of the assignments holding that constant there
    index: Vec<FxHashMap<Symbol, Vec<usize>>>,
    pub(crate) producers: Vec<RuleId>,
    pub(crate) consumers: Vec<RuleId>,
    frontier: usize,
    delta: Range<usize>,
}

impl Domain {
    pub(crate) fn new(shape: ShapeKey) -> Self {
        Self {
            index: vec![FxHashMap::default(); shape.arity()],
            shape,
            assignments: FxIndexSet::default(),
            producers: Vec::new(),
            consumers: Vec::new(),
            frontier: 0,
            delta: 0..0,
        }
    }

    pub fn shape(&self) -> &ShapeKey {
        &self.shape
    }

    /// The rules concluding facts of this shape.
    pub fn producers(&self) -> &[RuleId] {
        &self.producers
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn contains(&self, assignment: &Assignment) -> bool {
        self.assignments.contains(assignment)
    }

    pub fn assignments(&self) -> impl ExactSizeIterator<Item = &Assignment> + '_ {
        self.assignments.iter()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Assignment> {
        self.assignments.get_index(index)
    }

    /// Indices of the assignments holding `constant` at `position`.
    pub(crate) fn matching(&self, position: usize, constant: Symbol) -> &[usize] {
        self.index
            .get(position)
            .and_then(|constants| constants.get(&constant))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Returns whether the assignment is new.
    pub(crate) fn insert(&mut self, assignment: Assignment) -> bool {
        debug_assert_eq!(assignment.constants.len(), self.index.len());

        if self.assignments.contains(&assignment) {
            return false;
        }

        let position = self.assignments.len();

        for (constant, constants) in assignment.constants.iter().zip(self.index.iter_mut()) {
            constants.entry(*constant).or_default().push(position);
        }

        self.assignments.insert(assignment)
    }

    /// Indices added during the previous round.
    pub(crate) fn delta(&self) -> Range<usize> {
        self.delta.clone()
    }

    /// Start a new round, returning whether the previous one added anything.
    pub(crate) fn advance_round(&mut self) -> bool {
        self.delta = self.frontier..self.assignments.len();
        self.frontier = self.assignments.len();

        !self.delta.is_empty()
    }
}

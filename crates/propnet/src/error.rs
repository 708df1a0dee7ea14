use thiserror::Error;

use crate::{circuit::ComponentId, symbol::Symbol};

/// Errors that abort the compilation of a game description.
///
/// Symbols are reported by handle; resolve them through the match's
/// [`SymbolTable`](crate::symbol::SymbolTable).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// `not(distinct(f(..), g(..)))` would need unification of function terms.
    #[error("equality between function terms `{left}` and `{right}` is not supported")]
    UnsupportedEquality { left: Symbol, right: Symbol },

    /// A literal that is neither a relation, a negated relation nor a disjunction.
    #[error("unsupported literal in a rule for `{relation}`")]
    UnsupportedLiteral { relation: Symbol },

    /// A state relation with no argument at all.
    #[error("`{relation}` has no argument where one was expected")]
    DegenerateTerm { relation: Symbol },

    /// A rule head that cannot be turned into a proposition.
    #[error("malformed rule head `{relation}`")]
    MalformedHead { relation: Symbol },

    /// A variable that no positive literal binds. Either the rule is unsafe or the domain
    /// indices are inconsistent.
    #[error("variable `{variable}` is not bound in a rule for `{relation}`")]
    UnboundVariable { variable: Symbol, relation: Symbol },

    /// A position index pointing at an assignment that does not fit its domain.
    #[error("the index of the domain of `{relation}` is inconsistent")]
    InconsistentIndex { relation: Symbol },

    #[error("domain of `{relation}` exceeded {limit} assignments")]
    DomainLimitExceeded { relation: Symbol, limit: usize },

    #[error("normalization did not converge after {0} passes")]
    NormalizationDiverged(usize),
}

/// Errors raised by structural operations on, and simulation of, a built circuit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// The init and terminal propositions cannot be removed.
    #[error("component {0} is load-bearing and cannot be removed")]
    ProtectedComponent(ComponentId),

    #[error("component {0} does not exist")]
    UnknownComponent(ComponentId),

    /// A cycle that does not pass through a transition.
    #[error("combinational cycle through component {0}")]
    CombinationalCycle(ComponentId),

    #[error("component {0} is not a legal move in this state")]
    IllegalMove(ComponentId),

    #[error("no move was given for role `{0}`")]
    MissingMove(Symbol),

    #[error("more than one move was given for role `{0}`")]
    DuplicateMove(Symbol),
}

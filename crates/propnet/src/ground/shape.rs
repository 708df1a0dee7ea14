use crate::{
    symbol::{Keywords, Symbol},
    term::{Fact, Term},
};

/// A term with every constant and variable erased.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Shape {
    Filler,
    Function(Symbol, Vec<Shape>),
}

impl Shape {
    pub fn of(term: &Term) -> Self {
        match term {
            Term::Constant(_) | Term::Variable(_) => Shape::Filler,
            Term::Function(name, arguments) => {
                Shape::Function(*name, arguments.iter().map(Shape::of).collect())
            }
        }
    }

    fn fillers(&self) -> usize {
        match self {
            Shape::Filler => 1,
            Shape::Function(_, arguments) => arguments.iter().map(Shape::fillers).sum(),
        }
    }
}

/// Identifies a domain: a canonical relation with the shapes of its arguments.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ShapeKey {
    pub relation: Symbol,
    pub arguments: Vec<Shape>,
}

impl ShapeKey {
    pub fn of(fact: &Fact, keywords: &Keywords) -> Self {
        Self {
            relation: keywords.canonical_relation(fact.relation),
            arguments: fact.arguments.iter().map(Shape::of).collect(),
        }
    }

    /// Number of constant positions of the shape, which is the length of its assignments.
    pub fn arity(&self) -> usize {
        self.arguments.iter().map(Shape::fillers).sum()
    }
}

/// The constants and variables of a fact, depth first, left to right.
pub(crate) fn leaves(fact: &Fact) -> Vec<&Term> {
    fn visit<'a>(term: &'a Term, leaves: &mut Vec<&'a Term>) {
        match term {
            Term::Function(_, arguments) => {
                for argument in arguments {
                    visit(argument, leaves);
                }
            }
            leaf => leaves.push(leaf),
        }
    }

    let mut leaves = Vec::new();

    for argument in &fact.arguments {
        visit(argument, &mut leaves);
    }

    leaves
}

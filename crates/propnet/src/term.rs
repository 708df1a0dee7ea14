use std::fmt;

use either::Either;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::symbol::{Symbol, SymbolTable};

pub use propnet_macros::gdl;

pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Maps variables to the terms replacing them.
pub type Substitution = FxHashMap<Symbol, Term>;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    Constant(Symbol),
    Variable(Symbol),
    Function(Symbol, Vec<Term>),
}

impl Term {
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Constant(_) => true,
            Term::Variable(_) => false,
            Term::Function(_, arguments) => arguments.iter().all(Term::is_ground),
        }
    }

    /// Collect variables in order of first occurrence.
    pub fn collect_variables(&self, variables: &mut FxIndexSet<Symbol>) {
        match self {
            Term::Constant(_) => {}
            Term::Variable(variable) => {
                variables.insert(*variable);
            }
            Term::Function(_, arguments) => {
                for argument in arguments {
                    argument.collect_variables(variables);
                }
            }
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Term {
        match self {
            Term::Constant(_) => self.clone(),
            Term::Variable(variable) => substitution
                .get(variable)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Term::Function(name, arguments) => Term::Function(
                *name,
                arguments
                    .iter()
                    .map(|argument| argument.substitute(substitution))
                    .collect(),
            ),
        }
    }

    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> impl fmt::Display + 'a {
        Displayed {
            item: self,
            symbols,
        }
    }
}

/// A relation applied to arguments. Zero arguments is a valid (propositional) fact.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Fact {
    pub relation: Symbol,
    pub arguments: Vec<Term>,
}

impl Fact {
    pub fn new(relation: Symbol, arguments: Vec<Term>) -> Self {
        Self {
            relation,
            arguments,
        }
    }

    pub fn proposition(relation: Symbol) -> Self {
        Self::new(relation, Vec::new())
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_ground(&self) -> bool {
        self.arguments.iter().all(Term::is_ground)
    }

    pub fn collect_variables(&self, variables: &mut FxIndexSet<Symbol>) {
        for argument in &self.arguments {
            argument.collect_variables(variables);
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Fact {
        Fact {
            relation: self.relation,
            arguments: self
                .arguments
                .iter()
                .map(|argument| argument.substitute(substitution))
                .collect(),
        }
    }

    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> impl fmt::Display + 'a {
        Displayed {
            item: self,
            symbols,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Implication {
    pub head: Fact,
    pub body: Vec<Expression>,
}

impl Implication {
    pub fn new(head: Fact, body: Vec<Expression>) -> Self {
        Self { head, body }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Expression {
    Fact(Fact),
    Implication(Implication),
    Negation(Box<Expression>),
    Disjunction(Vec<Expression>),
}

impl Expression {
    /// The head of a fact or implication.
    pub fn head(&self) -> Option<&Fact> {
        match self {
            Expression::Fact(fact) => Some(fact),
            Expression::Implication(implication) => Some(&implication.head),
            _ => None,
        }
    }

    /// The conjuncts of an implication, and nothing for every other expression.
    pub fn body(&self) -> impl Iterator<Item = &Expression> + '_ {
        match self {
            Expression::Implication(implication) => Either::Left(implication.body.iter()),
            _ => Either::Right(std::iter::empty()),
        }
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Expression::Fact(fact) => fact.is_ground(),
            Expression::Implication(implication) => {
                implication.head.is_ground() && implication.body.iter().all(Expression::is_ground)
            }
            Expression::Negation(inner) => inner.is_ground(),
            Expression::Disjunction(alternatives) => alternatives.iter().all(Expression::is_ground),
        }
    }

    pub fn collect_variables(&self, variables: &mut FxIndexSet<Symbol>) {
        match self {
            Expression::Fact(fact) => fact.collect_variables(variables),
            Expression::Implication(implication) => {
                implication.head.collect_variables(variables);

                for conjunct in &implication.body {
                    conjunct.collect_variables(variables);
                }
            }
            Expression::Negation(inner) => inner.collect_variables(variables),
            Expression::Disjunction(alternatives) => {
                for alternative in alternatives {
                    alternative.collect_variables(variables);
                }
            }
        }
    }

    pub fn variables(&self) -> FxIndexSet<Symbol> {
        let mut variables = FxIndexSet::default();

        self.collect_variables(&mut variables);

        variables
    }

    pub fn substitute(&self, substitution: &Substitution) -> Expression {
        match self {
            Expression::Fact(fact) => Expression::Fact(fact.substitute(substitution)),
            Expression::Implication(implication) => Expression::Implication(Implication {
                head: implication.head.substitute(substitution),
                body: implication
                    .body
                    .iter()
                    .map(|conjunct| conjunct.substitute(substitution))
                    .collect(),
            }),
            Expression::Negation(inner) => {
                Expression::Negation(Box::new(inner.substitute(substitution)))
            }
            Expression::Disjunction(alternatives) => Expression::Disjunction(
                alternatives
                    .iter()
                    .map(|alternative| alternative.substitute(substitution))
                    .collect(),
            ),
        }
    }

    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> impl fmt::Display + 'a {
        Displayed {
            item: self,
            symbols,
        }
    }
}

impl From<Fact> for Expression {
    fn from(fact: Fact) -> Self {
        Expression::Fact(fact)
    }
}

fn write_arguments(
    f: &mut fmt::Formatter<'_>,
    arguments: &[Term],
    symbols: &SymbolTable,
) -> fmt::Result {
    f.write_str("(")?;

    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }

        argument.write_gdl(f, symbols)?;
    }

    f.write_str(")")
}

impl WriteGdl for Term {
    fn write_gdl(&self, f: &mut fmt::Formatter<'_>, symbols: &SymbolTable) -> fmt::Result {
        match self {
            Term::Constant(constant) => f.write_str(symbols.resolve(*constant)),
            Term::Variable(variable) => write!(f, "?{}", symbols.resolve(*variable)),
            Term::Function(name, arguments) => {
                f.write_str(symbols.resolve(*name))?;
                write_arguments(f, arguments, symbols)
            }
        }
    }
}

impl WriteGdl for Fact {
    fn write_gdl(&self, f: &mut fmt::Formatter<'_>, symbols: &SymbolTable) -> fmt::Result {
        f.write_str(symbols.resolve(self.relation))?;

        if self.arguments.is_empty() {
            Ok(())
        } else {
            write_arguments(f, &self.arguments, symbols)
        }
    }
}

impl WriteGdl for Expression {
    fn write_gdl(&self, f: &mut fmt::Formatter<'_>, symbols: &SymbolTable) -> fmt::Result {
        match self {
            Expression::Fact(fact) => fact.write_gdl(f, symbols),
            Expression::Implication(implication) => {
                implication.head.write_gdl(f, symbols)?;
                f.write_str(" <= ")?;

                for (index, conjunct) in implication.body.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }

                    conjunct.write_gdl(f, symbols)?;
                }

                Ok(())
            }
            Expression::Negation(inner) => {
                f.write_str("not(")?;
                inner.write_gdl(f, symbols)?;
                f.write_str(")")
            }
            Expression::Disjunction(alternatives) => {
                f.write_str("or(")?;

                for (index, alternative) in alternatives.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }

                    alternative.write_gdl(f, symbols)?;
                }

                f.write_str(")")
            }
        }
    }
}

trait WriteGdl {
    fn write_gdl(&self, f: &mut fmt::Formatter<'_>, symbols: &SymbolTable) -> fmt::Result;
}

struct Displayed<'a, T> {
    item: &'a T,
    symbols: &'a SymbolTable,
}

impl<T: WriteGdl> fmt::Display for Displayed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.item.write_gdl(f, self.symbols)
    }
}

use tracing::{debug, debug_span};

use crate::{
    circuit::{Circuit, CircuitBuilder},
    config::CompileConfig,
    error::CompileError,
    ground::Grounder,
    normalize::Normalizer,
    symbol::{Symbol, SymbolTable},
    term::{Expression, FxIndexSet, Term},
};

/// The rules of a game with the roles playing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDescription {
    pub roles: Vec<Symbol>,
    pub rules: Vec<Expression>,
}

impl GameDescription {
    /// Roles are taken from the ground `role` facts of the rules, in order.
    pub fn new(rules: Vec<Expression>, symbols: &SymbolTable) -> Self {
        let role = symbols.keywords().role;

        let roles = rules
            .iter()
            .filter_map(|expression| match expression {
                Expression::Fact(fact) if fact.relation == role => match fact.arguments.as_slice() {
                    [Term::Constant(role)] => Some(*role),
                    _ => None,
                },
                _ => None,
            })
            .collect::<FxIndexSet<_>>();

        Self {
            roles: roles.into_iter().collect(),
            rules,
        }
    }

    pub fn with_roles(roles: Vec<Symbol>, rules: Vec<Expression>) -> Self {
        Self { roles, rules }
    }
}

/// Compilation context of one match.
///
/// The symbol table is borrowed for the whole pipeline, so several matches can compile side
/// by side, each with its own table.
pub struct Compiler<'a> {
    symbols: &'a mut SymbolTable,
    config: CompileConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(symbols: &'a mut SymbolTable) -> Self {
        Self::with_config(symbols, CompileConfig::default())
    }

    pub fn with_config(symbols: &'a mut SymbolTable, config: CompileConfig) -> Self {
        Self { symbols, config }
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn normalize(&mut self, rules: Vec<Expression>) -> Result<Vec<Expression>, CompileError> {
        Normalizer::new(self.symbols, self.config).normalize(rules)
    }

    /// Every ground instantiation of normalized rules.
    pub fn ground(&self, rules: &[Expression]) -> Result<Vec<Expression>, CompileError> {
        Grounder::new(*self.symbols.keywords(), self.config).ground(rules)
    }

    pub fn build(
        &self,
        roles: Vec<Symbol>,
        ground: &[Expression],
    ) -> Result<Circuit, CompileError> {
        CircuitBuilder::new(self.symbols, roles).build(ground)
    }

    /// Normalize, ground and build a description into a classified circuit.
    pub fn compile(&mut self, description: GameDescription) -> Result<Circuit, CompileError> {
        let _span = debug_span!("compile", rules = description.rules.len()).entered();

        let normalized = self.normalize(description.rules)?;
        let ground = self.ground(&normalized)?;
        let circuit = self.build(description.roles, &ground)?;

        debug!(
            normalized = normalized.len(),
            ground = ground.len(),
            components = circuit.len(),
            "compiled"
        );

        Ok(circuit)
    }
}

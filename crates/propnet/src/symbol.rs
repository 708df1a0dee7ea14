use std::fmt;

use rustc_hash::FxHashMap;

/// An interned relation, function, constant or variable name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(pub(crate) u32);

impl Symbol {
    /// The raw handle, stable for the lifetime of the owning [`SymbolTable`].
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Reserved names the pipeline dispatches on.
#[derive(Clone, Copy, Debug)]
pub struct Keywords {
    pub role: Symbol,
    pub init: Symbol,
    pub true_: Symbol,
    pub next: Symbol,
    pub legal: Symbol,
    pub does: Symbol,
    pub goal: Symbol,
    pub terminal: Symbol,
    pub distinct: Symbol,
    pub base: Symbol,
    pub input: Symbol,
    /// Name of the single proposition that seeds the initial state.
    pub init_marker: Symbol,
    /// Name shared by every proposition that only exists as a gate output.
    pub anonymous: Symbol,
    /// Name shared by the propositions inserted by disjunction repair.
    pub disjunct: Symbol,
}

impl Keywords {
    /// Relations whose single argument is a piece of game state.
    pub fn is_state_relation(&self, relation: Symbol) -> bool {
        relation == self.true_
            || relation == self.next
            || relation == self.init
            || relation == self.base
    }

    /// The relation a literal draws its values from. `legal` shares the universe of `does`,
    /// and `next` and `init` share the universe of `true`.
    pub fn canonical_relation(&self, relation: Symbol) -> Symbol {
        if relation == self.legal {
            self.does
        } else if relation == self.next || relation == self.init {
            self.true_
        } else {
            relation
        }
    }
}

/// Owns the strings behind every [`Symbol`] of a match.
///
/// A table is created per match and passed by reference through the whole pipeline; nothing
/// in this crate keeps a process-wide table.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Symbol>,
    keywords: Keywords,
}

impl SymbolTable {
    /// Create a table with the [`Keywords`] already interned.
    pub fn new() -> Self {
        let mut names = Vec::new();
        let mut lookup = FxHashMap::default();

        let mut intern = |name: &str| {
            let symbol = Symbol(names.len() as u32);

            names.push(Box::from(name));
            lookup.insert(Box::from(name), symbol);

            symbol
        };

        let keywords = Keywords {
            role: intern("role"),
            init: intern("init"),
            true_: intern("true"),
            next: intern("next"),
            legal: intern("legal"),
            does: intern("does"),
            goal: intern("goal"),
            terminal: intern("terminal"),
            distinct: intern("distinct"),
            base: intern("base"),
            input: intern("input"),
            init_marker: intern("INIT"),
            anonymous: intern("anon"),
            disjunct: intern("disjunct"),
        };

        Self {
            names,
            lookup,
            keywords,
        }
    }

    /// Intern a name, returning its symbol (get-or-create).
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&symbol) = self.lookup.get(name) {
            return symbol;
        }

        let symbol = Symbol(self.names.len() as u32);

        self.names.push(Box::from(name));
        self.lookup.insert(Box::from(name), symbol);

        symbol
    }

    /// The symbol of an already interned name.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.lookup.get(name).copied()
    }

    /// The name behind a symbol. Symbols from another table resolve to `"?"`.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.names
            .get(symbol.0 as usize)
            .map(|name| &**name)
            .unwrap_or("?")
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

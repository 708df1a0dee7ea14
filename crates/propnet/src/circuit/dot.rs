use std::fmt;

use super::{Circuit, ComponentKind};
use crate::symbol::SymbolTable;

/// A [`Circuit`] rendered as a DOT graph.
pub struct Dot<'a> {
    circuit: &'a Circuit,
    symbols: &'a SymbolTable,
}

impl<'a> Dot<'a> {
    pub(super) fn new(circuit: &'a Circuit, symbols: &'a SymbolTable) -> Self {
        Self { circuit, symbols }
    }
}

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph propnet {{")?;

        for (component_id, component) in self.circuit.components() {
            write!(f, "    \"@{}\" [", component_id.0)?;

            match component.kind() {
                ComponentKind::Proposition { name, underlying } => {
                    let fill = if self.circuit.base_propositions().contains(&component_id) {
                        "grey"
                    } else if self.circuit.input_propositions().contains(&component_id) {
                        "lightblue"
                    } else {
                        "white"
                    };

                    let name = underlying.as_ref().unwrap_or(name);

                    write!(
                        f,
                        "shape=circle, style=filled, fillcolor={fill}, label=\"{}\"",
                        name.display(self.symbols)
                    )?;
                }
                ComponentKind::And => f.write_str("shape=invhouse, label=\"AND\"")?,
                ComponentKind::Or => f.write_str("shape=ellipse, label=\"OR\"")?,
                ComponentKind::Not => f.write_str("shape=invtriangle, label=\"NOT\"")?,
                ComponentKind::Constant(value) => {
                    write!(f, "shape=doublecircle, label=\"{}\"", value.to_string().to_uppercase())?
                }
                ComponentKind::Transition => f.write_str("shape=box, label=\"TRANSITION\"")?,
            }

            writeln!(f, "];")?;

            for output in component.outputs() {
                writeln!(f, "    \"@{}\" -> \"@{}\";", component_id.0, output.0)?;
            }
        }

        writeln!(f, "}}")
    }
}

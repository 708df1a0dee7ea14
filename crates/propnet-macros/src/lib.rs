use std::env;

use proc_macro2::Span;
use proc_macro_crate::{crate_name, FoundCrate};
use sentence::Description;
use syn::{parse_macro_input, Ident};

mod sentence;
mod term;

pub(crate) fn crate_root() -> Ident {
    let name = if env::var("CARGO_PKG_NAME").is_ok_and(|name| name == "propnet") {
        String::from("propnet")
    } else {
        match crate_name("propnet") {
            Ok(FoundCrate::Name(root_name)) => root_name,
            Ok(FoundCrate::Itself) | Err(_) => String::from("propnet"),
        }
    };

    Ident::new(&name, Span::call_site())
}

/// Write game rules in a Rust-token rendition of GDL.
///
/// ```ignore
/// let rules = gdl!(symbols =>
///     role(robot);
///     init(off);
///     legal(robot, press);
///     next(on) <= does(robot, press), true(off);
///     terminal <= true(on);
///     goal(robot, 100) <= true(on);
///     goal(robot, 0) <= not(true(on));
///     reachable('x, 'y) <= edge('x, 'y);
///     reachable('x, 'z) <= edge('x, 'y), reachable('y, 'z), distinct('x, 'z);
/// );
/// ```
///
/// `'x` is a variable. Every name is interned in the given `SymbolTable`, and the expansion
/// is a `Vec<Expression>`.
#[proc_macro]
pub fn gdl(tokens: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(tokens as Description);

    proc_macro::TokenStream::from(input.construct(&crate_root()))
}

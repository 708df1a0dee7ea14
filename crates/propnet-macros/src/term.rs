use quote::quote;
use syn::{
    ext::IdentExt,
    parenthesized,
    parse::{Parse, ParseStream},
    token, Ident, Lifetime, LitInt, Token,
};

pub(crate) enum Term {
    Variable(String),
    Constant(String),
    Function(String, Vec<Term>),
}

impl Term {
    pub(crate) fn construct(&self, crate_root: &Ident) -> proc_macro2::TokenStream {
        match self {
            Term::Variable(name) => {
                quote! { #crate_root::term::Term::Variable(__gdl_symbols.intern(#name)) }
            }
            Term::Constant(name) => {
                quote! { #crate_root::term::Term::Constant(__gdl_symbols.intern(#name)) }
            }
            Term::Function(name, arguments) => {
                let arguments = arguments.iter().map(|argument| argument.construct(crate_root));

                quote! {
                    #crate_root::term::Term::Function(
                        __gdl_symbols.intern(#name),
                        vec![#(#arguments),*],
                    )
                }
            }
        }
    }
}

impl Parse for Term {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(Lifetime) {
            return Ok(Self::Variable(input.parse::<Lifetime>()?.ident.to_string()));
        }

        if input.peek(LitInt) {
            return Ok(Self::Constant(input.parse::<LitInt>()?.base10_digits().to_owned()));
        }

        let name = Ident::parse_any(input)?.to_string();

        if !input.peek(token::Paren) {
            return Ok(Self::Constant(name));
        }

        Ok(Self::Function(name, parse_arguments(input)?))
    }
}

/// A parenthesized, comma separated list of terms.
pub(crate) fn parse_arguments(input: ParseStream) -> syn::Result<Vec<Term>> {
    let content;
    parenthesized!(content in input);

    Ok(content
        .parse_terminated(Term::parse, Token![,])?
        .into_iter()
        .collect())
}

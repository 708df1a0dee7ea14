use quote::quote;
use syn::{
    ext::IdentExt,
    parenthesized,
    parse::{Parse, ParseStream},
    token, Expr, Ident, Token,
};

use crate::term::{parse_arguments, Term};

/// A relation applied to terms, e.g. `cell(1, 'y, b)` or `terminal`.
pub(crate) struct Fact {
    relation: String,
    arguments: Vec<Term>,
}

impl Fact {
    fn construct(&self, crate_root: &Ident) -> proc_macro2::TokenStream {
        let relation = &self.relation;
        let arguments = self
            .arguments
            .iter()
            .map(|argument| argument.construct(crate_root));

        quote! {
            #crate_root::term::Fact::new(__gdl_symbols.intern(#relation), vec![#(#arguments),*])
        }
    }
}

impl Parse for Fact {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let relation = Ident::parse_any(input)?.to_string();

        let arguments = if input.peek(token::Paren) {
            parse_arguments(input)?
        } else {
            Vec::new()
        };

        Ok(Self {
            relation,
            arguments,
        })
    }
}

enum Literal {
    Fact(Fact),
    Negation(Box<Literal>),
    Disjunction(Vec<Literal>),
}

impl Literal {
    fn construct(&self, crate_root: &Ident) -> proc_macro2::TokenStream {
        match self {
            Literal::Fact(fact) => {
                let fact = fact.construct(crate_root);

                quote! { #crate_root::term::Expression::Fact(#fact) }
            }
            Literal::Negation(inner) => {
                let inner = inner.construct(crate_root);

                quote! { #crate_root::term::Expression::Negation(Box::new(#inner)) }
            }
            Literal::Disjunction(alternatives) => {
                let alternatives = alternatives
                    .iter()
                    .map(|alternative| alternative.construct(crate_root));

                quote! { #crate_root::term::Expression::Disjunction(vec![#(#alternatives),*]) }
            }
        }
    }
}

impl Parse for Literal {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let keyword = input.fork().call(Ident::parse_any).ok();
        let connective = keyword
            .map(|keyword| keyword.to_string())
            .filter(|keyword| keyword == "not" || keyword == "or");

        let Some(connective) = connective.filter(|_| input.peek2(token::Paren)) else {
            return Ok(Self::Fact(input.parse()?));
        };

        Ident::parse_any(input)?;

        let content;
        parenthesized!(content in input);

        let literals = content
            .parse_terminated(Literal::parse, Token![,])?
            .into_iter()
            .collect::<Vec<_>>();

        if connective == "or" {
            return Ok(Self::Disjunction(literals));
        }

        let mut literals = literals.into_iter();

        match (literals.next(), literals.next()) {
            (Some(inner), None) => Ok(Self::Negation(Box::new(inner))),
            _ => Err(content.error("`not` takes exactly one literal")),
        }
    }
}

/// `head` or `head <= literal, ...`.
struct Sentence {
    head: Fact,
    body: Option<Vec<Literal>>,
}

impl Sentence {
    fn construct(&self, crate_root: &Ident) -> proc_macro2::TokenStream {
        let head = self.head.construct(crate_root);

        match &self.body {
            None => quote! { #crate_root::term::Expression::Fact(#head) },
            Some(body) => {
                let body = body.iter().map(|literal| literal.construct(crate_root));

                quote! {
                    #crate_root::term::Expression::Implication(
                        #crate_root::term::Implication::new(#head, vec![#(#body),*]),
                    )
                }
            }
        }
    }
}

impl Parse for Sentence {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let head = input.parse::<Fact>()?;

        if !input.peek(Token![<=]) {
            return Ok(Self { head, body: None });
        }

        input.parse::<Token![<=]>()?;

        let mut body = vec![input.parse::<Literal>()?];

        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            body.push(input.parse::<Literal>()?);
        }

        Ok(Self {
            head,
            body: Some(body),
        })
    }
}

/// `symbols => sentence; sentence; ...`
pub(crate) struct Description {
    symbols: Expr,
    sentences: Vec<Sentence>,
}

impl Description {
    pub(crate) fn construct(&self, crate_root: &Ident) -> proc_macro2::TokenStream {
        let symbols = &self.symbols;
        let sentences = self
            .sentences
            .iter()
            .map(|sentence| sentence.construct(crate_root));

        quote! {
            {
                let __gdl_symbols: &mut #crate_root::symbol::SymbolTable = &mut #symbols;

                ::std::vec![#(#sentences),*]
            }
        }
    }
}

impl Parse for Description {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let symbols = input.parse::<Expr>()?;

        input.parse::<Token![=>]>()?;

        let sentences = input
            .parse_terminated(Sentence::parse, Token![;])?
            .into_iter()
            .collect();

        Ok(Self { symbols, sentences })
    }
}

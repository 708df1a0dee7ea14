use crate::{
    symbol::{Keywords, Symbol},
    term::{Expression, FxIndexSet},
};

fn is_equality_literal(literal: &Expression, keywords: &Keywords) -> bool {
    match literal {
        Expression::Fact(fact) => fact.relation == keywords.distinct,
        Expression::Negation(inner) => is_equality_literal(inner, keywords),
        _ => false,
    }
}

fn binds(literal: &Expression, keywords: &Keywords) -> FxIndexSet<Symbol> {
    match literal {
        Expression::Fact(fact) if fact.relation != keywords.distinct => {
            let mut variables = FxIndexSet::default();

            fact.collect_variables(&mut variables);

            variables
        }
        // Only what every alternative binds
        Expression::Disjunction(alternatives) => {
            let mut alternatives = alternatives
                .iter()
                .map(|alternative| binds(alternative, keywords));

            let Some(mut variables) = alternatives.next() else {
                return FxIndexSet::default();
            };

            for other in alternatives {
                variables.retain(|variable| other.contains(variable));
            }

            variables
        }
        _ => FxIndexSet::default(),
    }
}

/// Reorder a rule body so every equality literal comes after the literals binding all of its
/// variables. Held literals are released as soon as their variables are bound, so they stay as
/// early as possible; literals whose variables are never bound end up last.
pub fn order_body(body: Vec<Expression>, keywords: &Keywords) -> Vec<Expression> {
    let mut bound = FxIndexSet::default();
    let mut held = Vec::new();
    let mut ordered = Vec::with_capacity(body.len());

    for literal in body {
        if is_equality_literal(&literal, keywords) {
            if literal.variables().iter().all(|variable| bound.contains(variable)) {
                ordered.push(literal);
            } else {
                held.push(literal);
            }

            continue;
        }

        bound.extend(binds(&literal, keywords));
        ordered.push(literal);

        let (ready, waiting) = held.into_iter().partition::<Vec<_>, _>(|literal: &Expression| {
            literal.variables().iter().all(|variable| bound.contains(variable))
        });

        ordered.extend(ready);
        held = waiting;
    }

    ordered.extend(held);

    ordered
}

use propnet::{
    config::CompileConfig,
    error::CompileError,
    ground::{Assignment, Grounder},
    symbol::{Symbol, SymbolTable},
    term::{gdl, Expression, Fact, Term},
};
use proptest::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

const GRAPH_SIZE: usize = 30;
const MAXIMUM_CYCLES: usize = 10;
const SEED: u64 = 42;

fn grounder(symbols: &SymbolTable) -> Grounder {
    Grounder::new(*symbols.keywords(), CompileConfig::default())
}

fn pattern(symbols: &mut SymbolTable, relation: &str, arity: usize) -> Fact {
    let relation = symbols.intern(relation);
    let variable = symbols.intern("any");

    Fact::new(relation, vec![Term::Variable(variable); arity])
}

fn constants(symbols: &mut SymbolTable, names: &[&str]) -> Assignment {
    Assignment::new(
        names
            .iter()
            .map(|name| symbols.intern(name))
            .collect::<Vec<_>>(),
    )
}

fn displayed(symbols: &SymbolTable, expressions: &[Expression]) -> Vec<String> {
    expressions
        .iter()
        .map(|expression| expression.display(symbols).to_string())
        .collect()
}

#[test]
fn test_bounded_recursion_reaches_every_tuple_once() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        succ(0, 1);
        succ(1, 2);
        succ(2, 3);
        succ(3, 4);
        count(0);
        count('y) <= count('x), succ('x, 'y);
    );

    let mut grounder = grounder(&symbols);
    let ground = grounder.ground(&rules).unwrap();

    let count = pattern(&mut symbols, "count", 1);
    let domain = grounder.domain(&count).unwrap();

    assert_eq!(domain.len(), 5);

    for number in ["0", "1", "2", "3", "4"] {
        assert!(domain.contains(&constants(&mut symbols, &[number])));
    }

    assert!(ground.iter().all(Expression::is_ground));
    assert_eq!(
        ground
            .iter()
            .filter(|expression| matches!(expression, Expression::Implication(_)))
            .count(),
        4
    );
    assert!(displayed(&symbols, &ground)
        .contains(&String::from("count(3) <= count(2), succ(2, 3)")));
}

#[test]
fn test_graph_closure() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut symbols = SymbolTable::new();

    let mut rules = gdl!(symbols =>
        path('x, 'y) <= edge('x, 'y);
        path('x, 'z) <= path('x, 'y), edge('y, 'z);
    );

    let edge = symbols.intern("edge");

    let mut add_edge = |from: Symbol, to: Symbol| {
        for (from, to) in [(from, to), (to, from)] {
            rules.push(Expression::Fact(Fact::new(
                edge,
                vec![Term::Constant(from), Term::Constant(to)],
            )));
        }
    };

    let mut nodes = vec![symbols.intern("n0")];

    for index in 1..GRAPH_SIZE {
        let new_node = symbols.intern(&format!("n{index}"));
        let other_node = *nodes.choose(&mut rng).unwrap();

        add_edge(new_node, other_node);

        nodes.push(new_node);
    }

    for _ in 0..MAXIMUM_CYCLES {
        let node_a = *nodes.choose(&mut rng).unwrap();
        let node_b = *nodes.choose(&mut rng).unwrap();

        add_edge(node_a, node_b);
    }

    let mut grounder = grounder(&symbols);

    grounder.ground(&rules).unwrap();

    let path = pattern(&mut symbols, "path", 2);
    let domain = grounder.domain(&path).unwrap();

    // The graph is connected and every edge goes both ways
    assert_eq!(domain.len(), GRAPH_SIZE * GRAPH_SIZE);

    for first in &nodes {
        for second in &nodes {
            assert!(domain.contains(&Assignment::new(vec![*first, *second])));
        }
    }

    assert!(grounder.report().rounds > 1);
}

#[test]
fn test_disjunctions_ground_per_alternative() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q(a);
        r(b);
        p('x) <= or(q('x), r('x));
    );

    let mut grounder = grounder(&symbols);
    let ground = grounder.ground(&rules).unwrap();

    let p = pattern(&mut symbols, "p", 1);

    assert_eq!(grounder.domain(&p).unwrap().len(), 2);
    assert_eq!(grounder.domain(&p).unwrap().producers().len(), 2);
    assert_eq!(
        displayed(&symbols, &ground),
        ["q(a)", "r(b)", "p(a) <= q(a)", "p(b) <= r(b)"]
    );
}

#[test]
fn test_negations_do_not_restrict_grounding() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q(a);
        q(b);
        r(a);
        p('x) <= q('x), not(r('x));
    );

    let mut grounder = grounder(&symbols);
    let ground = grounder.ground(&rules).unwrap();

    let ground = displayed(&symbols, &ground);

    assert!(ground.contains(&String::from("p(a) <= q(a), not(r(a))")));
    assert!(ground.contains(&String::from("p(b) <= q(b), not(r(b))")));
}

#[test]
fn test_distinct_filters_substitutions() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q(a);
        q(b);
        p('x, 'y) <= q('x), q('y), distinct('x, 'y);
        same('x) <= q('x), q('y), not(distinct('x, 'y));
    );

    let mut grounder = grounder(&symbols);

    grounder.ground(&rules).unwrap();

    let p = pattern(&mut symbols, "p", 2);
    let domain = grounder.domain(&p).unwrap();

    assert_eq!(domain.len(), 2);
    assert!(domain.contains(&constants(&mut symbols, &["a", "b"])));
    assert!(domain.contains(&constants(&mut symbols, &["b", "a"])));

    let same = pattern(&mut symbols, "same", 1);

    assert_eq!(grounder.domain(&same).unwrap().len(), 2);
}

#[test]
fn test_equalities_inside_disjunctions_wait_for_their_bindings() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q(a);
        q(b);
        s(a);
        p('x) <= or(distinct('x, a), s('x)), q('x);
    );

    let mut grounder = grounder(&symbols);
    let ground = grounder.ground(&rules).unwrap();

    let p = pattern(&mut symbols, "p", 1);
    let domain = grounder.domain(&p).unwrap();

    assert_eq!(domain.len(), 2);
    assert!(domain.contains(&constants(&mut symbols, &["a"])));
    assert!(domain.contains(&constants(&mut symbols, &["b"])));

    let ground = displayed(&symbols, &ground);

    assert!(ground.contains(&String::from("p(b) <= q(b), distinct(b, a)")));
    assert!(ground.contains(&String::from("p(a) <= s(a), q(a)")));
}

#[test]
fn test_state_relations_share_a_domain() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        succ(0, 1);
        succ(1, 2);
        init(step(0));
        next(step('y)) <= true(step('x)), succ('x, 'y);
    );

    let mut grounder = grounder(&symbols);

    grounder.ground(&rules).unwrap();

    let step = symbols.intern("step");
    let variable = Term::Function(step, vec![Term::Variable(symbols.intern("x"))]);
    let keywords = *symbols.keywords();

    let state = Fact::new(keywords.true_, vec![variable.clone()]);
    let next = Fact::new(keywords.next, vec![variable]);

    assert_eq!(grounder.domain(&state).unwrap().len(), 3);
    assert_eq!(
        grounder.domain(&next).unwrap().shape(),
        grounder.domain(&state).unwrap().shape()
    );
}

#[test]
fn test_unconditional_rule_produces_one_assignment() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols => p <= not(q));

    let mut grounder = grounder(&symbols);
    let ground = grounder.ground(&rules).unwrap();

    let p = pattern(&mut symbols, "p", 0);

    assert_eq!(grounder.domain(&p).unwrap().len(), 1);
    assert_eq!(displayed(&symbols, &ground), ["p <= not(q)"]);
}

#[test]
fn test_unsafe_rules_are_fatal() {
    let mut symbols = SymbolTable::new();

    let negated = gdl!(symbols => p('x) <= not(q('x)));
    let filtered = gdl!(symbols =>
        q(b);
        p('x) <= distinct('x, a), q(b);
    );

    let p = symbols.intern("p");
    let x = symbols.intern("x");
    let expected = Err(CompileError::UnboundVariable {
        variable: x,
        relation: p,
    });

    assert_eq!(grounder(&symbols).ground(&negated), expected);
    assert_eq!(grounder(&symbols).ground(&filtered), expected);
}

#[test]
fn test_domain_limit() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        succ(0, 1);
        succ(1, 2);
        succ(2, 3);
        count(0);
        count('y) <= count('x), succ('x, 'y);
    );

    let config = CompileConfig {
        max_domain_size: Some(3),
        ..CompileConfig::default()
    };

    let count = symbols.intern("count");

    assert_eq!(
        Grounder::new(*symbols.keywords(), config).ground(&rules),
        Err(CompileError::DomainLimitExceeded {
            relation: count,
            limit: 3
        })
    );
}

/// Pairs reachable through one or more edges.
fn closure(universe: usize, edges: &[(usize, usize)]) -> usize {
    let mut reachable = vec![vec![false; universe]; universe];

    for &(from, to) in edges {
        reachable[from][to] = true;
    }

    for middle in 0..universe {
        for from in 0..universe {
            for to in 0..universe {
                reachable[from][to] |= reachable[from][middle] && reachable[middle][to];
            }
        }
    }

    reachable.iter().flatten().filter(|reachable| **reachable).count()
}

proptest! {
    #[test]
    fn domains_stay_within_the_universe(
        universe in 1_usize..6,
        edges in prop::collection::vec((0_usize..6, 0_usize..6), 0..24),
    ) {
        let edges = edges
            .into_iter()
            .map(|(from, to)| (from % universe, to % universe))
            .collect::<Vec<_>>();

        let mut symbols = SymbolTable::new();

        let mut rules = gdl!(symbols =>
            reach('x, 'y) <= link('x, 'y);
            reach('x, 'z) <= reach('x, 'y), reach('y, 'z);
            source('x) <= reach('x, 'y);
        );

        let link = symbols.intern("link");
        let nodes = (0..universe)
            .map(|index| symbols.intern(&format!("c{index}")))
            .collect::<Vec<_>>();

        for &(from, to) in &edges {
            rules.push(Expression::Fact(Fact::new(
                link,
                vec![Term::Constant(nodes[from]), Term::Constant(nodes[to])],
            )));
        }

        let mut grounder = grounder(&symbols);

        grounder.ground(&rules).unwrap();

        let reach = pattern(&mut symbols, "reach", 2);
        let source = pattern(&mut symbols, "source", 1);

        let reached = grounder.domain(&reach).map_or(0, |domain| domain.len());
        let sources = grounder.domain(&source).map_or(0, |domain| domain.len());

        prop_assert!(reached <= universe * universe);
        prop_assert!(sources <= universe);
        prop_assert_eq!(reached, closure(universe, &edges));
    }
}

use propnet::{
    circuit::{Circuit, ComponentId, ComponentKind, Simulator},
    compile::{Compiler, GameDescription},
    error::{CircuitError, CompileError},
    symbol::SymbolTable,
    term::{gdl, Expression, Fact},
};

fn compile(symbols: &mut SymbolTable, rules: Vec<Expression>) -> Result<Circuit, CompileError> {
    let description = GameDescription::new(rules, symbols);

    Compiler::new(symbols).compile(description)
}

fn fact(expressions: Vec<Expression>) -> Fact {
    match expressions.into_iter().next() {
        Some(Expression::Fact(fact)) => fact,
        expression => panic!("expected a single fact, found {expression:?}"),
    }
}

fn button_game(symbols: &mut SymbolTable) -> Circuit {
    let rules = gdl!(*symbols =>
        role(player);
        init(off);
        legal(player, press);
        legal(player, wait);
        next(on) <= does(player, press);
        terminal <= true(on);
        goal(player, 100) <= true(on);
        goal(player, 0) <= true(off);
    );

    compile(symbols, rules).unwrap()
}

#[test]
fn test_button_game_truth_table() {
    let mut symbols = SymbolTable::new();
    let circuit = button_game(&mut symbols);

    let player = symbols.intern("player");
    let press = circuit
        .proposition(&fact(gdl!(symbols => legal(player, press))))
        .unwrap();
    let wait = circuit
        .proposition(&fact(gdl!(symbols => legal(player, wait))))
        .unwrap();
    let on = circuit.proposition(&fact(gdl!(symbols => true(on)))).unwrap();
    let off = circuit.proposition(&fact(gdl!(symbols => true(off)))).unwrap();

    let simulator = Simulator::new(&circuit).unwrap();
    let initial = simulator.initial_state();

    assert!(initial.contains(off));
    assert!(!initial.contains(on));
    assert!(!simulator.is_terminal(&initial));
    assert_eq!(simulator.goal(&initial, player), Some(0));
    assert_eq!(simulator.legal_moves(&initial, player), [press, wait]);

    // (move, on, off, terminal, goal)
    let table = [(press, true, false, true, Some(100)), (wait, false, false, false, None)];

    for (chosen, lit, unlit, terminal, goal) in table {
        let state = simulator.next_state(&initial, &[chosen]).unwrap();

        assert_eq!(state.contains(on), lit);
        assert_eq!(state.contains(off), unlit);
        assert_eq!(simulator.is_terminal(&state), terminal);
        assert_eq!(simulator.goal(&state, player), goal);
        assert_eq!(simulator.legal_moves(&state, player), [press, wait]);
    }
}

#[test]
fn test_moves_are_checked() {
    let mut symbols = SymbolTable::new();
    let circuit = button_game(&mut symbols);

    let player = symbols.intern("player");
    let terminal = circuit.terminal_proposition().unwrap();

    let simulator = Simulator::new(&circuit).unwrap();
    let initial = simulator.initial_state();

    assert_eq!(
        simulator.next_state(&initial, &[]),
        Err(CircuitError::MissingMove(player))
    );
    assert_eq!(
        simulator.next_state(&initial, &[terminal]),
        Err(CircuitError::IllegalMove(terminal))
    );
}

#[test]
fn test_one_move_per_role() {
    let mut symbols = SymbolTable::new();
    let circuit = button_game(&mut symbols);

    let player = symbols.intern("player");
    let press = circuit
        .proposition(&fact(gdl!(symbols => legal(player, press))))
        .unwrap();
    let wait = circuit
        .proposition(&fact(gdl!(symbols => legal(player, wait))))
        .unwrap();

    let simulator = Simulator::new(&circuit).unwrap();
    let initial = simulator.initial_state();

    assert_eq!(
        simulator.next_state(&initial, &[press, wait]),
        Err(CircuitError::DuplicateMove(player))
    );
    assert_eq!(
        simulator.next_state(&initial, &[press, press]),
        Err(CircuitError::DuplicateMove(player))
    );
    assert!(simulator.next_state(&initial, &[wait]).is_ok());
}

#[test]
fn test_disjunct_equalities_compile() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        role(nobody);
        q(a);
        q(b);
        s(a);
        p('x) <= or(distinct('x, a), s('x)), q('x);
        terminal <= p(a), p(b);
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    assert!(circuit.proposition(&fact(gdl!(symbols => p(a)))).is_some());
    assert!(circuit.proposition(&fact(gdl!(symbols => p(b)))).is_some());

    let simulator = Simulator::new(&circuit).unwrap();

    assert!(simulator.is_terminal(&simulator.initial_state()));
}

#[test]
fn test_classification() {
    let mut symbols = SymbolTable::new();
    let circuit = button_game(&mut symbols);

    let player = symbols.intern("player");

    assert_eq!(circuit.roles(), [player]);
    assert_eq!(circuit.base_propositions().len(), 2);
    assert_eq!(circuit.input_propositions().len(), 2);
    assert_eq!(circuit.legal_propositions(player).count(), 2);
    assert_eq!(circuit.goal_propositions(player).count(), 2);
    assert!(circuit.init_proposition().is_some());
    assert!(circuit.terminal_proposition().is_some());

    let winning = circuit
        .proposition(&fact(gdl!(symbols => goal(player, 100))))
        .unwrap();

    assert_eq!(circuit.goal_value(winning), Some(100));

    for base in circuit.base_propositions() {
        let component = circuit.component(*base).unwrap();
        let transition = component.single_input().unwrap();

        assert_eq!(
            circuit.component(transition).unwrap().kind(),
            &ComponentKind::Transition
        );
    }
}

#[test]
fn test_concluded_twice_is_fed_by_an_or() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q;
        r;
        p <= q;
        p <= r;
        terminal <= p;
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    let p = fact(gdl!(symbols => p));
    let proposition = circuit.component(circuit.proposition(&p).unwrap()).unwrap();

    assert_eq!(proposition.inputs().len(), 1);

    let or = circuit.component(proposition.single_input().unwrap()).unwrap();

    assert_eq!(or.kind(), &ComponentKind::Or);
    assert!(or.inputs().len() >= 2);

    for disjunct in or.inputs() {
        let disjunct = circuit.component(*disjunct).unwrap();

        assert_eq!(disjunct.underlying(), Some(&p));
        assert_eq!(disjunct.inputs().len(), 1);
    }

    for (_, component) in circuit.components() {
        if component.is_proposition() {
            assert!(component.inputs().len() <= 1);
        }
    }
}

#[test]
fn test_every_legal_move_has_an_input() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        role(runner);
        legal(runner, jump);
        legal(runner, run);
        next(moved) <= does(runner, run);
        terminal <= true(moved);
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    let runner = symbols.intern("runner");
    let jump = circuit
        .proposition(&fact(gdl!(symbols => legal(runner, jump))))
        .unwrap();
    let jumping = circuit
        .proposition(&fact(gdl!(symbols => does(runner, jump))))
        .unwrap();

    assert_eq!(circuit.legal_input(jump), Some(jumping));
    assert_eq!(circuit.input_legal(jumping), Some(jump));

    for legal in circuit.legal_propositions(runner) {
        let input = circuit.legal_input(legal).unwrap();

        assert!(circuit.input_propositions().contains(&input));
        assert_eq!(circuit.input_legal(input), Some(legal));
    }

    assert_eq!(circuit.legal_input_map().len(), 2);
}

#[test]
fn test_init_joins_existing_transitions() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        role(keeper);
        legal(keeper, keep);
        init(lamp);
        next(lamp) <= true(lamp), does(keeper, keep);
        terminal <= not(true(lamp));
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    let keeper = symbols.intern("keeper");
    let lamp = circuit.proposition(&fact(gdl!(symbols => true(lamp)))).unwrap();
    let next = circuit.proposition(&fact(gdl!(symbols => next(lamp)))).unwrap();

    assert!(circuit.base_propositions().contains(&lamp));

    // The rule and the init proposition both drive `next(lamp)`
    let or = circuit.component(next).unwrap().single_input().unwrap();

    assert_eq!(circuit.component(or).unwrap().kind(), &ComponentKind::Or);
    assert_eq!(circuit.component(or).unwrap().inputs().len(), 2);

    let simulator = Simulator::new(&circuit).unwrap();
    let initial = simulator.initial_state();

    assert!(initial.contains(lamp));

    let keep = simulator.legal_moves(&initial, keeper);
    let state = simulator.next_state(&initial, &keep).unwrap();

    assert_eq!(state, initial);
    assert!(!simulator.is_terminal(&state));
}

#[test]
fn test_distinct_becomes_a_constant() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        q(a);
        q(b);
        p('x, 'y) <= q('x), q('y), distinct('x, 'y);
        terminal <= p(a, b);
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    let p = circuit.proposition(&fact(gdl!(symbols => p(a, b)))).unwrap();
    let and = circuit.component(p).unwrap().single_input().unwrap();

    let anonymous = Fact::proposition(symbols.keywords().anonymous);

    let constants = circuit
        .component(and)
        .unwrap()
        .inputs()
        .iter()
        .filter_map(|input| circuit.component(*input))
        .filter(|input| input.name() == Some(&anonymous))
        .filter_map(|input| circuit.component(input.single_input()?))
        .map(|source| source.kind().clone())
        .collect::<Vec<_>>();

    assert_eq!(constants, [ComponentKind::Constant(true)]);
    assert!(circuit.proposition(&fact(gdl!(symbols => p(a, a)))).is_none());

    let simulator = Simulator::new(&circuit).unwrap();

    assert!(simulator.is_terminal(&simulator.initial_state()));
}

#[test]
fn test_protected_propositions_cannot_be_removed() {
    let mut symbols = SymbolTable::new();
    let mut circuit = button_game(&mut symbols);

    let init = circuit.init_proposition().unwrap();
    let terminal = circuit.terminal_proposition().unwrap();

    assert_eq!(
        circuit.remove_component(init).unwrap_err(),
        CircuitError::ProtectedComponent(init)
    );
    assert_eq!(
        circuit.remove_component(terminal).unwrap_err(),
        CircuitError::ProtectedComponent(terminal)
    );
    assert!(circuit.component(init).is_some());
    assert!(circuit.component(terminal).is_some());
}

fn assert_unreferenced(circuit: &Circuit, removed: ComponentId) {
    assert!(circuit.component(removed).is_none());
    assert!(!circuit.base_propositions().contains(&removed));
    assert!(!circuit.input_propositions().contains(&removed));

    for role in circuit.roles() {
        assert!(circuit.legal_propositions(*role).all(|legal| legal != removed));
        assert!(circuit.goal_propositions(*role).all(|goal| goal != removed));
    }

    for (legal, input) in circuit.legal_input_map() {
        assert_ne!(*legal, removed);
        assert_ne!(*input, removed);
    }

    for (_, component) in circuit.components() {
        assert!(!component.inputs().contains(&removed));
        assert!(!component.outputs().contains(&removed));
    }
}

#[test]
fn test_removing_a_base_proposition_leaves_nothing_behind() {
    let mut symbols = SymbolTable::new();
    let mut circuit = button_game(&mut symbols);

    let on = fact(gdl!(symbols => true(on)));
    let base = circuit.proposition(&on).unwrap();
    let components = circuit.len();

    let removed = circuit.remove_component(base).unwrap();

    assert_eq!(removed.name(), Some(&on));
    assert_eq!(circuit.len(), components - 1);
    assert_eq!(circuit.proposition(&on), None);
    assert_unreferenced(&circuit, base);

    assert_eq!(
        circuit.remove_component(base).unwrap_err(),
        CircuitError::UnknownComponent(base)
    );
}

#[test]
fn test_removing_an_input_cleans_the_legal_map() {
    let mut symbols = SymbolTable::new();
    let mut circuit = button_game(&mut symbols);

    let press = circuit
        .proposition(&fact(gdl!(symbols => does(player, press))))
        .unwrap();

    circuit.remove_component(press).unwrap();

    assert_unreferenced(&circuit, press);
    assert_eq!(circuit.legal_input_map().len(), 1);
}

#[test]
fn test_removing_a_transition_demotes_its_proposition() {
    let mut symbols = SymbolTable::new();
    let mut circuit = button_game(&mut symbols);

    let off = circuit.proposition(&fact(gdl!(symbols => true(off)))).unwrap();
    let transition = circuit.component(off).unwrap().single_input().unwrap();

    circuit.remove_component(transition).unwrap();

    assert!(!circuit.base_propositions().contains(&off));
    assert_eq!(circuit.base_propositions().len(), 1);
    assert_unreferenced(&circuit, transition);
}

#[test]
fn test_malformed_heads_are_fatal() {
    let mut symbols = SymbolTable::new();
    let true_ = symbols.keywords().true_;

    let rules = gdl!(symbols =>
        q;
        true(on) <= q;
    );

    assert_eq!(
        compile(&mut symbols, rules).unwrap_err(),
        CompileError::MalformedHead { relation: true_ }
    );
}

#[test]
fn test_recursion_without_transition_is_a_cycle() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        r;
        p <= r;
        p <= q;
        q <= p;
        terminal <= q;
    );

    let circuit = compile(&mut symbols, rules).unwrap();

    assert!(matches!(
        Simulator::new(&circuit),
        Err(CircuitError::CombinationalCycle(_))
    ));
}

#[test]
fn test_missing_terminal_is_tolerated() {
    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols => role(nobody));

    let circuit = compile(&mut symbols, rules).unwrap();

    assert!(circuit.terminal_proposition().is_none());
    assert!(circuit.init_proposition().is_some());
}

#[test]
fn test_dot_export() {
    let mut symbols = SymbolTable::new();
    let circuit = button_game(&mut symbols);

    let dot = circuit.to_dot(&symbols).to_string();

    assert!(dot.starts_with("digraph propnet {"));
    assert!(dot.contains("TRANSITION"));
    assert!(dot.contains("label=\"true(on)\""));
    assert!(dot.trim_end().ends_with('}'));
}

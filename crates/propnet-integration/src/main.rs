// SPDX-FileCopyrightText: 2024 Yoav Grimland <miestrode@proton.me>
// SPDX-License-Identifier: Apache-2.0
//
// Copyright 2024 Yoav Grimland miestrode@proton.me
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{env, error::Error};

use propnet::{
    circuit::Simulator,
    compile::{Compiler, GameDescription},
    symbol::SymbolTable,
    term::gdl,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut symbols = SymbolTable::new();

    let rules = gdl!(symbols =>
        role(robot);
        succ(1, 2);
        succ(2, 3);
        succ(3, 4);
        init(step(1));

        legal(robot, press);
        legal(robot, wait);

        next(step('y)) <= true(step('x)), succ('x, 'y);
        next(lit) <= does(robot, press);
        next(lit) <= true(lit), does(robot, wait);

        terminal <= true(step(4));
        goal(robot, 100) <= true(lit);
        goal(robot, 0) <= not(true(lit));
    );

    let description = GameDescription::new(rules, &symbols);
    let robot = description
        .roles
        .first()
        .copied()
        .ok_or("the description has no role")?;

    let circuit = Compiler::new(&mut symbols).compile(description)?;

    info!(
        components = circuit.len(),
        base = circuit.base_propositions().len(),
        inputs = circuit.input_propositions().len(),
        legals = circuit.legal_propositions(robot).count(),
        "compiled"
    );

    if env::args().any(|argument| argument == "--dot") {
        println!("{}", circuit.to_dot(&symbols));
    }

    let simulator = Simulator::new(&circuit)?;
    let mut state = simulator.initial_state();

    while !simulator.is_terminal(&state) {
        let moves = simulator.legal_moves(&state, robot);

        let Some(&chosen) = moves.first() else {
            break;
        };

        if let Some(name) = circuit.component(chosen).and_then(|component| component.name()) {
            println!("robot plays {}", name.display(&symbols));
        }

        state = simulator.next_state(&state, &[chosen])?;
    }

    println!("robot scores {:?}", simulator.goal(&state, robot));

    Ok(())
}

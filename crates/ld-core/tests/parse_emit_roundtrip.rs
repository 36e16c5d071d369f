//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that no element, position or association is lost when
//! converting text → Diagram → text.

use ld_core::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

const HALF_ADDER: &str = include_str!("fixtures/half_adder.txt");
const SOLUTION: &str = include_str!("fixtures/solution.txt");
const TAGS: &str = include_str!("fixtures/tags.txt");

// ─── Helpers ─────────────────────────────────────────────────────────────

fn parse(text: &str) -> Diagram {
    let parsed = parse_diagram(text, &ParseOptions::default())
        .expect("parse failed")
        .expect("empty input");
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        parsed.diagnostics
    );
    parsed.diagram
}

/// Every association as `(owner, wire, endpoint)` names.
fn topology(d: &Diagram) -> BTreeSet<(String, String, &'static str)> {
    d.elements()
        .filter_map(|(idx, e)| d.connection(idx).map(|c| (e.uid, c)))
        .flat_map(|(owner, c)| {
            c.wires
                .into_iter()
                .map(move |l| (owner.to_string(), l.wire, l.endpoint.as_str()))
        })
        .map(|(owner, wire, endpoint)| (owner, d.graph[wire].uid.to_string(), endpoint))
        .collect()
}

/// Parse, emit, re-parse, and compare elements and topology.
fn assert_roundtrip_preserves(input: &str) {
    let first = parse(input);
    let emitted = emit_diagram(&first);
    let second = parse(&emitted);

    assert_eq!(
        first.len(),
        second.len(),
        "element count mismatch after round-trip.\nOriginal:\n{input}\nEmitted:\n{emitted}"
    );
    for (_, element) in first.elements() {
        let twin = second
            .get_by_uid(element.uid)
            .unwrap_or_else(|| panic!("{} lost after round-trip", element.uid));
        assert_eq!(element, twin);
    }
    assert_eq!(topology(&first), topology(&second));
    assert_eq!(first.properties, second.properties);
    assert_eq!(first.counter, second.counter);
}

// ─── Round-trips ─────────────────────────────────────────────────────────

#[test]
fn roundtrip_half_adder() {
    assert_roundtrip_preserves(HALF_ADDER);
}

#[test]
fn half_adder_is_already_canonical() {
    assert_eq!(emit_diagram(&parse(HALF_ADDER)), HALF_ADDER);
}

#[test]
fn roundtrip_fractional_coordinates() {
    assert_roundtrip_preserves("+;Pin|0;12.25;7.5\n-;Wire|1;Start\n+;Wire|1;12.25;7.5;40.75;7.5;true;false\n");
}

#[test]
fn roundtrip_keeps_fine_coordinates() {
    let text = "+;Pin|0;10.125;7.005\n";
    assert_eq!(emit_diagram(&parse(text)), text);
    assert_roundtrip_preserves(
        "+;Pin|0;10.125;7.005\n-;Wire|1;Start\n+;Wire|1;10.125;7.005;40.0625;7.005\n",
    );
}

#[test]
fn roundtrip_loop_wire() {
    assert_roundtrip_preserves(
        "+;AndGate|0;60;60\n-;Wire|1;Start\n-;Wire|1;End\n+;Wire|1;90;75;60;75\n",
    );
}

#[test]
fn scenario_reproduces_association_content() {
    let scenario = "+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n\
                    +;Input|0;30;30;-1\n\
                    +;AndGate|1;90;30\n\
                    +;Wire|2;30;45;90;45;false;false;false;false\n\
                    -;Input|0;Wire|2;Start\n\
                    -;AndGate|1;Wire|2;End\n";
    let d = parse(scenario);
    let wire = d.find("Wire|2".parse().unwrap()).unwrap();
    let ends = d.wire_ends(wire).unwrap();
    assert_eq!(ends.start, d.find("Input|0".parse().unwrap()));
    assert_eq!(ends.end, d.find("AndGate|1".parse().unwrap()));

    let emitted = emit_diagram(&d);
    let mut original: Vec<&str> = scenario.lines().filter(|l| l.starts_with('+')).collect();
    let mut written: Vec<&str> = emitted.lines().filter(|l| l.starts_with('+')).collect();
    original.sort_unstable();
    written.sort_unstable();
    assert_eq!(original, written);
    assert_eq!(topology(&d), topology(&parse(&emitted)));
}

// ─── Graph behaviour on a real drawing ───────────────────────────────────

#[test]
fn half_adder_topology() {
    let d = parse(HALF_ADDER);
    assert_eq!(d.len(), 13);
    assert_eq!(d.counter.peek(), 13);

    let pin = d.find(Uid::new(UidKind::Pin, 2)).unwrap();
    let connection = d.connection(pin).unwrap();
    let names: Vec<String> = connection
        .wires
        .iter()
        .map(|l| format!("{}:{}", d.graph[l.wire].uid, l.endpoint.as_str()))
        .collect();
    assert_eq!(names, ["Wire|5:End", "Wire|7:Start", "Wire|8:Start"]);

    let inverted = d.get_by_uid(Uid::new(UidKind::Wire, 8)).unwrap();
    assert!(inverted.as_wire().unwrap().end_visible);
}

#[test]
fn select_connected_reaches_whole_net() {
    let mut d = parse(HALF_ADDER);
    let input = d.find(Uid::new(UidKind::Input, 0)).unwrap();
    d.select_connected(input);
    assert_eq!(d.selected().len(), 13);
}

#[test]
fn copy_and_paste_elsewhere() {
    let mut d = parse(HALF_ADDER);
    let gate = d.find(Uid::new(UidKind::AndGate, 3)).unwrap();
    let pin = d.find(Uid::new(UidKind::Pin, 2)).unwrap();
    d.get_mut(gate).unwrap().selected = true;
    d.get_mut(pin).unwrap().selected = true;

    let clip = emit_selection(&d);
    let fragment = parse(&clip);
    assert_eq!(fragment.len(), 3, "pin, gate and the wire between them");

    let added = insert(&mut d, fragment, (400.0, 300.0), true);
    assert_eq!(added.len(), 3);
    assert_eq!(d.len(), 16);
    let numbers: Vec<u32> = added.iter().map(|&i| d.get(i).unwrap().uid.number).collect();
    assert_eq!(numbers, [13, 14, 15]);
    assert_eq!(d.counter.peek(), 16);

    let wire = added[2];
    let ends = d.wire_ends(wire).unwrap();
    assert_eq!(ends.start, Some(added[0]));
    assert_eq!(ends.end, Some(added[1]));
    assert_roundtrip_preserves(&emit_diagram(&d));
}

#[test]
fn lint_half_adder_against_tags() {
    let d = parse(HALF_ADDER);
    let tags = TagTable::parse(TAGS);
    assert!(lint_diagram(&d, Some(&tags)).is_empty());

    let mut partial = tags.clone();
    partial.tags.retain(|t| t.id != 2);
    let diags = lint_diagram(&d, Some(&partial));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].uid, Uid::new(UidKind::Output, 11));
}

// ─── Solutions ───────────────────────────────────────────────────────────

#[test]
fn solution_roundtrip_with_history() {
    let parsed = parse_solution(SOLUTION).unwrap().unwrap();
    assert!(parsed.diagnostics.is_empty());
    let tree = &parsed.tree;
    assert_eq!(tree.diagrams().len(), 3);
    assert_eq!(tree.counter.peek(), 6);

    let options = EmitOptions {
        include_history: true,
    };
    assert_eq!(emit_solution(tree, &options), SOLUTION);

    let without = emit_solution(tree, &EmitOptions::default());
    assert_eq!(without.matches("Diagram|2;").count(), 1);
}

#[test]
fn solution_diagram_models_parse() {
    let parsed = parse_solution(SOLUTION).unwrap().unwrap();
    let tree = &parsed.tree;
    for idx in tree.diagrams() {
        let TreeItemKind::Diagram { model, .. } = &tree.get(idx).unwrap().kind else {
            panic!("diagrams() returned a non-diagram");
        };
        let d = parse(model);
        assert_eq!(d.uid, Some(tree.get(idx).unwrap().uid));
    }
}

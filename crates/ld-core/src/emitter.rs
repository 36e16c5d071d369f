//! Emitter: `Diagram` / `SolutionTree` → line-oriented text.
//!
//! Output round-trips through the parser. Each terminal element is written
//! as its root line followed by one short child line per wire association,
//! so the owner is always implied by position.

use crate::model::*;
use crate::parser::{CHILD_MARKER, ROOT_MARKER, SEPARATOR, tokenize};
use crate::tree::{SolutionTree, TreeItemKind};
use crate::id::{Uid, UidKind};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use std::fmt::Write;

/// Options for [`emit_solution`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Write each diagram's undo stack as extra Diagram blocks.
    pub include_history: bool,
}

// ─── Diagram ─────────────────────────────────────────────────────────────

/// Emit a whole diagram, with its header when it has one.
#[must_use]
pub fn emit_diagram(diagram: &Diagram) -> String {
    let mut out = String::with_capacity(64 * (diagram.len() + 1));
    if let Some(uid) = diagram.uid {
        emit_header(&mut out, uid, &diagram.properties);
    }
    let all: Vec<NodeIndex> = diagram.indices();
    emit_into(&mut out, diagram, &all);
    out
}

/// Emit only `elements`, without a header. Associations to wires outside
/// the set are left out.
#[must_use]
pub fn emit_elements(diagram: &Diagram, elements: &[NodeIndex]) -> String {
    let mut out = String::new();
    emit_into(&mut out, diagram, elements);
    out
}

/// Clipboard text for the current selection: every selected element plus
/// every wire whose two owners are both selected.
#[must_use]
pub fn emit_selection(diagram: &Diagram) -> String {
    let mut chosen: HashSet<NodeIndex> = diagram.selected().into_iter().collect();
    for (idx, element) in diagram.elements() {
        if !element.is_wire() || chosen.contains(&idx) {
            continue;
        }
        let enclosed = diagram.wire_ends(idx).is_some_and(|ends| {
            [ends.start, ends.end]
                .into_iter()
                .all(|owner| owner.is_some_and(|o| chosen.contains(&o)))
        });
        if enclosed {
            chosen.insert(idx);
        }
    }
    let ordered: Vec<NodeIndex> = diagram
        .indices()
        .into_iter()
        .filter(|idx| chosen.contains(idx))
        .collect();
    emit_elements(diagram, &ordered)
}

fn emit_header(out: &mut String, uid: Uid, properties: &DiagramProperties) {
    write!(out, "{ROOT_MARKER}{SEPARATOR}{uid}").ok();
    for value in properties.to_fields() {
        write!(out, "{SEPARATOR}{}", format_num(value)).ok();
    }
    out.push('\n');
}

fn emit_into(out: &mut String, diagram: &Diagram, elements: &[NodeIndex]) {
    let included: HashSet<NodeIndex> = elements.iter().copied().collect();
    for &idx in elements {
        let Some(element) = diagram.get(idx) else {
            continue;
        };
        emit_element(out, element);
        let Some(connection) = diagram.connection(idx) else {
            continue;
        };
        for link in connection.wires.iter().filter(|l| included.contains(&l.wire)) {
            let wire = &diagram.graph[link.wire];
            writeln!(
                out,
                "{CHILD_MARKER}{SEPARATOR}{}{SEPARATOR}{}",
                wire.uid,
                link.endpoint.as_str()
            )
            .ok();
        }
    }
}

fn emit_element(out: &mut String, element: &Element) {
    write!(
        out,
        "{ROOT_MARKER}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        element.uid,
        format_num(element.x),
        format_num(element.y)
    )
    .ok();
    match &element.kind {
        ElementKind::Input { tag_id } | ElementKind::Output { tag_id } => {
            let tag = tag_id.map_or_else(|| "-1".to_string(), |t| t.to_string());
            write!(out, "{SEPARATOR}{tag}").ok();
        }
        ElementKind::Wire(wire) => {
            write!(
                out,
                "{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
                format_num(element.x + wire.x2),
                format_num(element.y + wire.y2),
                wire.start_visible,
                wire.end_visible,
                wire.start_io,
                wire.end_io
            )
            .ok();
        }
        ElementKind::Pin | ElementKind::AndGate | ElementKind::OrGate => {}
    }
    out.push('\n');
}

// ─── Solution ────────────────────────────────────────────────────────────

/// Emit a solution tree: Solution header, then each Project followed by
/// its Diagram blocks.
#[must_use]
pub fn emit_solution(tree: &SolutionTree, options: &EmitOptions) -> String {
    let mut out = String::new();
    let Some(root) = tree.root() else {
        return out;
    };
    let Some(solution) = tree.get(root) else {
        return out;
    };

    write!(out, "{ROOT_MARKER}{SEPARATOR}{}", solution.uid).ok();
    if let TreeItemKind::Solution {
        tag_file,
        table_file,
    } = &solution.kind
        && let Some(tag_file) = tag_file
    {
        write!(out, "{SEPARATOR}{tag_file}").ok();
        if let Some(table_file) = table_file {
            write!(out, "{SEPARATOR}{table_file}").ok();
        }
    }
    out.push('\n');

    for project in tree.children(root) {
        let Some(item) = tree.get(project) else {
            continue;
        };
        writeln!(out, "{ROOT_MARKER}{SEPARATOR}{}", item.uid).ok();
        for diagram in tree.children(project) {
            let Some(item) = tree.get(diagram) else {
                continue;
            };
            let TreeItemKind::Diagram { model, history } = &item.kind else {
                continue;
            };
            emit_block(&mut out, item.uid, model);
            if options.include_history
                && let Some(history) = history
            {
                for entry in history.undo_entries() {
                    emit_block(&mut out, item.uid, entry);
                }
            }
        }
    }
    out
}

/// Write stored diagram text under a header naming `uid`. Text without a
/// Diagram header gets the default geometry.
fn emit_block(out: &mut String, uid: Uid, text: &str) {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

    let header_fields = lines.peek().and_then(|line| {
        let fields = tokenize(line);
        let is_header = fields.len() >= 2
            && fields[0] == ROOT_MARKER
            && Uid::parse(fields[1]).is_ok_and(|u| u.kind == UidKind::Diagram);
        is_header.then(|| fields[2..].join(";"))
    });

    match header_fields {
        Some(rest) => {
            lines.next();
            writeln!(out, "{ROOT_MARKER}{SEPARATOR}{uid}{SEPARATOR}{rest}").ok();
        }
        None => emit_header(out, uid, &DiagramProperties::default()),
    }
    for line in lines {
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

// ─── Numbers ─────────────────────────────────────────────────────────────

/// Integers without a fraction, anything else in the shortest form that
/// parses back to the same value.
pub fn format_num(n: f64) -> String {
    if n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::parser::{ParseOptions, parse_diagram, parse_solution};
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = "+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n\
                            +;Input|0;30;30;-1\n\
                            +;AndGate|1;90;30\n\
                            +;Wire|2;30;45;90;45;false;false;false;false\n\
                            -;Input|0;Wire|2;Start\n\
                            -;AndGate|1;Wire|2;End\n";

    fn parse(text: &str) -> Diagram {
        parse_diagram(text, &ParseOptions::default())
            .unwrap()
            .unwrap()
            .diagram
    }

    #[test]
    fn scenario_in_canonical_form() {
        let out = emit_diagram(&parse(SCENARIO));
        assert_eq!(
            out,
            "+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n\
             +;Input|0;30;30;-1\n\
             -;Wire|2;Start\n\
             +;AndGate|1;90;30\n\
             -;Wire|2;End\n\
             +;Wire|2;30;45;90;45;false;false;false;false\n"
        );
    }

    #[test]
    fn canonical_form_is_stable() {
        let first = emit_diagram(&parse(SCENARIO));
        let second = emit_diagram(&parse(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn fragment_has_no_header() {
        let out = emit_diagram(&parse("+;Output|3;10.5;20;7\n"));
        assert_eq!(out, "+;Output|3;10.5;20;7\n");
    }

    #[test]
    fn selection_takes_enclosed_wires_only() {
        let mut d = parse(
            "+;Pin|0;0;0\n-;Wire|3;Start\n-;Wire|4;Start\n\
             +;AndGate|1;30;0\n-;Wire|3;End\n\
             +;OrGate|2;90;0\n-;Wire|4;End\n\
             +;Wire|3;0;0;30;0\n+;Wire|4;0;0;90;0\n",
        );
        for uid in [Uid::new(UidKind::Pin, 0), Uid::new(UidKind::AndGate, 1)] {
            let idx = d.find(uid).unwrap();
            d.get_mut(idx).unwrap().selected = true;
        }
        let out = emit_selection(&d);
        assert_eq!(
            out,
            "+;Pin|0;0;0\n-;Wire|3;Start\n+;AndGate|1;30;0\n-;Wire|3;End\n\
             +;Wire|3;0;0;30;0;false;false;false;false\n"
        );
    }

    #[test]
    fn format_num_trims() {
        assert_eq!(format_num(30.0), "30");
        assert_eq!(format_num(-15.0), "-15");
        assert_eq!(format_num(12.5), "12.5");
        assert_eq!(format_num(10.125), "10.125");
        assert_eq!(format_num(7.005), "7.005");
        let third = 1.0 / 3.0;
        assert_eq!(format_num(third).parse::<f64>().unwrap(), third);
    }

    #[test]
    fn solution_with_history_round_trips() {
        let mut tree = SolutionTree::new();
        let s = tree
            .add_item(
                None,
                TreeItemKind::Solution {
                    tag_file: Some("tags.txt".into()),
                    table_file: None,
                },
                None,
            )
            .unwrap();
        let p = tree.add_item(Some(s), TreeItemKind::Project, None).unwrap();
        let mut history = History::new();
        history.snapshot("+;Pin|0;0;0\n".into());
        let d = tree
            .add_item(
                Some(p),
                TreeItemKind::Diagram {
                    model: "+;Diagram|9;800;600;0;0;800;600;30;15;15;0;0\n+;Pin|0;30;30\n".into(),
                    history: Some(history),
                },
                None,
            )
            .unwrap();
        tree.add_item(Some(p), TreeItemKind::diagram(), None);

        let options = EmitOptions {
            include_history: true,
        };
        let text = emit_solution(&tree, &options);
        assert_eq!(
            text,
            "+;Solution|0;tags.txt\n\
             +;Project|1\n\
             +;Diagram|2;800;600;0;0;800;600;30;15;15;0;0\n\
             +;Pin|0;30;30\n\
             +;Diagram|2;600;400;0;0;600;400;30;15;15;0;0\n\
             +;Pin|0;0;0\n\
             +;Diagram|3;600;400;0;0;600;400;30;15;15;0;0\n"
        );

        let reparsed = parse_solution(&text).unwrap().unwrap().tree;
        let item = reparsed.get(reparsed.find(tree.get(d).unwrap().uid).unwrap()).unwrap();
        match &item.kind {
            TreeItemKind::Diagram { history, .. } => {
                assert_eq!(history.as_ref().unwrap().undo_len(), 1);
            }
            other => panic!("expected Diagram, got {other:?}"),
        }
        assert_eq!(emit_solution(&reparsed, &options), text);
    }
}

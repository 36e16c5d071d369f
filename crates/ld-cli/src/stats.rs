//! Element counts per diagram, for `ld-cli stats`.

use ld_core::{Diagram, ParseOptions, ParseResult, SolutionTree, TreeItemKind, parse_diagram};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DiagramStats {
    /// `Diagram|n`, or `None` for a headerless fragment.
    pub uid: Option<String>,
    pub elements: usize,
    /// Element count per kind prefix.
    pub kinds: BTreeMap<String, usize>,
    /// Wires with an element at both ends.
    pub connected_wires: usize,
    pub next_id: u32,
}

pub fn diagram_stats(diagram: &Diagram) -> DiagramStats {
    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    let mut connected_wires = 0;
    for (idx, element) in diagram.elements() {
        *kinds.entry(element.uid.kind.to_string()).or_default() += 1;
        if diagram.wire_ends(idx).is_some_and(|ends| ends.is_complete()) {
            connected_wires += 1;
        }
    }
    DiagramStats {
        uid: diagram.uid.map(|uid| uid.to_string()),
        elements: diagram.len(),
        kinds,
        connected_wires,
        next_id: diagram.counter.peek(),
    }
}

/// Stats for every diagram of a solution, in tree order.
pub fn solution_stats(tree: &SolutionTree) -> ParseResult<Vec<DiagramStats>> {
    let mut all = Vec::new();
    for idx in tree.diagrams() {
        let Some(item) = tree.get(idx) else {
            continue;
        };
        let TreeItemKind::Diagram { model, .. } = &item.kind else {
            continue;
        };
        let mut diagram = parse_diagram(model, &ParseOptions::default())?
            .map(|parsed| parsed.diagram)
            .unwrap_or_default();
        diagram.uid = Some(item.uid);
        all.push(diagram_stats(&diagram));
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let text = "+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n\
                    +;Input|0;30;30;-1\n-;Wire|2;Start\n\
                    +;AndGate|1;90;30\n-;Wire|2;End\n\
                    +;Wire|2;30;45;90;45\n\
                    +;Wire|3;0;0;5;5\n";
        let diagram = parse_diagram(text, &ParseOptions::default())
            .unwrap()
            .unwrap()
            .diagram;
        let stats = diagram_stats(&diagram);
        assert_eq!(stats.uid.as_deref(), Some("Diagram|0"));
        assert_eq!(stats.elements, 4);
        assert_eq!(stats.kinds.get("Wire"), Some(&2));
        assert_eq!(stats.connected_wires, 1);
        assert_eq!(stats.next_id, 4);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["kinds"]["AndGate"], 1);
    }
}

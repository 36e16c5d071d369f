//! Lint diagnostics for diagrams.
//!
//! Reports structural issues without modifying the diagram.

use crate::id::Uid;
use crate::model::{Diagram, ElementKind};
use crate::tags::TagTable;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Probably a drawing mistake.
    Warning,
    /// Worth a look.
    Info,
}

/// A single lint diagnostic for one element.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    pub uid: Uid,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "dangling-wire").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules. The tag rule only runs when a table is given.
#[must_use]
pub fn lint_diagram(diagram: &Diagram, tags: Option<&TagTable>) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_dangling_wires(diagram, &mut diags);
    lint_isolated_pins(diagram, &mut diags);
    if let Some(tags) = tags {
        lint_unknown_tags(diagram, tags, &mut diags);
    }
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Warn on wires with an end that terminates nowhere.
fn lint_dangling_wires(diagram: &Diagram, diags: &mut Vec<LintDiagnostic>) {
    for (idx, element) in diagram.elements() {
        let Some(ends) = diagram.wire_ends(idx) else {
            continue;
        };
        let missing = match (ends.start, ends.end) {
            (Some(_), Some(_)) => continue,
            (None, Some(_)) => "start",
            (Some(_), None) => "end",
            (None, None) => "start and end",
        };
        diags.push(LintDiagnostic {
            uid: element.uid,
            message: format!("Wire `{}` has no element at its {missing}.", element.uid),
            severity: LintSeverity::Warning,
            rule: "dangling-wire",
        });
    }
}

/// Info on pins with no wires.
fn lint_isolated_pins(diagram: &Diagram, diags: &mut Vec<LintDiagnostic>) {
    for (idx, element) in diagram.elements() {
        if !matches!(element.kind, ElementKind::Pin) {
            continue;
        }
        if diagram.connection(idx).is_some_and(|c| c.is_empty()) {
            diags.push(LintDiagnostic {
                uid: element.uid,
                message: format!("Pin `{}` is not connected to any wire.", element.uid),
                severity: LintSeverity::Info,
                rule: "isolated-pin",
            });
        }
    }
}

/// Warn on Input/Output elements naming a tag the table lacks.
fn lint_unknown_tags(diagram: &Diagram, tags: &TagTable, diags: &mut Vec<LintDiagnostic>) {
    for (_, element) in diagram.elements() {
        let Some(tag_id) = element.kind.tag_id() else {
            continue;
        };
        if tags.get(tag_id).is_none() {
            diags.push(LintDiagnostic {
                uid: element.uid,
                message: format!("`{}` refers to unknown tag {tag_id}.", element.uid),
                severity: LintSeverity::Warning,
                rule: "unknown-tag",
            });
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

//! Formatting pipeline: parse → transforms → canonical emit.
//!
//! Idempotent. Parse diagnostics are logged by the parser and otherwise
//! dropped; a malformed record fails the format.

use crate::emitter::{EmitOptions, emit_diagram, emit_solution};
use crate::error::ParseResult;
use crate::history::History;
use crate::parser::{ParseOptions, parse_diagram, parse_solution};
use crate::transform::renumber;
use crate::tree::TreeItemKind;

// ─── Config ───────────────────────────────────────────────────────────────

/// Configuration for [`format_diagram`] and [`format_solution`].
#[derive(Debug, Clone, Default)]
pub struct FormatConfig {
    /// Renumber element ids to a dense `0..n` in document order. Rewrites
    /// names, so it defaults to **false**.
    pub renumber: bool,
}

// ─── Pipeline ─────────────────────────────────────────────────────────────

/// Parse diagram text and re-emit it canonically. Empty input formats to
/// empty output.
pub fn format_diagram(text: &str, config: &FormatConfig) -> ParseResult<String> {
    let Some(parsed) = parse_diagram(text, &ParseOptions::default())? else {
        return Ok(String::new());
    };
    let mut diagram = parsed.diagram;
    if config.renumber {
        renumber(&mut diagram);
    }
    Ok(emit_diagram(&diagram))
}

/// Format a solution file: every diagram model and history entry goes
/// through [`format_diagram`]. History is kept.
pub fn format_solution(text: &str, config: &FormatConfig) -> ParseResult<String> {
    let Some(parsed) = parse_solution(text)? else {
        return Ok(String::new());
    };
    let mut tree = parsed.tree;
    for idx in tree.diagrams() {
        let Some(item) = tree.get_mut(idx) else {
            continue;
        };
        let TreeItemKind::Diagram { model, history } = &mut item.kind else {
            continue;
        };
        *model = format_diagram(model, config)?;
        if let Some(stored) = history.take() {
            let mut formatted = History::new();
            for entry in stored.undo_entries() {
                formatted.push_undo(format_diagram(entry, config)?);
            }
            *history = Some(formatted);
        }
    }
    let options = EmitOptions {
        include_history: true,
    };
    Ok(emit_solution(&tree, &options))
}

// ─── Tests ────────────────────────────────────────────────────────────────

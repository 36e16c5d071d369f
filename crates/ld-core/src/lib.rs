pub mod creator;
pub mod emitter;
pub mod error;
pub mod format;
pub mod history;
pub mod id;
pub mod lint;
pub mod model;
pub mod parser;
pub mod tags;
pub mod transform;
pub mod tree;

pub use creator::Creator;
pub use emitter::{EmitOptions, emit_diagram, emit_elements, emit_selection, emit_solution};
pub use error::{ParseError, ParseResult};
pub use format::{FormatConfig, format_diagram, format_solution};
pub use history::History;
pub use id::{IdCounter, Uid, UidKind};
pub use lint::{LintDiagnostic, LintSeverity, lint_diagram};
pub use model::*;
pub use parser::{
    Diagnostic, DiagnosticKind, ParseOptions, ParsedDiagram, ParsedSolution, parse_diagram,
    parse_diagram_with, parse_solution,
};
pub use tags::{Tag, TagTable};
pub use transform::{SnapConfig, insert, insert_with, move_element, move_selected, renumber, snap};
pub use tree::{SolutionTree, TreeItem, TreeItemKind};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;

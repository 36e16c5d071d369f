//! Logic Draft command line.
//!
//! ```text
//! ld-cli check <file>              parse and lint; exit 1 on a parse error
//! ld-cli fmt <file> [--renumber]   print canonical text
//! ld-cli stats <file>              element counts per diagram as JSON
//! ```
//!
//! `<file>` is either a solution file (first record is a Solution header)
//! or a single diagram. Set `RUST_LOG` for parser warnings.

mod stats;

use ld_core::parser::{ROOT_MARKER, tokenize};
use ld_core::{
    Diagnostic, FormatConfig, LintSeverity, ParseOptions, ParseResult, TreeItem, TreeItemKind, Uid,
    UidKind, format_diagram, format_solution, lint_diagram, parse_diagram, parse_solution,
};
use ld_editor::store::{load_tags, load_text};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "usage: ld-cli <check|fmt|stats> <file> [--renumber]";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (Some(command), Some(file)) = (args.first(), args.get(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let path = PathBuf::from(file);
    let text = match load_text(&path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match command.as_str() {
        "check" => check(&path, &text),
        "fmt" => fmt(&text, args.iter().any(|a| a == "--renumber")),
        "stats" => stats(&text),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}

/// True when the first record is a Solution header.
fn is_solution(text: &str) -> bool {
    text.lines()
        .map(tokenize)
        .find(|fields| !fields.is_empty())
        .is_some_and(|fields| {
            fields.len() >= 2
                && fields[0] == ROOT_MARKER
                && fields[1]
                    .parse::<Uid>()
                    .is_ok_and(|uid| uid.kind == UidKind::Solution)
        })
}

fn print_diagnostics(path: &Path, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        println!("{}:{}: warning: {}", path.display(), d.line, d.message);
    }
}

fn check(path: &Path, text: &str) -> ParseResult<ExitCode> {
    let mut diagrams = Vec::new();
    let mut tags = None;
    if is_solution(text) {
        let Some(parsed) = parse_solution(text)? else {
            return Ok(ExitCode::SUCCESS);
        };
        print_diagnostics(path, &parsed.diagnostics);
        let tree = parsed.tree;
        let tag_file = tree.root().and_then(|root| match &tree.get(root)?.kind {
            TreeItemKind::Solution { tag_file, .. } => tag_file.clone(),
            _ => None,
        });
        if let Some(tag_file) = tag_file {
            let tag_path = path.parent().unwrap_or(Path::new(".")).join(tag_file);
            match load_tags(&tag_path) {
                Ok(table) => tags = Some(table),
                Err(e) => println!("{}: warning: {e}", path.display()),
            }
        }
        for idx in tree.diagrams() {
            if let Some(TreeItem {
                kind: TreeItemKind::Diagram { model, .. },
                ..
            }) = tree.get(idx)
                && let Some(parsed) = parse_diagram(model, &ParseOptions::default())?
            {
                diagrams.push(parsed.diagram);
            }
        }
    } else if let Some(parsed) = parse_diagram(text, &ParseOptions::default())? {
        print_diagnostics(path, &parsed.diagnostics);
        diagrams.push(parsed.diagram);
    }

    let mut findings = 0;
    for diagram in &diagrams {
        for lint in lint_diagram(diagram, tags.as_ref()) {
            let level = match lint.severity {
                LintSeverity::Warning => "warning",
                LintSeverity::Info => "info",
            };
            let scope = diagram
                .uid
                .map(|uid| format!("{uid}/"))
                .unwrap_or_default();
            println!(
                "{}: {level}[{}]: {scope}{}: {}",
                path.display(),
                lint.rule,
                lint.uid,
                lint.message
            );
            findings += 1;
        }
    }
    log::info!("checked {} diagrams, {findings} lint findings", diagrams.len());
    Ok(ExitCode::SUCCESS)
}

fn fmt(text: &str, renumber: bool) -> ParseResult<ExitCode> {
    let config = FormatConfig { renumber };
    let out = if is_solution(text) {
        format_solution(text, &config)?
    } else {
        format_diagram(text, &config)?
    };
    print!("{out}");
    Ok(ExitCode::SUCCESS)
}

fn stats(text: &str) -> ParseResult<ExitCode> {
    let all = if is_solution(text) {
        match parse_solution(text)? {
            Some(parsed) => stats::solution_stats(&parsed.tree)?,
            None => Vec::new(),
        }
    } else {
        parse_diagram(text, &ParseOptions::default())?
            .map(|parsed| vec![stats::diagram_stats(&parsed.diagram)])
            .unwrap_or_default()
    };
    match serde_json::to_string_pretty(&all) {
        Ok(json) => {
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_solution_files() {
        assert!(is_solution("\n+;Solution|0;tags.txt\n+;Project|1\n"));
        assert!(!is_solution("+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n"));
        assert!(!is_solution("+;Pin|0;0;0\n"));
        assert!(!is_solution(""));
    }
}

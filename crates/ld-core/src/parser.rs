//! Parser for the line-oriented diagram format → `Diagram` / `SolutionTree`.
//!
//! Every line is a record of fields separated by `;`, tab or space, e.g.
//! `+;AndGate|1;90;30`. The first field marks the record class: `+` opens a
//! header or element, `-` attaches a wire end to an element. Records are
//! recognised by type prefix *and* field count, so trailing fields can be
//! added to a record without breaking older files.
//!
//! Parsing runs in two passes. The first creates elements and collects the
//! wire associations each element declares, by name. The second resolves
//! those names into graph edges.

use crate::creator::{Creator, replay};
use crate::error::{ParseError, ParseResult};
use crate::history::History;
use crate::id::{Uid, UidError, UidKind};
use crate::model::*;
use crate::tree::{SolutionTree, TreeItemKind};
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;
use std::collections::HashMap;
use winnow::ascii::float;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Field separator written by the emitter.
pub const SEPARATOR: char = ';';
/// Marker of header and element records.
pub const ROOT_MARKER: &str = "+";
/// Marker of wire association records.
pub const CHILD_MARKER: &str = "-";

/// The fields of one record.
pub type Fields<'a> = SmallVec<[&'a str; 12]>;

pub fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == '\t' || c == ' ' || c == '\r'
}

/// Split a line into fields, discarding empty ones.
pub fn tokenize(line: &str) -> Fields<'_> {
    let mut input = line;
    let mut fields = Fields::new();
    loop {
        let _ = take_while::<_, _, ContextError>(0.., is_separator).parse_next(&mut input);
        match take_while::<_, _, ContextError>(1.., |c: char| !is_separator(c)).parse_next(&mut input)
        {
            Ok(field) => fields.push(field),
            Err(_) => break,
        }
    }
    fields
}

fn parse_number(field: &str) -> Option<f64> {
    let mut input = field;
    let value: f64 = float::<_, f64, ContextError>.parse_next(&mut input).ok()?;
    input.is_empty().then_some(value)
}

// ─── Options & diagnostics ───────────────────────────────────────────────

/// Parse-time translation, used to paste at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParseOptions {
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ParseOptions {
    pub const fn offset(x: f64, y: f64) -> Self {
        Self {
            offset_x: x,
            offset_y: y,
        }
    }
}

/// Kinds of recoverable anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No rule matches the record's kind and field count.
    UnrecognizedRecord,
    /// An element name or association was declared twice; the later one is ignored.
    DuplicateName,
    /// An association names a wire that does not exist.
    UnresolvedWire,
    /// An association with no element to attach to.
    OrphanChild,
}

/// A recoverable anomaly. Reported, logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Result of a successful diagram parse.
#[derive(Debug, Clone)]
pub struct ParsedDiagram {
    pub diagram: Diagram,
    pub diagnostics: Vec<Diagnostic>,
}

// ─── Records ─────────────────────────────────────────────────────────────

struct Record<'a> {
    line: usize,
    fields: Fields<'a>,
}

impl<'a> Record<'a> {
    fn len(&self) -> usize {
        self.fields.len()
    }

    fn number(&self, i: usize) -> ParseResult<f64> {
        let value = self.fields[i];
        parse_number(value).ok_or_else(|| ParseError::InvalidNumber {
            line: self.line,
            field: i,
            value: value.to_string(),
        })
    }

    fn boolean(&self, i: usize) -> ParseResult<bool> {
        let value = self.fields[i];
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ParseError::InvalidBool {
                line: self.line,
                field: i,
                value: value.to_string(),
            })
        }
    }

    /// A tag reference; negative means "no tag". Fractional or out of
    /// range ids are malformed.
    fn tag_id(&self, i: usize) -> ParseResult<Option<u32>> {
        let v = self.number(i)?;
        if v < 0.0 {
            return Ok(None);
        }
        if v.fract() != 0.0 || v > f64::from(u32::MAX) {
            return Err(ParseError::InvalidNumber {
                line: self.line,
                field: i,
                value: self.fields[i].to_string(),
            });
        }
        Ok(Some(v as u32))
    }

    fn properties(&self) -> ParseResult<DiagramProperties> {
        let mut f = [0.0; DiagramProperties::FIELD_COUNT];
        for (i, slot) in f.iter_mut().enumerate() {
            *slot = self.number(i + 2)?;
        }
        Ok(DiagramProperties::from_fields(f))
    }

    fn text(&self) -> String {
        self.fields.join(";")
    }
}

/// Read a `Type|n` name. Unknown prefixes are not fatal: the record is
/// reported and skipped by the caller.
fn record_uid(rec: &Record<'_>, i: usize) -> ParseResult<Result<Uid, UidError>> {
    match Uid::parse(rec.fields[i]) {
        Ok(uid) => Ok(Ok(uid)),
        Err(e @ UidError::UnknownKind(_)) => Ok(Err(e)),
        Err(_) => Err(ParseError::InvalidUid {
            line: rec.line,
            value: rec.fields[i].to_string(),
        }),
    }
}

// ─── Diagram parser ──────────────────────────────────────────────────────

/// Associations one element declared, in declaration order.
struct Pending {
    owner: NodeIndex,
    links: Vec<(Uid, Endpoint, usize)>,
}

struct DiagramBuilder {
    options: ParseOptions,
    diagram: Diagram,
    diagnostics: Vec<Diagnostic>,
    pending: Vec<Pending>,
    by_name: HashMap<Uid, usize>,
    /// Element opened by the most recent root line, as an index into `pending`.
    current: Option<usize>,
}

impl DiagramBuilder {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            diagram: Diagram::new(),
            diagnostics: Vec::new(),
            pending: Vec::new(),
            by_name: HashMap::new(),
            current: None,
        }
    }

    fn report(&mut self, line: usize, kind: DiagnosticKind, message: String) {
        log::warn!("line {line}: {message}");
        self.diagnostics.push(Diagnostic {
            line,
            kind,
            message,
        });
    }

    fn unrecognized(&mut self, rec: &Record<'_>) {
        let message = format!("unrecognized record `{}`", rec.text());
        self.report(rec.line, DiagnosticKind::UnrecognizedRecord, message);
    }

    fn line(&mut self, line: usize, text: &str) -> ParseResult<()> {
        let rec = Record {
            line,
            fields: tokenize(text),
        };
        match rec.fields.first().copied() {
            None => Ok(()),
            Some(ROOT_MARKER) if rec.len() >= 2 => self.root(&rec),
            Some(CHILD_MARKER) => {
                self.child(&rec);
                Ok(())
            }
            Some(_) => {
                self.unrecognized(&rec);
                Ok(())
            }
        }
    }

    fn root(&mut self, rec: &Record<'_>) -> ParseResult<()> {
        self.current = None;
        let uid = match record_uid(rec, 1)? {
            Ok(uid) => uid,
            Err(_) => {
                self.unrecognized(rec);
                return Ok(());
            }
        };
        if uid.kind.is_header() {
            return self.header(rec, uid);
        }

        let Some(element) = self.element(rec, uid)? else {
            self.unrecognized(rec);
            return Ok(());
        };

        if self.diagram.find(uid).is_some() {
            let message = format!("duplicate element {uid}; later definition ignored");
            self.report(rec.line, DiagnosticKind::DuplicateName, message);
            return Ok(());
        }

        let is_wire = element.is_wire();
        let owner = self.diagram.add_element(element);
        if !is_wire {
            self.by_name.insert(uid, self.pending.len());
            self.current = Some(self.pending.len());
            self.pending.push(Pending {
                owner,
                links: Vec::new(),
            });
        }
        Ok(())
    }

    fn header(&mut self, rec: &Record<'_>, uid: Uid) -> ParseResult<()> {
        let first = uid.kind == UidKind::Diagram
            && rec.len() == 2 + DiagramProperties::FIELD_COUNT
            && self.diagram.uid.is_none()
            && self.diagram.is_empty();
        if !first {
            self.unrecognized(rec);
            return Ok(());
        }
        self.diagram.properties = rec.properties()?;
        self.diagram.uid = Some(uid);
        Ok(())
    }

    /// Build the element a root record describes, or `None` if its field
    /// count matches no schema.
    fn element(&self, rec: &Record<'_>, uid: Uid) -> ParseResult<Option<Element>> {
        let (dx, dy) = (self.options.offset_x, self.options.offset_y);
        let n = rec.len();
        let kind = match (uid.kind, n) {
            (UidKind::Pin, 4) => ElementKind::Pin,
            (UidKind::AndGate, 4) => ElementKind::AndGate,
            (UidKind::OrGate, 4) => ElementKind::OrGate,
            (UidKind::Input, 4 | 5) => ElementKind::Input {
                tag_id: if n == 5 { rec.tag_id(4)? } else { None },
            },
            (UidKind::Output, 4 | 5) => ElementKind::Output {
                tag_id: if n == 5 { rec.tag_id(4)? } else { None },
            },
            (UidKind::Wire, 6 | 8 | 10) => {
                let (x1, y1) = (rec.number(2)? + dx, rec.number(3)? + dy);
                let (x2, y2) = (rec.number(4)? + dx, rec.number(5)? + dy);
                let (start_visible, end_visible) = if n >= 8 {
                    (rec.boolean(6)?, rec.boolean(7)?)
                } else {
                    (false, false)
                };
                let (start_io, end_io) = if n == 10 {
                    (rec.boolean(8)?, rec.boolean(9)?)
                } else {
                    (false, false)
                };
                let wire = Wire {
                    x2: x2 - x1,
                    y2: y2 - y1,
                    start_visible,
                    end_visible,
                    start_io,
                    end_io,
                };
                return Ok(Some(Element::new(
                    uid.number,
                    x1,
                    y1,
                    ElementKind::Wire(wire),
                )));
            }
            _ => return Ok(None),
        };
        let (x, y) = (rec.number(2)? + dx, rec.number(3)? + dy);
        Ok(Some(Element::new(uid.number, x, y, kind)))
    }

    fn child(&mut self, rec: &Record<'_>) {
        // `-;wire;End` attaches to the last opened element,
        // `-;owner;wire;End` names its owner.
        let (owner, wire_field) = match rec.len() {
            3 => (self.current, 1),
            4 => {
                let owner = Uid::parse(rec.fields[1])
                    .ok()
                    .and_then(|uid| self.by_name.get(&uid).copied());
                (owner, 2)
            }
            _ => {
                self.unrecognized(rec);
                return;
            }
        };
        let Some(endpoint) = Endpoint::from_keyword(rec.fields[rec.len() - 1]) else {
            self.unrecognized(rec);
            return;
        };
        let Some(owner) = owner else {
            let message = format!("association `{}` has no element to attach to", rec.text());
            self.report(rec.line, DiagnosticKind::OrphanChild, message);
            return;
        };
        let Ok(wire) = Uid::parse(rec.fields[wire_field]) else {
            let message = format!("`{}` does not name a wire", rec.fields[wire_field]);
            self.report(rec.line, DiagnosticKind::UnresolvedWire, message);
            return;
        };

        let links = &self.pending[owner].links;
        if links.iter().any(|&(w, e, _)| w == wire && e == endpoint) {
            let message = format!("{wire} {} declared twice; later one ignored", endpoint.as_str());
            self.report(rec.line, DiagnosticKind::DuplicateName, message);
            return;
        }
        self.pending[owner].links.push((wire, endpoint, rec.line));
    }

    /// Second pass: turn named associations into edges.
    fn resolve(mut self) -> ParsedDiagram {
        let pending = std::mem::take(&mut self.pending);
        for Pending { owner, links } in pending {
            for (wire_uid, endpoint, line) in links {
                let wire = self
                    .diagram
                    .find(wire_uid)
                    .filter(|&w| self.diagram.graph[w].is_wire());
                match wire {
                    Some(wire) => {
                        self.diagram.connect(owner, wire, endpoint);
                    }
                    None => {
                        let message = format!("wire {wire_uid} not found");
                        self.report(line, DiagnosticKind::UnresolvedWire, message);
                    }
                }
            }
        }
        ParsedDiagram {
            diagram: self.diagram,
            diagnostics: self.diagnostics,
        }
    }
}

/// Parse diagram text (optionally headed by a Diagram record).
///
/// Returns `Ok(None)` for empty input. A malformed required field fails the
/// whole parse; anything recoverable is reported in `diagnostics`.
pub fn parse_diagram(text: &str, options: &ParseOptions) -> ParseResult<Option<ParsedDiagram>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut builder = DiagramBuilder::new(*options);
    for (n, line) in text.lines().enumerate() {
        builder.line(n + 1, line)?;
    }
    Ok(Some(builder.resolve()))
}

/// [`parse_diagram`], then announce the result to `creator`.
pub fn parse_diagram_with<C: Creator + ?Sized>(
    text: &str,
    options: &ParseOptions,
    creator: &mut C,
) -> ParseResult<Option<ParsedDiagram>> {
    let parsed = parse_diagram(text, options)?;
    if let Some(parsed) = &parsed {
        replay(&parsed.diagram, creator);
    }
    Ok(parsed)
}

// ─── Solution parser ─────────────────────────────────────────────────────

/// Result of a successful solution parse.
#[derive(Debug, Clone)]
pub struct ParsedSolution {
    pub tree: SolutionTree,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lines belonging to one Diagram item, or to one of its history entries.
struct Block<'a> {
    item: NodeIndex,
    history: bool,
    first_line: usize,
    lines: Vec<&'a str>,
}

struct SolutionBuilder<'a> {
    tree: SolutionTree,
    diagnostics: Vec<Diagnostic>,
    project: Option<NodeIndex>,
    last_diagram: Option<(Uid, NodeIndex)>,
    block: Option<Block<'a>>,
}

impl<'a> SolutionBuilder<'a> {
    fn report(&mut self, line: usize, kind: DiagnosticKind, message: String) {
        log::warn!("line {line}: {message}");
        self.diagnostics.push(Diagnostic {
            line,
            kind,
            message,
        });
    }

    fn line(&mut self, line: usize, text: &'a str) -> ParseResult<()> {
        let rec = Record {
            line,
            fields: tokenize(text),
        };
        if rec.fields.is_empty() {
            return Ok(());
        }
        let header = if rec.fields[0] == ROOT_MARKER && rec.len() >= 2 {
            match record_uid(&rec, 1)? {
                Ok(uid) if uid.kind.is_header() => Some(uid),
                _ => None,
            }
        } else {
            None
        };

        match header {
            Some(uid) => self.header(&rec, uid, text),
            None => {
                match &mut self.block {
                    Some(block) => block.lines.push(text),
                    None => {
                        let message = format!("record `{}` outside any diagram", rec.text());
                        self.report(line, DiagnosticKind::OrphanChild, message);
                    }
                }
                Ok(())
            }
        }
    }

    fn header(&mut self, rec: &Record<'_>, uid: Uid, text: &'a str) -> ParseResult<()> {
        match (uid.kind, rec.len()) {
            (UidKind::Solution, 2..=4) => {
                self.flush()?;
                if self.tree.root().is_some() {
                    self.unrecognized(rec, "second Solution header");
                    return Ok(());
                }
                let kind = TreeItemKind::Solution {
                    tag_file: rec.fields.get(2).map(|s| s.to_string()),
                    table_file: rec.fields.get(3).map(|s| s.to_string()),
                };
                self.tree.add_item(None, kind, Some(uid));
            }
            (UidKind::Project, 2) => {
                self.flush()?;
                self.project = self
                    .tree
                    .root()
                    .and_then(|root| self.tree.add_item(Some(root), TreeItemKind::Project, Some(uid)));
                if self.project.is_none() {
                    self.unrecognized(rec, "Project without a Solution");
                }
            }
            (UidKind::Diagram, n) if n == 2 + DiagramProperties::FIELD_COUNT => {
                self.flush()?;
                let repeated = self.last_diagram.filter(|(last, _)| *last == uid);
                let item = match repeated {
                    Some((_, item)) => Some((item, true)),
                    None => self
                        .project
                        .and_then(|p| self.tree.add_item(Some(p), TreeItemKind::diagram(), Some(uid)))
                        .map(|item| (item, false)),
                };
                match item {
                    Some((item, history)) => {
                        self.last_diagram = Some((uid, item));
                        self.block = Some(Block {
                            item,
                            history,
                            first_line: rec.line,
                            lines: vec![text],
                        });
                    }
                    None => self.unrecognized(rec, "Diagram without a Project"),
                }
            }
            _ => {
                self.flush()?;
                self.unrecognized(rec, "unrecognized header");
            }
        }
        Ok(())
    }

    fn unrecognized(&mut self, rec: &Record<'_>, why: &str) {
        let message = format!("{why}: `{}`", rec.text());
        self.report(rec.line, DiagnosticKind::UnrecognizedRecord, message);
    }

    /// Validate the open block and store it on its Diagram item.
    fn flush(&mut self) -> ParseResult<()> {
        let Some(block) = self.block.take() else {
            return Ok(());
        };
        let mut text = block.lines.join("\n");
        text.push('\n');

        let shift = block.first_line - 1;
        let parsed = parse_diagram(&text, &ParseOptions::default()).map_err(|e| e.offset_lines(shift))?;
        if let Some(parsed) = parsed {
            self.diagnostics
                .extend(parsed.diagnostics.into_iter().map(|mut d| {
                    d.line += shift;
                    d
                }));
        }

        if let Some(TreeItemKind::Diagram { model, history }) =
            self.tree.get_mut(block.item).map(|item| &mut item.kind)
        {
            if block.history {
                history.get_or_insert_with(History::new).push_undo(text);
            } else {
                *model = text;
            }
        }
        Ok(())
    }
}

/// Parse a whole solution file into its tree. Diagram items keep their
/// text; a Diagram block repeating the previous block's name is an undo
/// history entry of that diagram (oldest first).
///
/// Returns `Ok(None)` for empty input.
pub fn parse_solution(text: &str) -> ParseResult<Option<ParsedSolution>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut builder = SolutionBuilder {
        tree: SolutionTree::new(),
        diagnostics: Vec::new(),
        project: None,
        last_diagram: None,
        block: None,
    };
    for (n, line) in text.lines().enumerate() {
        builder.line(n + 1, line)?;
    }
    builder.flush()?;
    Ok(Some(ParsedSolution {
        tree: builder.tree,
        diagnostics: builder.diagnostics,
    }))
}

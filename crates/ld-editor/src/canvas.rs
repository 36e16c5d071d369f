//! An open diagram and its undo history.
//!
//! Every action that changes what would be saved takes a snapshot of the
//! current text *before* mutating, so one undo step reverses one action.
//! Undo and redo replace the whole diagram by re-parsing the stored text.
//! Selection changes are not recorded.

use ld_core::{
    Diagram, Element, ElementKind, History, NodeIndex, ParseOptions, ParseResult, SnapConfig,
    emit_diagram, emit_selection, insert, move_selected, parse_diagram,
};

/// Editor-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    /// Snap moves and drop points to the diagram's snap grid.
    pub snap_enabled: bool,
    /// Maximum undo depth per diagram; `None` is unbounded.
    pub history_depth: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            history_depth: None,
        }
    }
}

#[derive(Debug)]
pub struct Canvas {
    pub diagram: Diagram,
    history: Option<History>,
    config: EditorConfig,
}

impl Canvas {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_diagram(Diagram::new(), config)
    }

    pub fn with_diagram(diagram: Diagram, config: EditorConfig) -> Self {
        Self {
            diagram,
            history: None,
            config,
        }
    }

    /// Open diagram text. Empty text gives an empty canvas.
    pub fn from_text(text: &str, config: EditorConfig) -> ParseResult<Self> {
        let diagram = parse_diagram(text, &ParseOptions::default())?
            .map(|parsed| parsed.diagram)
            .unwrap_or_default();
        Ok(Self::with_diagram(diagram, config))
    }

    /// Canonical text of the current state.
    pub fn text(&self) -> String {
        emit_diagram(&self.diagram)
    }

    pub fn config(&self) -> EditorConfig {
        self.config
    }

    fn snap_config(&self) -> SnapConfig {
        SnapConfig::from_properties(&self.diagram.properties, self.config.snap_enabled)
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// The history, created on first access.
    pub fn history(&mut self) -> &mut History {
        let depth = self.config.history_depth;
        self.history.get_or_insert_with(|| match depth {
            Some(max) => History::with_depth(max),
            None => History::new(),
        })
    }

    /// Detach the history, e.g. to store it with the diagram's tree item.
    pub fn take_history(&mut self) -> Option<History> {
        self.history.take()
    }

    pub fn set_history(&mut self, history: Option<History>) {
        self.history = history;
    }

    /// Record the current state as an undo step.
    pub fn snapshot(&mut self) {
        let text = self.text();
        self.history().snapshot(text);
    }

    /// Step back one action. `Ok(false)` when there is nothing to undo.
    /// A stored state that fails to parse leaves the canvas and both
    /// stacks untouched.
    pub fn undo(&mut self) -> ParseResult<bool> {
        let Some(previous) = self.history.as_ref().and_then(History::peek_undo) else {
            return Ok(false);
        };
        let restored = restore(previous, &self.diagram)?;
        let current = self.text();
        self.history().undo(current);
        self.diagram = restored;
        Ok(true)
    }

    /// Step forward one undone action. `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> ParseResult<bool> {
        let Some(next) = self.history.as_ref().and_then(History::peek_redo) else {
            return Ok(false);
        };
        let restored = restore(next, &self.diagram)?;
        let current = self.text();
        self.history().redo(current);
        self.diagram = restored;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_redo)
    }

    // ─── Editing actions ─────────────────────────────────────────────────

    /// Move the selection by a snapped delta. Returns how many elements
    /// moved directly.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> usize {
        if self.diagram.selected().is_empty() {
            return 0;
        }
        self.snapshot();
        let snap = self.snap_config();
        move_selected(&mut self.diagram, dx, dy, &snap)
    }

    /// Insert a parsed fragment at a snapped drop point and select it.
    pub fn insert(&mut self, fragment: Diagram, at: (f64, f64)) -> Vec<NodeIndex> {
        if fragment.is_empty() {
            return Vec::new();
        }
        self.snapshot();
        let at = self.snap_config().point(at.0, at.1);
        insert(&mut self.diagram, fragment, at, true)
    }

    /// Parse clipboard text and insert it. Nothing changes if it fails to
    /// parse.
    pub fn paste(&mut self, text: &str, at: (f64, f64)) -> ParseResult<Vec<NodeIndex>> {
        let Some(parsed) = parse_diagram(text, &ParseOptions::default())? else {
            return Ok(Vec::new());
        };
        Ok(self.insert(parsed.diagram, at))
    }

    /// Clipboard text for the selection.
    pub fn copy(&self) -> String {
        emit_selection(&self.diagram)
    }

    /// Copy, then delete the selection as one undo step.
    pub fn cut(&mut self) -> String {
        let text = self.copy();
        if !text.is_empty() {
            self.snapshot();
            self.remove_selected();
        }
        text
    }

    /// Delete the selection, including wires of deleted elements and pins
    /// left without wires.
    pub fn delete_selected(&mut self) -> Vec<Element> {
        if self.diagram.selected().is_empty() {
            return Vec::new();
        }
        self.snapshot();
        self.remove_selected()
    }

    fn remove_selected(&mut self) -> Vec<Element> {
        let mut removed = Vec::new();
        for idx in self.diagram.selected() {
            removed.extend(self.diagram.remove_element(idx));
        }
        log::debug!("deleted {} elements", removed.len());
        removed
    }

    /// Flip the inverter at a wire's start. False if `wire` is not a wire.
    pub fn toggle_wire_start(&mut self, wire: NodeIndex) -> bool {
        self.toggle_wire(wire, |w| w.start_visible = !w.start_visible)
    }

    /// Flip the inverter at a wire's end. False if `wire` is not a wire.
    pub fn toggle_wire_end(&mut self, wire: NodeIndex) -> bool {
        self.toggle_wire(wire, |w| w.end_visible = !w.end_visible)
    }

    fn toggle_wire(&mut self, idx: NodeIndex, flip: impl FnOnce(&mut ld_core::Wire)) -> bool {
        if !self.diagram.get(idx).is_some_and(Element::is_wire) {
            return false;
        }
        self.snapshot();
        if let Some(wire) = self.diagram.get_mut(idx).and_then(Element::as_wire_mut) {
            flip(wire);
        }
        true
    }

    /// Clear the tag of every selected Input/Output. Returns how many
    /// elements lost a tag.
    pub fn reset_tags(&mut self) -> usize {
        let tagged: Vec<NodeIndex> = self
            .diagram
            .selected()
            .into_iter()
            .filter(|&idx| {
                self.diagram
                    .get(idx)
                    .is_some_and(|e| e.kind.tag_id().is_some())
            })
            .collect();
        if tagged.is_empty() {
            return 0;
        }
        self.snapshot();
        for &idx in &tagged {
            if let Some(element) = self.diagram.get_mut(idx) {
                match &mut element.kind {
                    ElementKind::Input { tag_id } | ElementKind::Output { tag_id } => {
                        *tag_id = None;
                    }
                    _ => {}
                }
            }
        }
        tagged.len()
    }

    /// Remove every element as one undo step.
    pub fn clear(&mut self) {
        if self.diagram.is_empty() {
            return;
        }
        self.snapshot();
        self.diagram.clear();
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_connected(&mut self, start: NodeIndex) {
        self.diagram.select_connected(start);
    }

    pub fn select_all(&mut self) {
        self.diagram.select_all();
    }

    pub fn select_none(&mut self) {
        self.diagram.select_none();
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

/// Parse a stored state for `current`. The element counter never goes
/// back, so ids handed out before the undo stay unused.
fn restore(text: &str, current: &Diagram) -> ParseResult<Diagram> {
    let mut restored = parse_diagram(text, &ParseOptions::default())?
        .map(|parsed| parsed.diagram)
        .unwrap_or_default();
    restored.counter.merge(&current.counter);
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ld_core::{Uid, UidKind};
    use pretty_assertions::assert_eq;

    const WIRED: &str = "+;Diagram|0;600;400;0;0;600;400;30;15;15;0;0\n\
                         +;Input|0;30;30;4\n\
                         -;Wire|2;Start\n\
                         +;AndGate|1;90;30\n\
                         -;Wire|2;End\n\
                         +;Wire|2;30;45;90;45;false;false;false;false\n";

    fn canvas() -> Canvas {
        Canvas::from_text(WIRED, EditorConfig::default()).unwrap()
    }

    fn idx(c: &Canvas, s: &str) -> NodeIndex {
        c.diagram.find(s.parse::<Uid>().unwrap()).unwrap()
    }

    #[test]
    fn history_is_lazy() {
        let mut c = canvas();
        assert!(!c.can_undo());
        assert!(c.take_history().is_none());
        c.snapshot();
        assert!(c.can_undo());
    }

    #[test]
    fn broken_entry_leaves_stacks_alone() {
        let mut c = canvas();
        let mut history = History::new();
        history.push_undo("+;Pin|0;x;0\n".to_string());
        c.set_history(Some(history));

        assert!(c.undo().is_err());
        assert_eq!(c.text(), WIRED);
        assert!(c.can_undo());
        assert!(!c.can_redo());

        let mut history = History::new();
        history.push_undo(WIRED.to_string());
        history.undo("+;Pin|0;x;0\n".to_string());
        c.set_history(Some(history));

        assert!(c.redo().is_err());
        assert_eq!(c.text(), WIRED);
        assert!(c.can_redo());
        assert!(!c.can_undo());
    }

    #[test]
    fn toggle_then_undo() {
        let mut c = canvas();
        let wire = idx(&c, "Wire|2");
        assert!(c.toggle_wire_end(wire));
        assert!(c.text().contains("+;Wire|2;30;45;90;45;false;true;false;false"));
        assert!(c.undo().unwrap());
        assert_eq!(c.text(), WIRED);
        assert!(!c.toggle_wire_start(idx(&c, "AndGate|1")));
        assert!(c.redo().unwrap());
        assert!(c.text().contains(";false;true;false;false"));
    }

    #[test]
    fn reset_tags_only_selected() {
        let mut c = canvas();
        assert_eq!(c.reset_tags(), 0);
        assert!(!c.can_undo());
        c.select_all();
        assert_eq!(c.reset_tags(), 1);
        let input = c.diagram.get_by_uid(Uid::new(UidKind::Input, 0)).unwrap();
        assert_eq!(input.kind.tag_id(), None);
    }

    #[test]
    fn move_snaps_delta() {
        let mut c = canvas();
        let gate = idx(&c, "AndGate|1");
        c.select_connected(gate);
        c.diagram.get_mut(idx(&c, "Input|0")).unwrap().selected = false;
        assert_eq!(c.move_selected(16.0, 0.0), 1);
        assert_eq!(c.diagram.get(gate).unwrap().x, 105.0);
        let wire = c.diagram.get(idx(&c, "Wire|2")).unwrap();
        assert_eq!(wire.end_point(), Some((105.0, 45.0)));
    }

    #[test]
    fn cut_is_one_step() {
        let mut c = canvas();
        c.select_all();
        let clip = c.cut();
        assert!(clip.starts_with("+;Input|0;30;30;4\n"));
        assert!(c.diagram.is_empty());
        assert!(c.undo().unwrap());
        assert_eq!(c.diagram.len(), 3);
        assert!(!c.can_undo());
    }

    #[test]
    fn paste_failure_leaves_no_step() {
        let mut c = canvas();
        assert!(c.paste("+;Pin|0;x;0\n", (0.0, 0.0)).is_err());
        assert!(!c.can_undo());
        assert!(c.paste("", (0.0, 0.0)).unwrap().is_empty());
        assert!(!c.can_undo());
    }

    #[test]
    fn undo_never_rewinds_counter() {
        let mut c = canvas();
        let added = c.paste("+;Pin|0;0;0\n", (200.0, 200.0)).unwrap();
        assert_eq!(c.diagram.get(added[0]).unwrap().uid.number, 3);
        c.undo().unwrap();
        let added = c.paste("+;Pin|0;0;0\n", (200.0, 200.0)).unwrap();
        assert_eq!(c.diagram.get(added[0]).unwrap().uid.number, 4);
    }

    #[test]
    fn history_depth_is_honoured() {
        let config = EditorConfig {
            history_depth: Some(2),
            ..EditorConfig::default()
        };
        let mut c = Canvas::from_text(WIRED, config).unwrap();
        let wire = idx(&c, "Wire|2");
        for _ in 0..3 {
            c.toggle_wire_start(wire);
        }
        assert!(c.undo().unwrap());
        assert!(c.undo().unwrap());
        assert!(!c.undo().unwrap());
        assert!(c.text().contains("Wire|2;30;45;90;45;true"));
    }
}

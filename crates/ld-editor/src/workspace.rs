//! A solution tree with one diagram open on the canvas.
//!
//! Diagram items in the tree hold serialized text. Opening a diagram parses
//! its text into the canvas and hands it the stored history; switching away
//! writes the canvas text and history back into the item.

use crate::canvas::{Canvas, EditorConfig};
use ld_core::{
    Diagram, DiagramProperties, EmitOptions, NodeIndex, ParseResult, SolutionTree, TagTable,
    TreeItem, TreeItemKind, Uid, emit_solution, parse_solution,
};

#[derive(Debug)]
pub struct Workspace {
    pub tree: SolutionTree,
    pub tags: TagTable,
    pub canvas: Canvas,
    open: Option<NodeIndex>,
    config: EditorConfig,
}

impl Workspace {
    /// A fresh solution with one project and one open, empty diagram.
    pub fn new(config: EditorConfig) -> Self {
        let mut tree = SolutionTree::with_defaults();
        let mut canvas = Canvas::new(config);
        let open = tree.diagrams().first().copied();
        if let Some(item) = open {
            tree.select(item);
            canvas.diagram.uid = tree.get(item).map(|i| i.uid);
        }
        Self {
            tree,
            tags: TagTable::new(),
            canvas,
            open,
            config,
        }
    }

    /// Load a solution file and open its first diagram.
    pub fn from_text(text: &str, config: EditorConfig) -> ParseResult<Self> {
        match parse_solution(text)? {
            Some(parsed) => Self::with_tree(parsed.tree, config),
            None => Ok(Self::new(config)),
        }
    }

    fn with_tree(tree: SolutionTree, config: EditorConfig) -> ParseResult<Self> {
        let mut workspace = Self {
            tree,
            tags: TagTable::new(),
            canvas: Canvas::new(config),
            open: None,
            config,
        };
        if let Some(&first) = workspace.tree.diagrams().first() {
            workspace.open(first)?;
        }
        Ok(workspace)
    }

    /// The Diagram item shown on the canvas.
    pub fn open_item(&self) -> Option<NodeIndex> {
        self.open
    }

    /// Tag file named in the Solution header.
    pub fn tag_file(&self) -> Option<&str> {
        let root = self.tree.root()?;
        match &self.tree.get(root)?.kind {
            TreeItemKind::Solution { tag_file, .. } => tag_file.as_deref(),
            _ => None,
        }
    }

    /// Show a Diagram item on the canvas. Returns false if `item` is not a
    /// diagram. The text is parsed before anything is stored, so a broken
    /// model leaves the current canvas untouched.
    pub fn open(&mut self, item: NodeIndex) -> ParseResult<bool> {
        if self.open == Some(item) {
            return Ok(true);
        }
        let Some(TreeItem {
            uid,
            kind: TreeItemKind::Diagram { model, .. },
            ..
        }) = self.tree.get(item)
        else {
            return Ok(false);
        };
        let uid = *uid;
        let mut canvas = if model.trim().is_empty() {
            Canvas::with_diagram(
                Diagram::with_header(uid, DiagramProperties::default()),
                self.config,
            )
        } else {
            Canvas::from_text(model, self.config)?
        };
        canvas.diagram.uid = Some(uid);

        self.store_canvas();
        if let Some(TreeItemKind::Diagram { history, .. }) =
            self.tree.get_mut(item).map(|i| &mut i.kind)
        {
            canvas.set_history(history.take());
        }
        self.canvas = canvas;
        self.open = Some(item);
        self.tree.select(item);
        log::debug!("opened {uid}");
        Ok(true)
    }

    pub fn open_diagram(&mut self, uid: Uid) -> ParseResult<bool> {
        match self.tree.find(uid) {
            Some(item) => self.open(item),
            None => Ok(false),
        }
    }

    /// Write the canvas back into its tree item.
    fn store_canvas(&mut self) {
        let Some(open) = self.open else {
            return;
        };
        let text = self.canvas.text();
        let stored = self.canvas.take_history();
        if let Some(TreeItemKind::Diagram { model, history }) =
            self.tree.get_mut(open).map(|i| &mut i.kind)
        {
            *model = text;
            *history = stored;
        }
    }

    /// Add the item the tree selection implies and select it.
    pub fn add_item(&mut self) -> Option<NodeIndex> {
        let item = self.tree.add_default()?;
        self.tree.select(item);
        Some(item)
    }

    /// Delete an item and its subtree. If the open diagram goes with it,
    /// the first remaining diagram is opened.
    pub fn remove_item(&mut self, item: NodeIndex) -> ParseResult<Vec<TreeItem>> {
        let removed = self.tree.remove(item);
        let open_removed = self.open.is_some_and(|open| self.tree.get(open).is_none());
        if open_removed {
            self.open = None;
            self.canvas = Canvas::new(self.config);
            if let Some(&first) = self.tree.diagrams().first() {
                self.open(first)?;
            }
        }
        Ok(removed)
    }

    /// Open the previous diagram, crossing into the previous project at
    /// the boundary.
    pub fn previous(&mut self) -> ParseResult<bool> {
        match self.open.and_then(|open| self.tree.previous(open)) {
            Some(item) => self.open(item),
            None => Ok(false),
        }
    }

    /// Open the next diagram, crossing into the next project at the boundary.
    pub fn next(&mut self) -> ParseResult<bool> {
        match self.open.and_then(|open| self.tree.next(open)) {
            Some(item) => self.open(item),
            None => Ok(false),
        }
    }

    /// Serialize the whole solution, including the open canvas.
    pub fn to_text(&mut self, options: &EmitOptions) -> String {
        let Some(open) = self.open else {
            return emit_solution(&self.tree, options);
        };
        let text = self.canvas.text();
        let history = self.canvas.take_history();
        if let Some(TreeItemKind::Diagram { model, history: stored }) =
            self.tree.get_mut(open).map(|i| &mut i.kind)
        {
            *model = text;
            stored.clone_from(&history);
        }
        self.canvas.set_history(history);
        emit_solution(&self.tree, options)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

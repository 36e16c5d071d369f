//! The Solution → Project → Diagram tree.
//!
//! Exactly three levels. Items are nodes in a `StableDiGraph` with edges
//! from parent to child; sibling order is kept explicitly per parent so it
//! survives index reuse after deletions. Tree-item ids come from the
//! tree's own counter, independent of every diagram's element counter.

use crate::history::History;
use crate::id::{IdCounter, Uid, UidKind};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

/// Payload of a tree item.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeItemKind {
    Solution {
        tag_file: Option<String>,
        table_file: Option<String>,
    },
    Project,
    /// A diagram keeps its serialized model while it is not open, and its
    /// history once one has been stored.
    Diagram {
        model: String,
        history: Option<History>,
    },
}

impl TreeItemKind {
    pub fn solution() -> Self {
        TreeItemKind::Solution {
            tag_file: None,
            table_file: None,
        }
    }

    pub fn diagram() -> Self {
        TreeItemKind::Diagram {
            model: String::new(),
            history: None,
        }
    }

    pub const fn uid_kind(&self) -> UidKind {
        match self {
            TreeItemKind::Solution { .. } => UidKind::Solution,
            TreeItemKind::Project => UidKind::Project,
            TreeItemKind::Diagram { .. } => UidKind::Diagram,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub uid: Uid,
    pub selected: bool,
    pub kind: TreeItemKind,
}

/// A solution and everything under it.
#[derive(Debug, Clone, Default)]
pub struct SolutionTree {
    pub graph: StableDiGraph<TreeItem, ()>,

    pub uid_index: HashMap<Uid, NodeIndex>,

    /// Tree-item id counter.
    pub counter: IdCounter,

    root: Option<NodeIndex>,

    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,

    selected: Option<NodeIndex>,
}

impl SolutionTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A solution with one project holding one empty diagram.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut tree = Self::new();
        let solution = tree.add_item(None, TreeItemKind::solution(), None);
        let project = solution.and_then(|s| tree.add_item(Some(s), TreeItemKind::Project, None));
        if let Some(p) = project {
            tree.add_item(Some(p), TreeItemKind::diagram(), None);
        }
        tree
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Add an item under `parent`.
    ///
    /// Returns `None` if the level is wrong (Solution only at the root,
    /// Project under Solution, Diagram under Project) or if an explicit
    /// `uid` has the wrong kind or is taken. Without a uid the next
    /// counter value is used.
    pub fn add_item(
        &mut self,
        parent: Option<NodeIndex>,
        kind: TreeItemKind,
        uid: Option<Uid>,
    ) -> Option<NodeIndex> {
        let parent_kind = parent.and_then(|p| self.graph.node_weight(p)).map(|i| i.uid.kind);
        let level_ok = match (&kind, parent_kind) {
            (TreeItemKind::Solution { .. }, None) => parent.is_none() && self.root.is_none(),
            (TreeItemKind::Project, Some(UidKind::Solution)) => true,
            (TreeItemKind::Diagram { .. }, Some(UidKind::Project)) => true,
            _ => false,
        };
        if !level_ok {
            log::warn!("cannot add {} here", kind.uid_kind());
            return None;
        }

        let uid = match uid {
            Some(uid) if uid.kind != kind.uid_kind() || self.uid_index.contains_key(&uid) => {
                log::warn!("tree item {uid} rejected: wrong kind or already used");
                return None;
            }
            Some(uid) => {
                self.counter.observe(uid.number);
                uid
            }
            None => Uid::new(kind.uid_kind(), self.counter.next()),
        };

        let idx = self.graph.add_node(TreeItem {
            uid,
            selected: false,
            kind,
        });
        self.uid_index.insert(uid, idx);
        match parent {
            Some(p) => {
                self.graph.add_edge(p, idx, ());
                self.child_order.entry(p).or_default().push(idx);
            }
            None => self.root = Some(idx),
        }
        Some(idx)
    }

    /// Add the item implied by the current selection: a Diagram next to a
    /// selected Diagram, a Diagram inside a selected Project, a Project
    /// inside a selected Solution.
    pub fn add_default(&mut self) -> Option<NodeIndex> {
        let selected = self.selected?;
        let (parent, kind) = match self.graph[selected].kind {
            TreeItemKind::Diagram { .. } => (self.parent(selected)?, TreeItemKind::diagram()),
            TreeItemKind::Project => (selected, TreeItemKind::diagram()),
            TreeItemKind::Solution { .. } => (selected, TreeItemKind::Project),
        };
        self.add_item(Some(parent), kind, None)
    }

    /// Delete an item and everything below it. Returns the removed items,
    /// children before parents.
    pub fn remove(&mut self, idx: NodeIndex) -> Vec<TreeItem> {
        if self.graph.node_weight(idx).is_none() {
            return Vec::new();
        }
        if let Some(parent) = self.parent(idx)
            && let Some(order) = self.child_order.get_mut(&parent)
        {
            order.retain(|&c| c != idx);
        }

        let mut doomed = Vec::new();
        self.collect_postorder(idx, &mut doomed);

        let mut removed = Vec::with_capacity(doomed.len());
        for node in doomed {
            self.child_order.remove(&node);
            if self.selected == Some(node) {
                self.selected = None;
            }
            if self.root == Some(node) {
                self.root = None;
            }
            if let Some(item) = self.graph.remove_node(node) {
                self.uid_index.remove(&item.uid);
                removed.push(item);
            }
        }
        removed
    }

    fn collect_postorder(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        for child in self.children(idx) {
            self.collect_postorder(child, out);
        }
        out.push(idx);
    }

    /// Make `idx` the single selected item.
    pub fn select(&mut self, idx: NodeIndex) -> bool {
        if self.graph.node_weight(idx).is_none() {
            return false;
        }
        if let Some(previous) = self.selected.take()
            && let Some(item) = self.graph.node_weight_mut(previous)
        {
            item.selected = false;
        }
        self.graph[idx].selected = true;
        self.selected = Some(idx);
        true
    }

    pub fn selected(&self) -> Option<NodeIndex> {
        self.selected
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Children in insertion order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    /// Previous sibling, or the last child of the parent's previous sibling.
    pub fn previous(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.step(idx, false)
    }

    /// Next sibling, or the first child of the parent's next sibling.
    pub fn next(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.step(idx, true)
    }

    fn step(&self, idx: NodeIndex, forward: bool) -> Option<NodeIndex> {
        let parent = self.parent(idx)?;
        if let Some(sibling) = Self::adjacent(&self.children(parent), idx, forward) {
            return Some(sibling);
        }
        // At the boundary: hop into the neighbouring parent.
        let grandparent = self.parent(parent)?;
        let neighbour = Self::adjacent(&self.children(grandparent), parent, forward)?;
        let cousins = self.children(neighbour);
        if forward {
            cousins.first().copied()
        } else {
            cousins.last().copied()
        }
    }

    fn adjacent(siblings: &[NodeIndex], idx: NodeIndex, forward: bool) -> Option<NodeIndex> {
        let pos = siblings.iter().position(|&s| s == idx)?;
        let target = if forward { pos.checked_add(1) } else { pos.checked_sub(1) }?;
        siblings.get(target).copied()
    }

    pub fn find(&self, uid: Uid) -> Option<NodeIndex> {
        self.uid_index.get(&uid).copied()
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&TreeItem> {
        self.graph.node_weight(idx)
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> Option<&mut TreeItem> {
        self.graph.node_weight_mut(idx)
    }

    /// Every Diagram item in tree order.
    pub fn diagrams(&self) -> Vec<NodeIndex> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        self.children(root)
            .into_iter()
            .flat_map(|project| self.children(project))
            .collect()
    }
}

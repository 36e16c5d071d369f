//! Core data model for logic diagrams.
//!
//! A diagram is an arena of [`Element`] values held in a `StableDiGraph`.
//! Graph edges run from a terminal element (pin, input, output, gate) to a
//! wire and record which end of the wire terminates there. A terminal's
//! outgoing edges are its [`Connection`]; a wire's incoming edges are its
//! back-references ([`WireEnds`]). The graph may contain cycles (a wire can
//! start and end on the same gate), which is harmless because every
//! reference is a `NodeIndex` handle rather than an owning pointer.

use crate::id::{IdCounter, Uid, UidKind};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Wire ends ───────────────────────────────────────────────────────────

/// Which end of a wire terminates at an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Endpoint::Start => "Start",
            Endpoint::End => "End",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "Start" => Some(Endpoint::Start),
            "End" => Some(Endpoint::End),
            _ => None,
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Wire-specific payload. The start point is the owning element's `x`/`y`;
/// `x2`/`y2` are relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wire {
    pub x2: f64,
    pub y2: f64,
    /// Inverter bubble drawn at the start.
    pub start_visible: bool,
    /// Inverter bubble drawn at the end.
    pub end_visible: bool,
    pub start_io: bool,
    pub end_io: bool,
}

/// The six element kinds, each with its own payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Pin,
    Input { tag_id: Option<u32> },
    Output { tag_id: Option<u32> },
    AndGate,
    OrGate,
    Wire(Wire),
}

impl ElementKind {
    pub const fn uid_kind(&self) -> UidKind {
        match self {
            ElementKind::Pin => UidKind::Pin,
            ElementKind::Input { .. } => UidKind::Input,
            ElementKind::Output { .. } => UidKind::Output,
            ElementKind::AndGate => UidKind::AndGate,
            ElementKind::OrGate => UidKind::OrGate,
            ElementKind::Wire(_) => UidKind::Wire,
        }
    }

    /// Tag reference of an Input/Output element.
    pub const fn tag_id(&self) -> Option<u32> {
        match self {
            ElementKind::Input { tag_id } | ElementKind::Output { tag_id } => *tag_id,
            _ => None,
        }
    }
}

/// A node in the diagram: terminal element or wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub uid: Uid,
    /// Left edge, or the wire start point.
    pub x: f64,
    /// Top edge, or the wire start point.
    pub y: f64,
    pub selected: bool,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(number: u32, x: f64, y: f64, kind: ElementKind) -> Self {
        Self {
            uid: Uid::new(kind.uid_kind(), number),
            x,
            y,
            selected: false,
            kind,
        }
    }

    /// A wire between two absolute points, without inverters or IO flags.
    pub fn wire(number: u32, start: (f64, f64), end: (f64, f64)) -> Self {
        Self::new(
            number,
            start.0,
            start.1,
            ElementKind::Wire(Wire {
                x2: end.0 - start.0,
                y2: end.1 - start.1,
                ..Wire::default()
            }),
        )
    }

    pub const fn is_wire(&self) -> bool {
        matches!(self.kind, ElementKind::Wire(_))
    }

    pub fn as_wire(&self) -> Option<&Wire> {
        match &self.kind {
            ElementKind::Wire(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_wire_mut(&mut self) -> Option<&mut Wire> {
        match &mut self.kind {
            ElementKind::Wire(w) => Some(w),
            _ => None,
        }
    }

    /// Absolute wire end point: `(x + x2, y + y2)`.
    pub fn end_point(&self) -> Option<(f64, f64)> {
        self.as_wire().map(|w| (self.x + w.x2, self.y + w.y2))
    }
}

// ─── Associations ────────────────────────────────────────────────────────

/// Edge weight: owner → wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub endpoint: Endpoint,
    /// Insertion sequence; keeps connection order stable across index reuse.
    seq: u64,
}

/// One wire association as seen from its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLink {
    pub wire: NodeIndex,
    pub owner: NodeIndex,
    pub endpoint: Endpoint,
}

impl WireLink {
    /// The owner, if the wire starts here.
    pub fn start(&self) -> Option<NodeIndex> {
        (self.endpoint == Endpoint::Start).then_some(self.owner)
    }

    /// The owner, if the wire ends here.
    pub fn end(&self) -> Option<NodeIndex> {
        (self.endpoint == Endpoint::End).then_some(self.owner)
    }
}

/// Ordered list of wires terminating at one non-wire element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub owner: NodeIndex,
    pub wires: SmallVec<[WireLink; 4]>,
}

impl Connection {
    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    pub fn len(&self) -> usize {
        self.wires.len()
    }
}

/// Both sides of a wire, each present once its owner has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireEnds {
    pub start: Option<NodeIndex>,
    pub end: Option<NodeIndex>,
}

impl WireEnds {
    /// The endpoint that is not `from`. `None` for a wire looping back to
    /// `from` or one with a missing far end.
    pub fn opposite(&self, from: NodeIndex) -> Option<NodeIndex> {
        if self.start == Some(from) {
            self.end.filter(|&e| e != from)
        } else if self.end == Some(from) {
            self.start.filter(|&s| s != from)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

// ─── Diagram properties ──────────────────────────────────────────────────

/// Page, grid and snap geometry stored in a Diagram header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramProperties {
    pub page_width: f64,
    pub page_height: f64,
    pub grid_origin_x: f64,
    pub grid_origin_y: f64,
    pub grid_width: f64,
    pub grid_height: f64,
    pub grid_size: f64,
    pub snap_x: f64,
    pub snap_y: f64,
    pub snap_offset_x: f64,
    pub snap_offset_y: f64,
}

/// Grid portion of [`DiagramProperties`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub size: f64,
}

impl DiagramProperties {
    /// Number of numeric fields in a Diagram header.
    pub const FIELD_COUNT: usize = 11;

    pub const fn from_fields(f: [f64; 11]) -> Self {
        Self {
            page_width: f[0],
            page_height: f[1],
            grid_origin_x: f[2],
            grid_origin_y: f[3],
            grid_width: f[4],
            grid_height: f[5],
            grid_size: f[6],
            snap_x: f[7],
            snap_y: f[8],
            snap_offset_x: f[9],
            snap_offset_y: f[10],
        }
    }

    pub const fn to_fields(&self) -> [f64; 11] {
        [
            self.page_width,
            self.page_height,
            self.grid_origin_x,
            self.grid_origin_y,
            self.grid_width,
            self.grid_height,
            self.grid_size,
            self.snap_x,
            self.snap_y,
            self.snap_offset_x,
            self.snap_offset_y,
        ]
    }

    pub const fn grid(&self) -> GridGeometry {
        GridGeometry {
            origin_x: self.grid_origin_x,
            origin_y: self.grid_origin_y,
            width: self.grid_width,
            height: self.grid_height,
            size: self.grid_size,
        }
    }
}

impl Default for DiagramProperties {
    fn default() -> Self {
        Self::from_fields([
            600.0, 400.0, 0.0, 0.0, 600.0, 400.0, 30.0, 15.0, 15.0, 0.0, 0.0,
        ])
    }
}

// ─── Diagram ─────────────────────────────────────────────────────────────

/// One diagram canvas: elements, their wire associations and id state.
#[derive(Debug, Clone)]
pub struct Diagram {
    /// Tree-item id from the Diagram header; `None` for clipboard fragments.
    pub uid: Option<Uid>,

    pub properties: DiagramProperties,

    /// Element arena. Edges go from terminal element → wire.
    pub graph: StableDiGraph<Element, Association>,

    /// Index from Uid → NodeIndex for name lookup.
    pub uid_index: HashMap<Uid, NodeIndex>,

    /// Element id high-water mark.
    pub counter: IdCounter,

    /// Document order of elements.
    order: Vec<NodeIndex>,

    link_seq: u64,
}

impl Diagram {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uid: None,
            properties: DiagramProperties::default(),
            graph: StableDiGraph::new(),
            uid_index: HashMap::new(),
            counter: IdCounter::new(),
            order: Vec::new(),
            link_seq: 0,
        }
    }

    #[must_use]
    pub fn with_header(uid: Uid, properties: DiagramProperties) -> Self {
        Self {
            uid: Some(uid),
            properties,
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add an element. Its uid must not already be in use; the element
    /// counter is advanced past its number.
    pub fn add_element(&mut self, element: Element) -> NodeIndex {
        let uid = element.uid;
        self.counter.observe(uid.number);
        let idx = self.graph.add_node(element);
        if self.uid_index.insert(uid, idx).is_some() {
            log::warn!("element {uid} added twice; lookups now resolve to the newer one");
        }
        self.order.push(idx);
        idx
    }

    /// Record that `endpoint` of `wire` terminates at `owner`.
    /// Returns false when either handle is stale or has the wrong kind.
    pub fn connect(&mut self, owner: NodeIndex, wire: NodeIndex, endpoint: Endpoint) -> bool {
        let owner_ok = self.graph.node_weight(owner).is_some_and(|e| !e.is_wire());
        let wire_ok = self.graph.node_weight(wire).is_some_and(Element::is_wire);
        if !owner_ok || !wire_ok {
            return false;
        }
        let seq = self.link_seq;
        self.link_seq += 1;
        self.graph.add_edge(owner, wire, Association { endpoint, seq });
        true
    }

    /// Wires terminating at a non-wire element, in connection order.
    /// `None` for wires and stale handles.
    pub fn connection(&self, owner: NodeIndex) -> Option<Connection> {
        let element = self.graph.node_weight(owner)?;
        if element.is_wire() {
            return None;
        }
        let mut links: SmallVec<[(u64, WireLink); 4]> = self
            .graph
            .edges_directed(owner, Direction::Outgoing)
            .map(|e| {
                (
                    e.weight().seq,
                    WireLink {
                        wire: e.target(),
                        owner,
                        endpoint: e.weight().endpoint,
                    },
                )
            })
            .collect();
        links.sort_by_key(|(seq, _)| *seq);
        Some(Connection {
            owner,
            wires: links.into_iter().map(|(_, link)| link).collect(),
        })
    }

    /// The elements a wire starts and ends at. `None` if `wire` is not a wire.
    pub fn wire_ends(&self, wire: NodeIndex) -> Option<WireEnds> {
        if !self.graph.node_weight(wire)?.is_wire() {
            return None;
        }
        let mut incoming: Vec<_> = self
            .graph
            .edges_directed(wire, Direction::Incoming)
            .map(|e| (e.weight().seq, e.weight().endpoint, e.source()))
            .collect();
        incoming.sort_by_key(|(seq, _, _)| *seq);

        let mut ends = WireEnds::default();
        for (_, endpoint, owner) in incoming {
            let slot = match endpoint {
                Endpoint::Start => &mut ends.start,
                Endpoint::End => &mut ends.end,
            };
            if slot.is_none() {
                *slot = Some(owner);
            }
        }
        Some(ends)
    }

    pub fn find(&self, uid: Uid) -> Option<NodeIndex> {
        self.uid_index.get(&uid).copied()
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&Element> {
        self.graph.node_weight(idx)
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> Option<&mut Element> {
        self.graph.node_weight_mut(idx)
    }

    pub fn get_by_uid(&self, uid: Uid) -> Option<&Element> {
        self.find(uid).and_then(|idx| self.get(idx))
    }

    /// Elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeIndex, &Element)> {
        self.order.iter().map(|&idx| (idx, &self.graph[idx]))
    }

    /// Handles in document order.
    pub fn indices(&self) -> Vec<NodeIndex> {
        self.order.clone()
    }

    pub fn selected(&self) -> Vec<NodeIndex> {
        self.elements()
            .filter(|(_, e)| e.selected)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn select_all(&mut self) {
        for &idx in &self.order {
            self.graph[idx].selected = true;
        }
    }

    pub fn select_none(&mut self) {
        for &idx in &self.order {
            self.graph[idx].selected = false;
        }
    }

    /// Select everything reachable from `start` through wire associations.
    ///
    /// Depth-first: each visited terminal is selected along with every wire
    /// in its connection, then the walk continues at each wire's far end.
    /// The visited set terminates cycles; half-resolved wires are selected
    /// but not followed.
    pub fn select_connected(&mut self, start: NodeIndex) {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![start];

        while let Some(root) = stack.pop() {
            if !visited.insert(root) {
                continue;
            }
            let Some(element) = self.graph.node_weight_mut(root) else {
                continue;
            };
            element.selected = true;

            if element.is_wire() {
                // Walk started on a wire: continue at both of its owners.
                if let Some(ends) = self.wire_ends(root) {
                    stack.extend(
                        [ends.end, ends.start]
                            .into_iter()
                            .flatten()
                            .filter(|n| !visited.contains(n)),
                    );
                }
                continue;
            }

            let Some(connection) = self.connection(root) else {
                continue;
            };
            for link in connection.wires.iter().rev() {
                self.graph[link.wire].selected = true;
                let next = self.wire_ends(link.wire).and_then(|ends| ends.opposite(root));
                if let Some(next) = next
                    && !visited.contains(&next)
                {
                    stack.push(next);
                }
            }
        }
    }

    /// Delete an element.
    ///
    /// Deleting a wire also deletes any Pin left without wires. Deleting a
    /// terminal element deletes every wire in its connection first (with
    /// the same Pin cleanup). Returns everything removed.
    pub fn remove_element(&mut self, idx: NodeIndex) -> Vec<Element> {
        let mut removed = Vec::new();
        let Some(element) = self.graph.node_weight(idx) else {
            return removed;
        };

        if element.is_wire() {
            self.remove_wire(idx, None, &mut removed);
        } else {
            let mut wires: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            wires.sort();
            wires.dedup();
            for wire in wires {
                self.remove_wire(wire, Some(idx), &mut removed);
            }
            if let Some(element) = self.detach(idx) {
                removed.push(element);
            }
        }
        removed
    }

    fn remove_wire(&mut self, wire: NodeIndex, skip: Option<NodeIndex>, removed: &mut Vec<Element>) {
        let mut owners: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(wire, Direction::Incoming)
            .collect();
        owners.sort();
        owners.dedup();

        if let Some(element) = self.detach(wire) {
            removed.push(element);
        }

        for owner in owners {
            if Some(owner) == skip {
                continue;
            }
            let orphaned_pin = self.graph.node_weight(owner).is_some_and(|e| {
                matches!(e.kind, ElementKind::Pin)
                    && self
                        .graph
                        .neighbors_directed(owner, Direction::Outgoing)
                        .next()
                        .is_none()
            });
            if orphaned_pin && let Some(pin) = self.detach(owner) {
                log::debug!("removed pin {} left without wires", pin.uid);
                removed.push(pin);
            }
        }
    }

    fn detach(&mut self, idx: NodeIndex) -> Option<Element> {
        let element = self.graph.remove_node(idx)?;
        if self.uid_index.get(&element.uid) == Some(&idx) {
            self.uid_index.remove(&element.uid);
        }
        self.order.retain(|&i| i != idx);
        Some(element)
    }

    /// Remove every element. The id counter is kept.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.uid_index.clear();
        self.order.clear();
    }

    /// Give every element a fresh number from `counter`, keeping its kind.
    ///
    /// Associations are held as handles, so they survive renumbering.
    pub fn append_ids(&mut self, counter: &mut IdCounter) {
        self.uid_index.clear();
        for &idx in &self.order {
            let element = &mut self.graph[idx];
            element.uid = element.uid.with_number(counter.next());
            self.uid_index.insert(element.uid, idx);
        }
        self.counter = *counter;
    }

    /// Move every element and association of `other` into this diagram.
    ///
    /// Elements whose uid is already taken are renumbered from this
    /// diagram's counter. Returns the new handles in document order.
    pub fn merge(&mut self, other: Diagram) -> Vec<NodeIndex> {
        self.counter.merge(&other.counter);

        let mut map: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(other.order.len());
        let mut added = Vec::with_capacity(other.order.len());
        for &old in &other.order {
            let mut element = other.graph[old].clone();
            if self.uid_index.contains_key(&element.uid) {
                let fresh = element.uid.with_number(self.counter.next());
                log::debug!("merge: {} renumbered to {fresh}", element.uid);
                element.uid = fresh;
            }
            let new = self.add_element(element);
            map.insert(old, new);
            added.push(new);
        }

        let mut edges: Vec<_> = other
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (source, target) = other.graph.edge_endpoints(e)?;
                let link = other.graph[e];
                Some((link.seq, source, target, link.endpoint))
            })
            .collect();
        edges.sort_by_key(|(seq, ..)| *seq);
        for (_, source, target, endpoint) in edges {
            if let (Some(&owner), Some(&wire)) = (map.get(&source), map.get(&target)) {
                self.connect(owner, wire, endpoint);
            }
        }
        added
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

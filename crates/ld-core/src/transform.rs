//! Geometry transforms that mutate a `Diagram` in place.
//!
//! Moving a terminal element drags the wires in its connection along with
//! it, but asymmetrically: the side of a wire that *starts* at the element
//! moves while its far end stays put; the side that *ends* at the element
//! just extends the wire. Pasting renumbers a parsed fragment against the
//! target's counter, translates it to the drop point and merges it.

use crate::creator::Creator;
use crate::id::IdCounter;
use crate::model::{Diagram, DiagramProperties, Endpoint};
use petgraph::graph::NodeIndex;

// ─── Snapping ────────────────────────────────────────────────────────────

/// Round `v` to the nearest multiple of `step` counted from `offset`.
/// A non-positive step leaves `v` unchanged.
pub fn snap(v: f64, step: f64, offset: f64) -> f64 {
    if step <= 0.0 {
        return v;
    }
    ((v - offset) / step).round() * step + offset
}

/// Grid snapping for moves and drops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapConfig {
    pub enabled: bool,
    pub step_x: f64,
    pub step_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl SnapConfig {
    /// Identity snapping.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            step_x: 0.0,
            step_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Steps and offsets from a Diagram header.
    pub const fn from_properties(properties: &DiagramProperties, enabled: bool) -> Self {
        Self {
            enabled,
            step_x: properties.snap_x,
            step_y: properties.snap_y,
            offset_x: properties.snap_offset_x,
            offset_y: properties.snap_offset_y,
        }
    }

    /// Snap an absolute position.
    pub fn point(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.enabled {
            return (x, y);
        }
        (
            snap(x, self.step_x, self.offset_x),
            snap(y, self.step_y, self.offset_y),
        )
    }

    /// Snap a displacement. Deltas are whole steps, so the offset does not
    /// apply.
    pub fn delta(&self, dx: f64, dy: f64) -> (f64, f64) {
        if !self.enabled {
            return (dx, dy);
        }
        (snap(dx, self.step_x, 0.0), snap(dy, self.step_y, 0.0))
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self::from_properties(&DiagramProperties::default(), true)
    }
}

// ─── Moving ──────────────────────────────────────────────────────────────

/// Move one element by the snapped `(dx, dy)`.
///
/// For a terminal element every wire in its connection follows: a wire
/// starting here shifts its start and keeps its absolute end, a wire ending
/// here shifts its end. A wire moved directly moves whole. Returns false
/// for a stale handle.
pub fn move_element(
    diagram: &mut Diagram,
    idx: NodeIndex,
    dx: f64,
    dy: f64,
    snap: &SnapConfig,
) -> bool {
    let (sx, sy) = snap.delta(dx, dy);
    let Some(element) = diagram.get_mut(idx) else {
        return false;
    };
    element.x += sx;
    element.y += sy;
    if element.is_wire() {
        return true;
    }

    let Some(connection) = diagram.connection(idx) else {
        return true;
    };
    for link in &connection.wires {
        let Some(element) = diagram.get_mut(link.wire) else {
            continue;
        };
        match link.endpoint {
            Endpoint::Start => {
                element.x += sx;
                element.y += sy;
                if let Some(wire) = element.as_wire_mut() {
                    wire.x2 -= sx;
                    wire.y2 -= sy;
                }
            }
            Endpoint::End => {
                if let Some(wire) = element.as_wire_mut() {
                    wire.x2 += sx;
                    wire.y2 += sy;
                }
            }
        }
    }
    true
}

/// Move every selected element.
///
/// Wires attached to an owner move through that owner only; a selected
/// wire with no owners at all moves whole. Returns how many elements were
/// moved directly.
pub fn move_selected(diagram: &mut Diagram, dx: f64, dy: f64, snap: &SnapConfig) -> usize {
    let mut moved = 0;
    for idx in diagram.selected() {
        let Some(element) = diagram.get(idx) else {
            continue;
        };
        let free = !element.is_wire()
            || diagram
                .wire_ends(idx)
                .is_some_and(|ends| ends.start.is_none() && ends.end.is_none());
        if free && move_element(diagram, idx, dx, dy, snap) {
            moved += 1;
        }
    }
    log::trace!("moved {moved} selected elements by ({dx}, {dy})");
    moved
}

// ─── Insertion ───────────────────────────────────────────────────────────

/// Paste a parsed fragment into `target` with its top-left corner at `at`.
///
/// The fragment is renumbered from the target's counter first (its
/// associations are already resolved, so they survive). The corner is the
/// minimum `(x, y)` over the fragment's terminal elements, or over its
/// wires when it has none. Wires keep their relative end points. With
/// `select`, the inserted elements become the selection.
pub fn insert(
    target: &mut Diagram,
    mut fragment: Diagram,
    at: (f64, f64),
    select: bool,
) -> Vec<NodeIndex> {
    if fragment.is_empty() {
        return Vec::new();
    }
    fragment.append_ids(&mut target.counter);

    let corner = |wires: bool| {
        fragment
            .elements()
            .filter(|(_, e)| e.is_wire() == wires)
            .fold(None, |acc: Option<(f64, f64)>, (_, e)| {
                Some(acc.map_or((e.x, e.y), |(x, y)| (x.min(e.x), y.min(e.y))))
            })
    };
    let (min_x, min_y) = corner(false).or_else(|| corner(true)).unwrap_or(at);
    let (dx, dy) = (at.0 - min_x, at.1 - min_y);
    for idx in fragment.indices() {
        if let Some(element) = fragment.get_mut(idx) {
            element.x += dx;
            element.y += dy;
            element.selected = false;
        }
    }

    if select {
        target.select_none();
    }
    let added = target.merge(fragment);
    if select {
        for &idx in &added {
            if let Some(element) = target.get_mut(idx) {
                element.selected = true;
            }
        }
    }
    log::debug!("inserted {} elements at ({}, {})", added.len(), at.0, at.1);
    added
}

/// [`insert`], then announce the new elements to `creator`.
pub fn insert_with<C: Creator + ?Sized>(
    target: &mut Diagram,
    fragment: Diagram,
    at: (f64, f64),
    select: bool,
    creator: &mut C,
) -> Vec<NodeIndex> {
    let added = insert(target, fragment, at, select);
    creator.ids_appended(&added);
    for &idx in &added {
        if let Some(element) = target.get(idx) {
            creator.create_element(idx, element);
        }
    }
    creator.inserted(&added);
    creator.counter_updated(target.counter);
    added
}

// ─── Renumbering ─────────────────────────────────────────────────────────

/// Renumber every element densely from 0 in document order and reset the
/// counter to match. Associations are handles, so they are unaffected.
pub fn renumber(diagram: &mut Diagram) {
    let mut counter = IdCounter::new();
    diagram.append_ids(&mut counter);
}

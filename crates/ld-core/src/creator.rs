//! Hook for the visual layer.
//!
//! The core owns the element graph. A front end that draws elements
//! implements [`Creator`] to be told which elements exist, keyed by their
//! stable handle, and keeps its own renderable object per handle. The core
//! never looks at what the creator builds.

use crate::id::{IdCounter, Uid};
use crate::model::{Diagram, DiagramProperties, Element, GridGeometry};
use petgraph::graph::NodeIndex;

pub trait Creator {
    /// A Diagram header was read or a canvas was (re)built.
    fn create_diagram(&mut self, _uid: Option<Uid>, _properties: &DiagramProperties) {}

    fn create_grid(&mut self, _grid: &GridGeometry) {}

    fn create_element(&mut self, handle: NodeIndex, element: &Element);

    /// A batch of new elements has been placed on the canvas.
    fn inserted(&mut self, _handles: &[NodeIndex]) {}

    /// Pasted elements were renumbered.
    fn ids_appended(&mut self, _handles: &[NodeIndex]) {}

    fn counter_updated(&mut self, _counter: IdCounter) {}
}

/// Announce a whole diagram to `creator`, in document order.
pub fn replay<C: Creator + ?Sized>(diagram: &Diagram, creator: &mut C) {
    creator.create_diagram(diagram.uid, &diagram.properties);
    creator.create_grid(&diagram.properties.grid());
    let mut handles = Vec::with_capacity(diagram.len());
    for (idx, element) in diagram.elements() {
        creator.create_element(idx, element);
        handles.push(idx);
    }
    creator.inserted(&handles);
    creator.counter_updated(diagram.counter);
}

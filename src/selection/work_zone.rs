use std::cell::Cell;
use std::rc::Rc;

use crate::math::Aabb;
use crate::scene::{SceneGraph, SignalHandlerId};

/// Bounds of the current selection, used to place new content.
///
/// When the selection becomes empty the previous bounds are kept, so new
/// content lands where the user last worked.
#[derive(Debug, Default)]
pub struct WorkZone {
    bounds: Aabb,
    dirty: Rc<Cell<bool>>,
    handler: Option<SignalHandlerId>,
}

impl WorkZone {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the graph's bounds-changed signal.
    pub fn connect(&mut self, graph: &mut SceneGraph) {
        self.disconnect(graph);
        let dirty = Rc::clone(&self.dirty);
        self.handler = Some(graph.add_bounds_changed_callback(move || dirty.set(true)));
        self.dirty.set(true);
    }

    pub fn disconnect(&mut self, graph: &mut SceneGraph) {
        if let Some(id) = self.handler.take() {
            graph.remove_bounds_changed_callback(id);
        }
    }

    /// Returns `true` if bounds changed since the last update.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Recomputes the zone from the selected nodes, or from the selected
    /// components when no whole object is selected.
    pub fn update(&mut self, graph: &SceneGraph) {
        self.dirty.set(false);
        let objects = graph
            .selected_nodes()
            .into_iter()
            .fold(Aabb::empty(), |acc, id| acc.union(&graph.subtree_aabb(id)));
        let bounds = if objects.is_valid() {
            objects
        } else {
            graph.selected_components_bounds()
        };
        if bounds.is_valid() {
            self.bounds = bounds;
        }
    }

    /// The current zone, recomputed first if the graph signalled a change.
    pub fn bounds(&mut self, graph: &SceneGraph) -> Aabb {
        if self.is_dirty() {
            self.update(graph);
        }
        self.bounds
    }
}

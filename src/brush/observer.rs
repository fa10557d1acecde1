use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use super::face::{Face, FaceId};
use super::topology::{EdgeRef, VertexRef};

/// Receives every structural change of a [`Brush`](super::Brush).
///
/// Callbacks fire synchronously, before the brush operation returns, and in
/// face declaration order. Face callbacks mirror the brush's face list
/// exactly; edge and vertex callbacks replay the derived topology after each
/// connectivity change. Face ids stay stable across replays, so observers
/// can carry per-edge or per-vertex state over by the faces involved.
pub trait BrushObserver {
    /// All faces were removed.
    fn clear(&mut self);

    /// Capacity hint for `additional` upcoming faces.
    fn reserve(&mut self, additional: usize);

    /// A face was appended.
    fn push_back(&mut self, face: FaceId);

    /// The last face was removed.
    fn pop_back(&mut self);

    /// The face at `index` was removed.
    fn erase(&mut self, index: usize);

    /// Windings were rebuilt; derived topology follows.
    fn connectivity_changed(&mut self);

    /// The winding of the face at `index` was recomputed.
    fn winding_changed(&mut self, _index: usize, _face: &Face) {}

    fn edge_clear(&mut self);

    fn edge_push_back(&mut self, edge: EdgeRef);

    fn vertex_clear(&mut self);

    /// A derived vertex, with every face meeting at it.
    fn vertex_push_back(&mut self, vertex: VertexRef, incident: &[FaceId]);
}

/// Registration handle returned by [`Brush::attach_observer`](super::Brush::attach_observer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(pub(crate) u64);

/// A non-owning observer registration.
pub(crate) struct Attachment {
    pub(crate) token: ObserverToken,
    pub(crate) observer: Weak<RefCell<dyn BrushObserver>>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("token", &self.token)
            .field("alive", &(self.observer.strong_count() > 0))
            .finish()
    }
}

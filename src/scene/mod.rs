mod brush_node;
mod entity_node;
mod graph;
mod node;
mod transform;

pub use brush_node::BrushNode;
pub use entity_node::{EntityNode, ORIGIN_KEY};
pub use graph::{GraphObserver, NodeVisitor, SceneGraph};
pub use node::{
    ComponentEditable, PlaneSelectable, RootNode, SceneNode, Selectable, SelectionTestable,
    Transformable,
};
pub use transform::{TransformKind, TransformPhase, TransformState};

slotmap::new_key_type! {
    /// Stable identifier of a node in a [`SceneGraph`].
    pub struct NodeId;

    /// Registration of a [`GraphObserver`].
    pub struct ObserverId;

    /// Registration of a bounds-changed handler.
    pub struct SignalHandlerId;
}

/// Opaque layer tag. Layers filter nodes for display and never affect
/// geometry or ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u32);

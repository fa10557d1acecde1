use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::math::{Aabb, Matrix4, Plane3, Rotation, Vector3};
use crate::render::Renderable;
use crate::selection::{ComponentMode, SelectedPlanes, SelectionTest, Selector};

use super::transform::{TransformKind, TransformPhase};
use super::NodeId;

/// Whole-object selection.
pub trait Selectable {
    fn is_selected(&self) -> bool;

    fn set_selected(&mut self, selected: bool);

    fn invert_selected(&mut self) {
        let selected = self.is_selected();
        self.set_selected(!selected);
    }
}

/// Object-level hit testing.
pub trait SelectionTestable {
    /// Reports at most one hit for the whole node, keyed by `node`.
    fn test_select(&self, node: NodeId, selector: &mut dyn Selector, test: &SelectionTest);
}

/// Face, edge and vertex selection, independent of object selection.
pub trait ComponentEditable {
    /// Returns `true` if any component in any mode is selected.
    fn is_selected_components(&self) -> bool;

    /// Selects or deselects every component of `mode`.
    fn set_selected_components(&mut self, selected: bool, mode: ComponentMode);

    /// Selects or deselects one component.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range for `mode`.
    fn select_component(&mut self, mode: ComponentMode, index: usize, selected: bool) -> Result<()>;

    /// Flips the selection of every component of `mode`.
    fn invert_selected_components(&mut self, mode: ComponentMode);

    /// Reports a hit for every component of `mode` the test touches, in
    /// ascending index order.
    fn test_select_components(
        &self,
        node: NodeId,
        selector: &mut dyn Selector,
        test: &SelectionTest,
        mode: ComponentMode,
    );

    /// Union of the bounds of the selected components.
    fn selected_components_bounds(&self) -> Aabb;

    /// Snaps the geometry under the selected components to `grid`.
    fn snap_components(&mut self, grid: f64);
}

/// Bulk face selection by plane, without per-face hit tests.
pub trait PlaneSelectable {
    /// Selects every face whose plane passes `predicate`, handing each
    /// selected plane to `on_selected`. Returns the number of faces selected.
    fn select_planes(
        &mut self,
        predicate: &dyn Fn(&Plane3) -> bool,
        on_selected: &mut dyn FnMut(&Plane3),
    ) -> usize;

    /// Selects every face whose reversed plane is in `planes`, i.e. faces
    /// touching a selected face of another solid back to back.
    fn select_reversed_planes(&mut self, planes: &SelectedPlanes) -> usize;
}

/// Deferred transforms: preview, then freeze or revert.
pub trait Transformable {
    fn set_translation(&mut self, translation: Vector3);

    fn set_rotation(&mut self, rotation: Rotation);

    fn set_scale(&mut self, scale: Vector3);

    fn set_matrix(&mut self, matrix: Matrix4);

    fn set_type(&mut self, kind: TransformKind);

    /// The pending matrix; identity when nothing is pending.
    fn pending_transform(&self) -> Matrix4;

    fn transform_phase(&self) -> TransformPhase;

    /// Recomputes the working geometry from the base geometry and the
    /// pending matrix. Base geometry is never touched.
    fn evaluate_transform(&mut self);

    /// Commits the working geometry as the new base geometry.
    fn freeze_transform(&mut self);

    /// Drops the pending matrix and working geometry.
    fn revert_transform(&mut self);
}

/// A graph element.
///
/// Capabilities are reached through the `as_*` accessors, which return
/// `None` for capabilities the node lacks.
pub trait SceneNode: fmt::Debug {
    fn name(&self) -> &str;

    /// Bounds of the node's own geometry, excluding children.
    fn local_aabb(&self) -> Aabb;

    /// A copy of the node without its selection state, if the node can be
    /// copied at all.
    fn clone_node(&self) -> Option<Box<dyn SceneNode>> {
        None
    }

    fn on_insert_into_scene(&mut self) {}

    /// Called when the node leaves the graph; clears selection state.
    fn on_remove_from_scene(&mut self) {}

    /// Checks internal consistency of derived state.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvariantViolation`](crate::error::SceneError::InvariantViolation)
    /// describing the inconsistency.
    fn debug_verify(&self) -> Result<()> {
        Ok(())
    }

    fn as_selectable(&self) -> Option<&dyn Selectable> {
        None
    }

    fn as_selectable_mut(&mut self) -> Option<&mut dyn Selectable> {
        None
    }

    fn as_selection_testable(&self) -> Option<&dyn SelectionTestable> {
        None
    }

    fn as_component_editable(&self) -> Option<&dyn ComponentEditable> {
        None
    }

    fn as_component_editable_mut(&mut self) -> Option<&mut dyn ComponentEditable> {
        None
    }

    fn as_plane_selectable_mut(&mut self) -> Option<&mut dyn PlaneSelectable> {
        None
    }

    fn as_transformable(&self) -> Option<&dyn Transformable> {
        None
    }

    fn as_transformable_mut(&mut self) -> Option<&mut dyn Transformable> {
        None
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The node at the top of a scene. Has no geometry and no capabilities.
#[derive(Debug, Clone, Default)]
pub struct RootNode;

impl SceneNode for RootNode {
    fn name(&self) -> &str {
        "root"
    }

    fn local_aabb(&self) -> Aabb {
        Aabb::empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

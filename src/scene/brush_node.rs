use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::brush::{Brush, ComponentInstances, Face, FaceInstance, ObserverToken, Winding};
use crate::error::Result;
use crate::math::{Aabb, Matrix4, Plane3, Point3, Rotation, Vector3};
use crate::render::{Highlight, Renderable, RenderableCollector};
use crate::selection::{
    ComponentMode, Intersection, SelectedPlanes, SelectionTarget, SelectionTest, Selector,
};

use super::node::{
    ComponentEditable, PlaneSelectable, SceneNode, Selectable, SelectionTestable, Transformable,
};
use super::transform::{TransformKind, TransformPhase, TransformState};

/// A brush placed in the scene graph.
///
/// Owns the brush, its derived-index layer and the pending transform. The
/// base brush changes only through explicit edits and
/// [`freeze_transform`](Transformable::freeze_transform); previews live in a
/// separate working copy.
pub struct BrushNode {
    brush: Brush,
    instances: Rc<RefCell<ComponentInstances>>,
    token: ObserverToken,
    selected: bool,
    transform: TransformState,
    working: Option<Brush>,
    clip_plane: Option<Plane3>,
    in_scene: bool,
}

impl BrushNode {
    /// Wraps `brush` and attaches a fresh derived-index layer to it.
    #[must_use]
    pub fn new(mut brush: Brush) -> Self {
        let instances = Rc::new(RefCell::new(ComponentInstances::new()));
        let weak = Rc::downgrade(&instances);
        let token = brush.attach_observer(weak);
        Self {
            brush,
            instances,
            token,
            selected: false,
            transform: TransformState::new(),
            working: None,
            clip_plane: None,
            in_scene: false,
        }
    }

    /// The committed geometry.
    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// The geometry to display: the working copy while a transform is
    /// pending, the base brush otherwise.
    #[must_use]
    pub fn current_brush(&self) -> &Brush {
        self.working.as_ref().unwrap_or(&self.brush)
    }

    /// Edits the base brush; a pending transform is re-evaluated afterwards.
    pub fn edit_brush<R>(&mut self, edit: impl FnOnce(&mut Brush) -> R) -> R {
        let result = edit(&mut self.brush);
        if self.transform.is_pending() {
            self.evaluate_transform();
        }
        result
    }

    /// The derived-index layer.
    #[must_use]
    pub fn instances(&self) -> std::cell::Ref<'_, ComponentInstances> {
        self.instances.borrow()
    }

    #[must_use]
    pub fn is_in_scene(&self) -> bool {
        self.in_scene
    }

    /// Moves the base brush immediately, bypassing the deferred protocol.
    pub fn translate(&mut self, translation: &Vector3) {
        self.edit_brush(|brush| brush.translate(translation));
    }

    /// Snaps every face of the base brush to `grid`.
    pub fn snap_to(&mut self, grid: f64) {
        self.edit_brush(|brush| brush.snap_to(grid));
    }

    /// Sets or clears the clip plane previewed by [`Renderable::render_solid`].
    pub fn set_clip_plane(&mut self, plane: Option<Plane3>) {
        self.clip_plane = plane;
    }

    #[must_use]
    pub fn clip_plane(&self) -> Option<&Plane3> {
        self.clip_plane.as_ref()
    }

    /// The clip plane cut through the current brush, if a clip plane is set.
    #[must_use]
    pub fn clip_winding(&self) -> Option<Winding> {
        let plane = self.clip_plane?;
        let brush = self.current_brush();
        if brush.is_degenerate() {
            return None;
        }
        let config = brush.config();
        let winding = brush.faces().fold(
            Winding::from_plane(&plane, config.world_extent),
            |winding, face| winding.clip(face.plane(), config.plane_epsilon),
        );
        (!winding.is_degenerate()).then_some(winding)
    }

    /// Visits every face instance with its index and face.
    pub fn for_each_face_instance(&self, mut visit: impl FnMut(usize, &FaceInstance, &Face)) {
        let instances = self.instances.borrow();
        let brush = self.current_brush();
        for (index, instance) in instances.faces().iter().enumerate() {
            if let Some(face) = brush.face_by_id(instance.face()) {
                visit(index, instance, face);
            }
        }
    }

    fn highlight(&self) -> Highlight {
        if self.selected {
            Highlight::Selected
        } else {
            Highlight::None
        }
    }
}

impl Clone for BrushNode {
    /// Copies the base geometry; selection and pending transforms are not
    /// copied.
    fn clone(&self) -> Self {
        Self::new(self.brush.clone())
    }
}

impl Drop for BrushNode {
    fn drop(&mut self) {
        self.brush.detach_observer(self.token);
    }
}

impl fmt::Debug for BrushNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrushNode")
            .field("faces", &self.brush.len())
            .field("selected", &self.selected)
            .field("phase", &self.transform.phase())
            .field("in_scene", &self.in_scene)
            .finish_non_exhaustive()
    }
}

impl Selectable for BrushNode {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl SelectionTestable for BrushNode {
    fn test_select(&self, node: super::NodeId, selector: &mut dyn Selector, test: &SelectionTest) {
        let brush = self.current_brush();
        if brush.is_degenerate() || !test.test_aabb(&brush.aabb(), 0.0) {
            return;
        }
        let best = brush
            .faces()
            .filter_map(|face| test.test_polygon(face.winding().points(), face.plane()))
            .reduce(|best, hit| if hit.cmp_rank(&best).is_lt() { hit } else { best });
        if let Some(hit) = best {
            selector.add_intersection(SelectionTarget::Object(node), hit);
        }
    }
}

impl ComponentEditable for BrushNode {
    fn is_selected_components(&self) -> bool {
        self.instances.borrow().is_any_selected()
    }

    fn set_selected_components(&mut self, selected: bool, mode: ComponentMode) {
        self.instances.borrow_mut().set_all_selected(mode, selected);
    }

    fn select_component(&mut self, mode: ComponentMode, index: usize, selected: bool) -> Result<()> {
        self.instances.borrow_mut().set_selected(mode, index, selected)
    }

    fn invert_selected_components(&mut self, mode: ComponentMode) {
        self.instances.borrow_mut().invert_selected(mode);
    }

    fn test_select_components(
        &self,
        node: super::NodeId,
        selector: &mut dyn Selector,
        test: &SelectionTest,
        mode: ComponentMode,
    ) {
        let report = |index: usize, hit: Intersection| {
            selector.add_intersection(SelectionTarget::Component { node, mode, index }, hit);
        };
        self.instances
            .borrow()
            .test_select(self.current_brush(), mode, test, report);
    }

    fn selected_components_bounds(&self) -> Aabb {
        self.instances.borrow().selected_bounds(self.current_brush())
    }

    fn snap_components(&mut self, grid: f64) {
        let indices = self.instances.borrow().transform_face_indices(&self.brush);
        if indices.is_empty() {
            return;
        }
        self.edit_brush(|brush| brush.snap_faces(&indices, grid));
    }
}

impl PlaneSelectable for BrushNode {
    fn select_planes(
        &mut self,
        predicate: &dyn Fn(&Plane3) -> bool,
        on_selected: &mut dyn FnMut(&Plane3),
    ) -> usize {
        let mut indices = Vec::new();
        for (index, face) in self.brush.faces().enumerate() {
            if face.contributes() && predicate(face.plane()) {
                indices.push(index);
                on_selected(face.plane());
            }
        }
        self.instances.borrow_mut().select_faces(&indices)
    }

    fn select_reversed_planes(&mut self, planes: &SelectedPlanes) -> usize {
        let indices: Vec<usize> = self
            .brush
            .faces()
            .enumerate()
            .filter(|(_, face)| face.contributes() && planes.contains(&face.plane().reversed()))
            .map(|(index, _)| index)
            .collect();
        self.instances.borrow_mut().select_faces(&indices)
    }
}

impl Transformable for BrushNode {
    fn set_translation(&mut self, translation: Vector3) {
        self.transform.set_translation(translation);
        self.evaluate_transform();
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.transform.set_rotation(rotation);
        self.evaluate_transform();
    }

    fn set_scale(&mut self, scale: Vector3) {
        self.transform.set_scale(scale);
        self.evaluate_transform();
    }

    fn set_matrix(&mut self, matrix: Matrix4) {
        self.transform.set_matrix(matrix);
        self.evaluate_transform();
    }

    fn set_type(&mut self, kind: TransformKind) {
        self.transform.set_kind(kind);
        if self.transform.is_pending() {
            self.evaluate_transform();
        }
    }

    fn pending_transform(&self) -> Matrix4 {
        self.transform.matrix()
    }

    fn transform_phase(&self) -> TransformPhase {
        self.transform.phase()
    }

    fn evaluate_transform(&mut self) {
        self.instances.borrow_mut().invalidate_caches();
        if !self.transform.is_pending() {
            self.working = None;
            return;
        }
        let matrix = self.transform.matrix();
        let mut working = self.brush.clone();
        let applied = match self.transform.kind() {
            TransformKind::Primitive => working.transform(&matrix),
            TransformKind::Component => {
                let indices = self.instances.borrow().transform_face_indices(&self.brush);
                working.transform_faces(&indices, &matrix)
            }
        };
        if applied {
            self.working = Some(working);
        } else {
            warn!("pending transform is singular, previewing base geometry");
            self.working = None;
        }
    }

    fn freeze_transform(&mut self) {
        if let Some(working) = self.working.take() {
            if let Err(err) = self.brush.assign_faces(&working) {
                error!(%err, "working brush no longer matches base brush");
            }
        }
        if self.transform.freeze() {
            debug!(faces = self.brush.len(), "froze brush transform");
        }
        self.instances.borrow_mut().invalidate_caches();
    }

    fn revert_transform(&mut self) {
        self.working = None;
        self.transform.revert();
        self.instances.borrow_mut().invalidate_caches();
    }
}

impl Renderable for BrushNode {
    fn render_solid(&self, collector: &mut dyn RenderableCollector) {
        let brush = self.current_brush();
        if brush.is_degenerate() {
            return;
        }
        self.for_each_face_instance(|_, instance, face| {
            if !face.contributes() {
                return;
            }
            let highlight = if instance.is_selected() {
                Highlight::ComponentSelected
            } else {
                self.highlight()
            };
            collector.add_polygon(face.winding().points(), face.plane().normal(), highlight);
        });
        if let (Some(plane), Some(winding)) = (self.clip_plane, self.clip_winding()) {
            collector.add_polygon(winding.points(), plane.normal(), Highlight::ClipPlane);
        }
    }

    fn render_wireframe(&self, collector: &mut dyn RenderableCollector) {
        let brush = self.current_brush();
        if brush.is_degenerate() {
            return;
        }
        let segments: Vec<(Point3, Point3)> = brush
            .topology()
            .edges()
            .iter()
            .filter_map(|edge| brush.edge_points(edge))
            .collect();
        collector.add_lines(&segments, self.highlight());
    }

    fn render_components(&self, mode: ComponentMode, collector: &mut dyn RenderableCollector) {
        let brush = self.current_brush();
        if brush.is_degenerate() {
            return;
        }
        let instances = self.instances.borrow();
        let handles: Vec<(Point3, bool)> = match mode {
            ComponentMode::Face => instances
                .faces()
                .iter()
                .filter_map(|i| Some((brush.face_by_id(i.face())?.centroid()?, i.is_selected())))
                .collect(),
            ComponentMode::Edge => instances
                .edges()
                .iter()
                .filter_map(|i| {
                    let (a, b) = brush.edge_points(i.edge())?;
                    Some((nalgebra::center(&a, &b), i.is_selected()))
                })
                .collect(),
            ComponentMode::Vertex => instances
                .vertices()
                .iter()
                .filter_map(|i| Some((brush.vertex_point(i.vertex())?, i.is_selected())))
                .collect(),
        };
        let unselected: Vec<Point3> = handles.iter().filter(|h| !h.1).map(|h| h.0).collect();
        collector.add_points(&unselected, Highlight::None);
        collector.add_points(instances.selected_points(brush), Highlight::ComponentSelected);
    }
}

impl SceneNode for BrushNode {
    fn name(&self) -> &str {
        "Brush"
    }

    fn local_aabb(&self) -> Aabb {
        self.current_brush().aabb()
    }

    fn clone_node(&self) -> Option<Box<dyn SceneNode>> {
        Some(Box::new(self.clone()))
    }

    fn on_insert_into_scene(&mut self) {
        self.in_scene = true;
    }

    fn on_remove_from_scene(&mut self) {
        self.in_scene = false;
        self.selected = false;
        self.instances.borrow_mut().deselect_all();
    }

    fn debug_verify(&self) -> Result<()> {
        self.instances.borrow().verify(&self.brush)
    }

    fn as_selectable(&self) -> Option<&dyn Selectable> {
        Some(self)
    }

    fn as_selectable_mut(&mut self) -> Option<&mut dyn Selectable> {
        Some(self)
    }

    fn as_selection_testable(&self) -> Option<&dyn SelectionTestable> {
        Some(self)
    }

    fn as_component_editable(&self) -> Option<&dyn ComponentEditable> {
        Some(self)
    }

    fn as_component_editable_mut(&mut self) -> Option<&mut dyn ComponentEditable> {
        Some(self)
    }

    fn as_plane_selectable_mut(&mut self) -> Option<&mut dyn PlaneSelectable> {
        Some(self)
    }

    fn as_transformable(&self) -> Option<&dyn Transformable> {
        Some(self)
    }

    fn as_transformable_mut(&mut self) -> Option<&mut dyn Transformable> {
        Some(self)
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    use super::*;
    use crate::config::KernelConfig;
    use crate::render::RecordingCollector;
    use crate::scene::NodeId;
    use crate::selection::SelectionPool;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn cube_node() -> BrushNode {
        BrushNode::new(Brush::cuboid(
            &Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]),
            KernelConfig::default(),
        ))
    }

    fn node_id() -> NodeId {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn plane_bits(brush: &Brush) -> Vec<(u64, [u64; 3])> {
        brush
            .planes()
            .iter()
            .map(|plane| {
                let n = plane.normal();
                (plane.dist().to_bits(), [n.x.to_bits(), n.y.to_bits(), n.z.to_bits()])
            })
            .collect()
    }

    #[test]
    fn new_node_is_synchronized() {
        let node = cube_node();
        node.debug_verify().unwrap();
        assert_eq!(node.instances().len(ComponentMode::Face), 6);
        assert_eq!(node.transform_phase(), TransformPhase::Identity);
    }

    #[test]
    fn evaluate_leaves_base_untouched() {
        let mut node = cube_node();
        let before = plane_bits(node.brush());
        node.set_translation(Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(node.transform_phase(), TransformPhase::Pending);
        assert_eq!(plane_bits(node.brush()), before);
        assert_relative_eq!(node.local_aabb().min.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn repeated_evaluation_equals_final_matrix() {
        let mut node = cube_node();
        node.set_translation(Vector3::new(0.3, 0.0, 0.0));
        node.set_rotation(Rotation::from_axis_angle(&Vector3::z_axis(), 0.7));
        node.set_translation(Vector3::new(2.0, 1.0, 0.0));
        let dragged = plane_bits(node.current_brush());

        let mut fresh = cube_node();
        fresh.set_rotation(Rotation::from_axis_angle(&Vector3::z_axis(), 0.7));
        fresh.set_translation(Vector3::new(2.0, 1.0, 0.0));
        assert_eq!(dragged, plane_bits(fresh.current_brush()));
    }

    #[test]
    fn revert_is_bit_exact() {
        let mut node = cube_node();
        let before = plane_bits(node.brush());
        let windings: Vec<Winding> = node.brush().faces().map(|f| f.winding().clone()).collect();
        for step in 1..10 {
            node.set_rotation(Rotation::from_axis_angle(&Vector3::y_axis(), 0.1 * f64::from(step)));
            node.set_scale(Vector3::new(1.5, 1.0, 0.5));
        }
        node.revert_transform();
        assert_eq!(node.transform_phase(), TransformPhase::Identity);
        assert_eq!(plane_bits(node.current_brush()), before);
        let after: Vec<Winding> = node.brush().faces().map(|f| f.winding().clone()).collect();
        assert_eq!(windings, after);
    }

    #[test]
    fn freeze_commits_working_geometry() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Face, 2, true).unwrap();
        node.set_translation(Vector3::new(0.0, 0.0, 3.0));
        node.freeze_transform();
        assert_eq!(node.transform_phase(), TransformPhase::Frozen);
        assert_eq!(node.pending_transform(), Matrix4::identity());
        assert_relative_eq!(node.brush().aabb().min.z, 3.0, epsilon = 1e-9);
        // Face ids are kept, so face selection survives the freeze
        assert!(node.instances().is_selected(ComponentMode::Face, 2).unwrap());
        node.debug_verify().unwrap();
    }

    #[test]
    fn dragged_vertex_stays_selected_after_freeze() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Vertex, 0, true).unwrap();
        let faces = node.instances().vertices()[0].faces().to_vec();
        node.set_type(TransformKind::Component);
        node.set_translation(Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(node.instances().selected_count(ComponentMode::Vertex), 1);

        node.freeze_transform();
        node.debug_verify().unwrap();
        let instances = node.instances();
        let selected = instances.selected_indices(ComponentMode::Vertex);
        assert_eq!(selected.len(), 1);
        assert_eq!(instances.vertices()[selected[0]].faces(), faces.as_slice());
        let bounds = instances.selected_bounds(node.brush());
        assert_relative_eq!(bounds.max.x, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn dragged_edge_stays_selected_after_freeze() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Edge, 2, true).unwrap();
        node.set_type(TransformKind::Component);
        node.set_translation(Vector3::new(0.0, 0.0, 0.25));
        node.freeze_transform();
        assert_eq!(node.instances().selected_count(ComponentMode::Edge), 1);
        assert_eq!(node.instances().selected_count(ComponentMode::Vertex), 0);
    }

    #[test]
    fn invert_flips_one_mode() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Edge, 0, true).unwrap();
        node.invert_selected_components(ComponentMode::Edge);
        assert_eq!(node.instances().selected_count(ComponentMode::Edge), 11);
        assert_eq!(node.instances().selected_count(ComponentMode::Face), 0);
    }

    #[test]
    fn face_instances_visit_in_order() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Face, 3, true).unwrap();
        let mut visited = Vec::new();
        node.for_each_face_instance(|index, instance, face| {
            visited.push((index, instance.is_selected(), face.winding().len()));
        });
        assert_eq!(visited.len(), 6);
        assert!(visited.iter().enumerate().all(|(i, v)| v.0 == i && v.2 == 4));
        assert_eq!(visited.iter().filter(|v| v.1).count(), 1);
        assert!(visited[3].1);
    }

    #[test]
    fn component_transform_moves_selected_face_only() {
        let mut node = cube_node();
        // +X is face 0
        node.select_component(ComponentMode::Face, 0, true).unwrap();
        node.set_type(TransformKind::Component);
        node.set_translation(Vector3::new(2.0, 0.0, 0.0));
        let aabb = node.local_aabb();
        assert_relative_eq!(aabb.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(aabb.max.x, 3.0, epsilon = 1e-9);
        let bounds = node.selected_components_bounds();
        assert_relative_eq!(bounds.min.x, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_preview_falls_back_to_base() {
        let mut node = cube_node();
        node.set_scale(Vector3::new(1.0, 0.0, 1.0));
        assert_eq!(node.transform_phase(), TransformPhase::Pending);
        assert_relative_eq!(node.local_aabb().max.y, 1.0, epsilon = 1e-9);
        node.freeze_transform();
        assert_relative_eq!(node.brush().aabb().max.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn object_hit_is_nearest_face() {
        let node = cube_node();
        let id = node_id();
        let mut pool = SelectionPool::new();
        let test = SelectionTest::ray(p(0.5, 0.5, 4.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        node.test_select(id, &mut pool, &test);
        assert_eq!(pool.len(), 1);
        let (target, hit) = pool.best().unwrap();
        assert_eq!(target, SelectionTarget::Object(id));
        assert_relative_eq!(hit.depth, 3.0, epsilon = 1e-9);

        let miss = SelectionTest::ray(p(5.0, 5.0, 4.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        let mut pool = SelectionPool::new();
        node.test_select(id, &mut pool, &miss);
        assert!(pool.is_empty());
    }

    #[test]
    fn component_selection_is_independent_of_object_selection() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Face, 1, true).unwrap();
        assert!(!node.is_selected());
        assert!(node.is_selected_components());
        assert_eq!(node.instances().selected_count(ComponentMode::Edge), 0);

        node.set_selected(true);
        node.set_selected_components(false, ComponentMode::Face);
        assert!(node.is_selected());
        assert!(!node.is_selected_components());
    }

    #[test]
    fn vertex_hits_tie_break_by_index() {
        let node = cube_node();
        let id = node_id();
        let mut pool = SelectionPool::new();
        // Looking straight down the +X/+Y vertical edge: both its vertices
        // are on the ray, at different depths
        let test = SelectionTest::ray(p(1.0, 1.0, 5.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        node.test_select_components(id, &mut pool, &test, ComponentMode::Vertex);
        assert_eq!(pool.len(), 2);
        let (_, first) = pool.ranked()[0];
        assert_relative_eq!(first.depth, 4.0, epsilon = 1e-9);

        // A volume hit has depth zero for every vertex: lowest index wins
        let mut pool = SelectionPool::new();
        let volume = SelectionTest::volume(Aabb::from_points(&[p(-1.0, -1.0, -1.0), p(2.0, 2.0, 2.0)]));
        node.test_select_components(id, &mut pool, &volume, ComponentMode::Vertex);
        assert_eq!(pool.len(), 8);
        assert!(matches!(
            pool.best().unwrap().0,
            SelectionTarget::Component { index: 0, .. }
        ));
    }

    #[test]
    fn select_planes_by_predicate() {
        let mut node = cube_node();
        let mut seen = Vec::new();
        let count = node.select_planes(&|plane| plane.normal().z.abs() > 0.5, &mut |plane| seen.push(*plane));
        assert_eq!(count, 2);
        assert_eq!(seen.len(), 2);
        assert_eq!(node.instances().selected_indices(ComponentMode::Face), vec![4, 5]);
    }

    #[test]
    fn select_reversed_planes_picks_touching_faces() {
        let mut node = cube_node();
        let mut neighbour_top = SelectedPlanes::new(1e-6);
        // The face of a cube sitting on top of this one, facing down
        neighbour_top.insert(Plane3::new(-Vector3::z(), -1.0).unwrap());
        assert_eq!(node.select_reversed_planes(&neighbour_top), 1);
        assert_eq!(node.instances().selected_indices(ComponentMode::Face), vec![4]);
    }

    #[test]
    fn removal_clears_all_selection() {
        let mut node = cube_node();
        node.on_insert_into_scene();
        node.set_selected(true);
        node.select_component(ComponentMode::Vertex, 3, true).unwrap();
        node.on_remove_from_scene();
        assert!(!node.is_in_scene());
        assert!(!node.is_selected());
        assert!(!node.is_selected_components());
    }

    #[test]
    fn clone_copies_geometry_not_selection() {
        let mut node = cube_node();
        node.set_selected(true);
        node.select_component(ComponentMode::Face, 0, true).unwrap();
        let copy = node.clone();
        assert!(!copy.is_selected());
        assert!(!copy.is_selected_components());
        assert_eq!(copy.brush().planes(), node.brush().planes());
        copy.debug_verify().unwrap();
        node.debug_verify().unwrap();
    }

    #[test]
    fn snap_components_moves_selected_faces() {
        let mut node = BrushNode::new(Brush::cuboid(
            &Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.3, 1.3, 1.3)]),
            KernelConfig::default(),
        ));
        node.select_component(ComponentMode::Face, 0, true).unwrap();
        node.snap_components(1.0);
        let aabb = node.brush().aabb();
        assert_relative_eq!(aabb.max.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(aabb.max.y, 1.3, epsilon = 1e-9);
    }

    #[test]
    fn rendering_reports_polygons_and_clip_plane() {
        let mut node = cube_node();
        node.select_component(ComponentMode::Face, 0, true).unwrap();
        node.set_clip_plane(Some(Plane3::new(Vector3::x(), 0.5).unwrap()));

        let mut collector = RecordingCollector::default();
        node.render_solid(&mut collector);
        assert_eq!(collector.polygons.len(), 7);
        assert_eq!(collector.polygons[0].2, Highlight::ComponentSelected);
        assert_eq!(collector.polygons[6].2, Highlight::ClipPlane);
        assert_eq!(collector.polygons[6].0.len(), 4);

        let mut collector = RecordingCollector::default();
        node.render_wireframe(&mut collector);
        assert_eq!(collector.lines.len(), 12);

        let mut collector = RecordingCollector::default();
        node.render_components(ComponentMode::Face, &mut collector);
        let unselected = collector.points.iter().filter(|p| p.1 == Highlight::None).count();
        let selected = collector.points.iter().filter(|p| p.1 == Highlight::ComponentSelected).count();
        assert_eq!(unselected, 5);
        // Winding points of the selected face
        assert_eq!(selected, 4);
    }

    #[test]
    fn degenerate_brush_renders_and_selects_nothing() {
        let mut brush = Brush::cuboid(
            &Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]),
            KernelConfig::default(),
        );
        brush.remove_last_face();
        brush.remove_last_face();
        brush.remove_last_face();
        let node = BrushNode::new(brush);
        let mut collector = RecordingCollector::default();
        node.render_solid(&mut collector);
        assert!(collector.polygons.is_empty());

        let mut pool = SelectionPool::new();
        let test = SelectionTest::ray(p(0.5, 0.5, 4.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        node.test_select(node_id(), &mut pool, &test);
        assert!(pool.is_empty());
    }
}

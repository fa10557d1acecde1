use tracing::trace;

use crate::cache::Cached;
use crate::error::{IndexError, Result, SceneError};
use crate::math::{Aabb, Point3};
use crate::selection::{ComponentMode, Intersection, SelectionTest};

use super::face::{Face, FaceId};
use super::observer::BrushObserver;
use super::topology::{EdgeRef, VertexRef};
use super::Brush;

/// Selection state of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceInstance {
    face: FaceId,
    selected: bool,
}

impl FaceInstance {
    #[must_use]
    pub fn face(&self) -> FaceId {
        self.face
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Ray hits where the ray crosses the face polygon.
    #[must_use]
    pub fn test_select(&self, brush: &Brush, test: &SelectionTest) -> Option<Intersection> {
        let face = brush.face_by_id(self.face)?;
        test.test_polygon(face.winding().points(), face.plane())
    }
}

/// Selection state of one derived edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeInstance {
    edge: EdgeRef,
    selected: bool,
}

impl EdgeInstance {
    #[must_use]
    pub fn edge(&self) -> &EdgeRef {
        &self.edge
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    #[must_use]
    pub fn test_select(&self, brush: &Brush, test: &SelectionTest) -> Option<Intersection> {
        let (a, b) = brush.edge_points(&self.edge)?;
        test.test_segment(&a, &b, test.radius(brush.config()))
    }
}

/// Selection state of one derived vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInstance {
    vertex: VertexRef,
    faces: Vec<FaceId>,
    selected: bool,
}

impl VertexInstance {
    #[must_use]
    pub fn vertex(&self) -> &VertexRef {
        &self.vertex
    }

    /// Faces meeting at the vertex, sorted by id.
    #[must_use]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    #[must_use]
    pub fn test_select(&self, brush: &Brush, test: &SelectionTest) -> Option<Intersection> {
        let point = brush.vertex_point(&self.vertex)?;
        test.test_point(&point, test.radius(brush.config()))
    }
}

/// The derived-index layer of one brush.
///
/// Face instances follow the brush's face list one to one, so face selection
/// survives windings being rebuilt. Edge and vertex instances are replaced
/// on every connectivity change; a new edge stays selected if a selected
/// edge joined the same two faces, and a new vertex if a selected vertex had
/// the same incident faces.
#[derive(Debug, Default)]
pub struct ComponentInstances {
    faces: Vec<FaceInstance>,
    edges: Vec<EdgeInstance>,
    vertices: Vec<VertexInstance>,
    carried_edges: Vec<(FaceId, FaceId)>,
    carried_vertices: Vec<Vec<FaceId>>,
    selected_bounds: Cached<Aabb>,
    selected_points: Cached<Vec<Point3>>,
}

impl ComponentInstances {
    /// Creates an empty layer; attach it to a brush to populate it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn faces(&self) -> &[FaceInstance] {
        &self.faces
    }

    #[must_use]
    pub fn edges(&self) -> &[EdgeInstance] {
        &self.edges
    }

    #[must_use]
    pub fn vertices(&self) -> &[VertexInstance] {
        &self.vertices
    }

    /// Number of instances for `mode`.
    #[must_use]
    pub fn len(&self, mode: ComponentMode) -> usize {
        match mode {
            ComponentMode::Face => self.faces.len(),
            ComponentMode::Edge => self.edges.len(),
            ComponentMode::Vertex => self.vertices.len(),
        }
    }

    /// Returns `true` if there are no face instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// # Errors
    ///
    /// Returns an error if `index` is out of range for `mode`.
    pub fn is_selected(&self, mode: ComponentMode, index: usize) -> Result<bool> {
        self.selection_flags(mode)
            .nth(index)
            .ok_or_else(|| self.component_error(mode, index).into())
    }

    /// Selects or deselects one component.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range for `mode`. Indices are
    /// never clamped.
    pub fn set_selected(&mut self, mode: ComponentMode, index: usize, selected: bool) -> Result<()> {
        let error = self.component_error(mode, index);
        let flag = match mode {
            ComponentMode::Face => self.faces.get_mut(index).map(|i| &mut i.selected),
            ComponentMode::Edge => self.edges.get_mut(index).map(|i| &mut i.selected),
            ComponentMode::Vertex => self.vertices.get_mut(index).map(|i| &mut i.selected),
        }
        .ok_or(error)?;
        if *flag != selected {
            *flag = selected;
            self.invalidate_caches();
        }
        Ok(())
    }

    /// Selects or deselects every component of `mode`.
    pub fn set_all_selected(&mut self, mode: ComponentMode, selected: bool) {
        match mode {
            ComponentMode::Face => self.faces.iter_mut().for_each(|i| i.selected = selected),
            ComponentMode::Edge => self.edges.iter_mut().for_each(|i| i.selected = selected),
            ComponentMode::Vertex => self.vertices.iter_mut().for_each(|i| i.selected = selected),
        }
        self.invalidate_caches();
    }

    /// Selects the faces at `indices`, skipping out-of-range ones. Returns the
    /// number of faces that were not selected before.
    pub fn select_faces(&mut self, indices: &[usize]) -> usize {
        let mut count = 0;
        for &index in indices {
            if let Some(instance) = self.faces.get_mut(index) {
                count += usize::from(!instance.selected);
                instance.selected = true;
            }
        }
        if count > 0 {
            self.invalidate_caches();
        }
        count
    }

    /// Deselects every component in every mode.
    pub fn deselect_all(&mut self) {
        for mode in ComponentMode::ALL {
            self.set_all_selected(mode, false);
        }
    }

    /// Flips the selection of every component of `mode`.
    pub fn invert_selected(&mut self, mode: ComponentMode) {
        match mode {
            ComponentMode::Face => self.faces.iter_mut().for_each(|i| i.selected = !i.selected),
            ComponentMode::Edge => self.edges.iter_mut().for_each(|i| i.selected = !i.selected),
            ComponentMode::Vertex => self.vertices.iter_mut().for_each(|i| i.selected = !i.selected),
        }
        self.invalidate_caches();
    }

    /// Number of selected components of `mode`.
    #[must_use]
    pub fn selected_count(&self, mode: ComponentMode) -> usize {
        self.selection_flags(mode).filter(|&s| s).count()
    }

    /// Indices of the selected components of `mode`, ascending.
    #[must_use]
    pub fn selected_indices(&self, mode: ComponentMode) -> Vec<usize> {
        self.selection_flags(mode)
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect()
    }

    /// Returns `true` if any component in any mode is selected.
    #[must_use]
    pub fn is_any_selected(&self) -> bool {
        ComponentMode::ALL
            .into_iter()
            .any(|mode| self.selection_flags(mode).any(|s| s))
    }

    /// Marks the selected-bounds and selected-points caches dirty.
    pub fn invalidate_caches(&mut self) {
        self.selected_bounds.invalidate();
        self.selected_points.invalidate();
    }

    /// Points of every selected component, in face, edge, vertex order.
    pub fn selected_points(&self, brush: &Brush) -> &[Point3] {
        self.selected_points.get_or_compute(|| {
            let mut points = Vec::new();
            for instance in self.faces.iter().filter(|i| i.selected) {
                if let Some(face) = brush.face_by_id(instance.face) {
                    points.extend_from_slice(face.winding().points());
                }
            }
            for instance in self.edges.iter().filter(|i| i.selected) {
                if let Some((a, b)) = brush.edge_points(&instance.edge) {
                    points.extend([a, b]);
                }
            }
            for instance in self.vertices.iter().filter(|i| i.selected) {
                points.extend(brush.vertex_point(&instance.vertex));
            }
            points
        })
    }

    /// Union of the bounds of the selected components only.
    ///
    /// Cached until the next selection or connectivity change.
    pub fn selected_bounds(&self, brush: &Brush) -> Aabb {
        *self
            .selected_bounds
            .get_or_compute(|| Aabb::from_points(self.selected_points(brush)))
    }

    /// Indices of the faces a component transform moves.
    ///
    /// Selected faces move themselves; a selected edge moves its two faces; a
    /// selected vertex moves every face whose winding passes through it.
    #[must_use]
    pub fn transform_face_indices(&self, brush: &Brush) -> Vec<usize> {
        let mut indices: Vec<usize> = Vec::new();
        for (index, instance) in self.faces.iter().enumerate() {
            if instance.selected {
                indices.push(index);
            }
        }
        for instance in self.edges.iter().filter(|i| i.selected) {
            indices.extend(brush.index_of(instance.edge.face));
            indices.extend(brush.index_of(instance.edge.adjacent));
        }
        for instance in self.vertices.iter().filter(|i| i.selected) {
            indices.extend(instance.faces.iter().filter_map(|&id| brush.index_of(id)));
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Hit-tests every instance of `mode`, reporting `(index, hit)` in
    /// ascending index order.
    pub fn test_select(
        &self,
        brush: &Brush,
        mode: ComponentMode,
        test: &SelectionTest,
        mut report: impl FnMut(usize, Intersection),
    ) {
        if brush.is_degenerate() {
            return;
        }
        match mode {
            ComponentMode::Face => {
                for (index, instance) in self.faces.iter().enumerate() {
                    if let Some(hit) = instance.test_select(brush, test) {
                        report(index, hit);
                    }
                }
            }
            ComponentMode::Edge => {
                for (index, instance) in self.edges.iter().enumerate() {
                    if let Some(hit) = instance.test_select(brush, test) {
                        report(index, hit);
                    }
                }
            }
            ComponentMode::Vertex => {
                for (index, instance) in self.vertices.iter().enumerate() {
                    if let Some(hit) = instance.test_select(brush, test) {
                        report(index, hit);
                    }
                }
            }
        }
    }

    /// Checks that the layer matches `brush` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvariantViolation`] describing the first
    /// mismatch.
    pub fn verify(&self, brush: &Brush) -> Result<()> {
        if self.faces.len() != brush.len() {
            return Err(violation(format!(
                "{} face instances for {} faces",
                self.faces.len(),
                brush.len()
            )));
        }
        if let Some((index, _)) = self
            .faces
            .iter()
            .zip(brush.face_ids())
            .enumerate()
            .find(|(_, (instance, &id))| instance.face != id)
        {
            return Err(violation(format!("face instance {index} refers to another face")));
        }
        let topology = brush.topology();
        if !self.edges.iter().map(|i| &i.edge).eq(topology.edges()) {
            return Err(violation(format!(
                "{} edge instances for {} edges",
                self.edges.len(),
                topology.edges().len()
            )));
        }
        let vertices_match = self.vertices.len() == topology.vertices().len()
            && self.vertices.iter().enumerate().all(|(index, instance)| {
                let mut faces = topology.incident_faces(index).to_vec();
                faces.sort_unstable();
                instance.vertex == topology.vertices()[index] && instance.faces == faces
            });
        if !vertices_match {
            return Err(violation(format!(
                "{} vertex instances for {} vertices",
                self.vertices.len(),
                topology.vertices().len()
            )));
        }
        Ok(())
    }

    fn selection_flags(&self, mode: ComponentMode) -> Box<dyn Iterator<Item = bool> + '_> {
        match mode {
            ComponentMode::Face => Box::new(self.faces.iter().map(|i| i.selected)),
            ComponentMode::Edge => Box::new(self.edges.iter().map(|i| i.selected)),
            ComponentMode::Vertex => Box::new(self.vertices.iter().map(|i| i.selected)),
        }
    }

    fn component_error(&self, mode: ComponentMode, index: usize) -> IndexError {
        IndexError::ComponentIndex {
            mode,
            index,
            len: self.len(mode),
        }
    }
}

fn violation(message: String) -> crate::error::BrushworkError {
    SceneError::InvariantViolation(message).into()
}

impl BrushObserver for ComponentInstances {
    fn clear(&mut self) {
        self.faces.clear();
        self.invalidate_caches();
    }

    fn reserve(&mut self, additional: usize) {
        self.faces.reserve(additional);
    }

    fn push_back(&mut self, face: FaceId) {
        self.faces.push(FaceInstance {
            face,
            selected: false,
        });
    }

    fn pop_back(&mut self) {
        if self.faces.pop().is_some_and(|i| i.selected) {
            self.invalidate_caches();
        }
    }

    fn erase(&mut self, index: usize) {
        if index < self.faces.len() {
            self.faces.remove(index);
        }
        self.invalidate_caches();
    }

    fn connectivity_changed(&mut self) {
        trace!(faces = self.faces.len(), "resync component instances");
        self.invalidate_caches();
    }

    fn winding_changed(&mut self, index: usize, _face: &Face) {
        if self.faces.get(index).is_some_and(|i| i.selected) {
            self.invalidate_caches();
        }
    }

    fn edge_clear(&mut self) {
        self.carried_edges = self
            .edges
            .drain(..)
            .filter(|i| i.selected)
            .map(|i| i.edge.face_pair())
            .collect();
    }

    fn edge_push_back(&mut self, edge: EdgeRef) {
        let selected = self.carried_edges.contains(&edge.face_pair());
        self.edges.push(EdgeInstance { edge, selected });
    }

    fn vertex_clear(&mut self) {
        self.carried_vertices = self
            .vertices
            .drain(..)
            .filter(|i| i.selected)
            .map(|i| i.faces)
            .collect();
    }

    fn vertex_push_back(&mut self, vertex: VertexRef, incident: &[FaceId]) {
        let mut faces = incident.to_vec();
        faces.sort_unstable();
        let selected = self.carried_vertices.contains(&faces);
        self.vertices.push(VertexInstance {
            vertex,
            faces,
            selected,
        });
    }
}

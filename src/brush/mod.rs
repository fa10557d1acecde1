mod face;
mod instances;
mod observer;
mod texture;
mod topology;
mod winding;

pub use face::{Face, FaceId};
pub use instances::{ComponentInstances, EdgeInstance, FaceInstance, VertexInstance};
pub use observer::{BrushObserver, ObserverToken};
pub use texture::{tangent_axes, TextureProjection, DEFAULT_MATERIAL};
pub use topology::{EdgeRef, Topology, VertexRef};
pub use winding::{build_winding, Winding};

use std::cell::RefCell;
use std::rc::Weak;

use slotmap::SlotMap;
use tracing::{error, trace, warn};

use crate::cache::Cached;
use crate::config::KernelConfig;
use crate::error::{IndexError, Result};
use crate::math::{Aabb, Matrix4, Plane3, Point3, Vector3};

use self::observer::Attachment;

/// Minimum number of contributing faces for a brush to enclose a volume.
pub const MIN_SOLID_FACES: usize = 4;

/// A convex solid: the intersection of the half-spaces behind its faces.
///
/// Face order is declaration order. Faces whose windings are clipped away
/// stay in the list but contribute no geometry. Structural edits are
/// mirrored to an attached [`BrushObserver`] before they return.
#[derive(Debug)]
pub struct Brush {
    config: KernelConfig,
    faces: SlotMap<FaceId, Face>,
    order: Vec<FaceId>,
    topology: Topology,
    bounds: Cached<Aabb>,
    observer: Option<Attachment>,
    next_token: u64,
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Clone for Brush {
    /// Copies the geometry. The observer registration stays with `self`.
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            faces: self.faces.clone(),
            order: self.order.clone(),
            topology: self.topology.clone(),
            bounds: Cached::new(),
            observer: None,
            next_token: 0,
        }
    }
}

impl Brush {
    /// Creates an empty brush.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            faces: SlotMap::with_key(),
            order: Vec::new(),
            topology: Topology::default(),
            bounds: Cached::new(),
            observer: None,
            next_token: 0,
        }
    }

    /// Creates a brush with one default-textured face per plane.
    #[must_use]
    pub fn from_planes(planes: impl IntoIterator<Item = Plane3>, config: KernelConfig) -> Self {
        let mut brush = Self::new(config);
        for plane in planes {
            let id = brush.faces.insert(Face::new(plane));
            brush.order.push(id);
        }
        brush.rebuild_all();
        brush
    }

    /// Creates an axis-aligned box brush.
    ///
    /// Faces are declared in the order +X, -X, +Y, -Y, +Z, -Z.
    #[must_use]
    pub fn cuboid(bounds: &Aabb, config: KernelConfig) -> Self {
        let planes = [
            Plane3::from_unit_normal(Vector3::x(), bounds.max.x),
            Plane3::from_unit_normal(-Vector3::x(), -bounds.min.x),
            Plane3::from_unit_normal(Vector3::y(), bounds.max.y),
            Plane3::from_unit_normal(-Vector3::y(), -bounds.min.y),
            Plane3::from_unit_normal(Vector3::z(), bounds.max.z),
            Plane3::from_unit_normal(-Vector3::z(), -bounds.min.z),
        ];
        Self::from_planes(planes, config)
    }

    /// The configuration this brush was created with.
    #[must_use]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of faces, including degenerate ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the brush has no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The face at `index` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn face(&self, index: usize) -> Result<&Face> {
        let id = self.face_id(index)?;
        self.faces
            .get(id)
            .ok_or_else(|| self.index_error(index).into())
    }

    /// The stable id of the face at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn face_id(&self, index: usize) -> Result<FaceId> {
        self.order
            .get(index)
            .copied()
            .ok_or_else(|| self.index_error(index).into())
    }

    /// Looks a face up by id.
    #[must_use]
    pub fn face_by_id(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    /// Declaration index of the face with the given id.
    #[must_use]
    pub fn index_of(&self, id: FaceId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// Face ids in declaration order.
    #[must_use]
    pub fn face_ids(&self) -> &[FaceId] {
        &self.order
    }

    /// Faces in declaration order.
    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.order.iter().filter_map(|&id| self.faces.get(id))
    }

    /// Planes in declaration order.
    #[must_use]
    pub fn planes(&self) -> Vec<Plane3> {
        self.faces().map(|face| *face.plane()).collect()
    }

    /// Derived edges and vertices.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Endpoints of a derived edge.
    #[must_use]
    pub fn edge_points(&self, edge: &EdgeRef) -> Option<(Point3, Point3)> {
        let points = self.faces.get(edge.face)?.winding().points();
        let n = points.len();
        if edge.local >= n {
            return None;
        }
        Some((points[edge.local], points[(edge.local + 1) % n]))
    }

    /// Position of a derived vertex.
    #[must_use]
    pub fn vertex_point(&self, vertex: &VertexRef) -> Option<Point3> {
        self.faces
            .get(vertex.face)?
            .winding()
            .points()
            .get(vertex.local)
            .copied()
    }

    /// Bounding box of every winding; empty for degenerate brushes.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        *self.bounds.get_or_compute(|| {
            if self.is_degenerate() {
                return Aabb::empty();
            }
            self.faces()
                .fold(Aabb::empty(), |acc, face| acc.union(&face.winding().aabb()))
        })
    }

    /// Number of faces with a non-degenerate winding.
    #[must_use]
    pub fn contributing_faces(&self) -> usize {
        self.faces().filter(|face| face.contributes()).count()
    }

    /// Returns `true` if the brush cannot enclose a volume.
    ///
    /// Degenerate brushes render nothing and never pass selection tests.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.contributing_faces() < MIN_SOLID_FACES
    }

    /// Returns `true` if every winding edge is shared by exactly two faces.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.is_degenerate() && self.topology.open_edges() == 0
    }

    /// Returns `true` if `point` lies inside or on the solid.
    #[must_use]
    pub fn contains_point(&self, point: &Point3) -> bool {
        !self.is_degenerate()
            && self
                .faces()
                .all(|face| face.plane().distance_to(point) <= self.config.plane_epsilon)
    }

    // --- Observer registration ---

    /// Registers the observer and replays the current faces and topology to
    /// it, so it starts synchronized. Replaces any previous registration.
    pub fn attach_observer(&mut self, observer: Weak<RefCell<dyn BrushObserver>>) -> ObserverToken {
        if let Some(previous) = self.observer.take() {
            warn!(token = previous.token.0, "replacing attached brush observer");
        }
        let token = ObserverToken(self.next_token);
        self.next_token += 1;
        self.observer = Some(Attachment { token, observer });

        self.notify(|o| {
            o.clear();
            o.reserve(self.order.len());
        });
        for &id in &self.order {
            self.notify(|o| o.push_back(id));
        }
        self.replay_connectivity();
        token
    }

    /// Unregisters the observer. Unknown or stale tokens are ignored.
    pub fn detach_observer(&mut self, token: ObserverToken) {
        if self.observer.as_ref().is_some_and(|a| a.token == token) {
            self.observer = None;
        }
    }

    /// Returns `true` if a live observer is attached.
    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|a| a.observer.strong_count() > 0)
    }

    // --- Structural operations ---

    /// Removes every face.
    pub fn clear(&mut self) {
        trace!(faces = self.order.len(), "clear brush");
        self.faces.clear();
        self.order.clear();
        self.notify(|o| o.clear());
        self.rebuild_all();
    }

    /// Reserves room for `additional` faces.
    pub fn reserve(&mut self, additional: usize) {
        self.order.reserve(additional);
        self.faces.reserve(additional);
        self.notify(|o| o.reserve(additional));
    }

    /// Appends a face and rebuilds every winding.
    pub fn append_face(&mut self, face: Face) -> FaceId {
        let id = self.faces.insert(face);
        self.order.push(id);
        trace!(index = self.order.len() - 1, "append face");
        self.notify(|o| o.push_back(id));
        self.rebuild_all();
        id
    }

    /// Removes the last face and rebuilds every winding.
    pub fn remove_last_face(&mut self) -> Option<Face> {
        let id = self.order.pop()?;
        let face = self.faces.remove(id);
        trace!(index = self.order.len(), "remove last face");
        self.notify(|o| o.pop_back());
        self.rebuild_all();
        face
    }

    /// Removes the face at `index` and rebuilds every winding.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn erase_face(&mut self, index: usize) -> Result<Face> {
        if index >= self.order.len() {
            return Err(self.index_error(index).into());
        }
        let id = self.order.remove(index);
        let face = self
            .faces
            .remove(id)
            .ok_or_else(|| self.index_error(index))?;
        trace!(index, "erase face");
        self.notify(|o| o.erase(index));
        self.rebuild_all();
        Ok(face)
    }

    /// Rebuilds every winding and the derived topology without changing the
    /// face list.
    pub fn connectivity_changed(&mut self) {
        self.rebuild_all();
    }

    /// Replaces the plane of one face.
    ///
    /// Only windings the old or the new plane can touch are recomputed: the
    /// edited face, degenerate faces, and faces with a point on or in front of
    /// either plane. Every other winding was strictly behind both planes and
    /// cannot change.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn set_face_plane(&mut self, index: usize, plane: Plane3) -> Result<()> {
        let id = self.face_id(index)?;
        let old = *self.face(index)?.plane();
        let eps = self.config.plane_epsilon;

        let affected: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|&(position, &other)| {
                position == index
                    || self.faces.get(other).is_none_or(|face| {
                        let winding = face.winding();
                        winding.is_degenerate()
                            || winding.points().iter().any(|p| {
                                old.distance_to(p) >= -eps || plane.distance_to(p) >= -eps
                            })
                    })
            })
            .map(|(position, _)| position)
            .collect();

        if let Some(face) = self.faces.get_mut(id) {
            face.set_plane(plane);
        }
        trace!(index, affected = affected.len(), "set face plane");
        self.rebuild_windings(&affected);
        self.topology
            .update(&self.faces, &self.order, &affected, self.config.point_epsilon);
        self.bounds.invalidate();
        self.replay_connectivity();
        Ok(())
    }

    /// Replaces the texture projection of one face. Geometry is unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn set_face_texture(&mut self, index: usize, texture: TextureProjection) -> Result<()> {
        let id = self.face_id(index)?;
        if let Some(face) = self.faces.get_mut(id) {
            face.set_texture(texture);
        }
        Ok(())
    }

    /// Copies planes and textures from `source`, index by index.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` has a different number of faces.
    pub fn assign_faces(&mut self, source: &Brush) -> Result<()> {
        if source.len() != self.len() {
            return Err(IndexError::PlaneCount {
                expected: self.len(),
                actual: source.len(),
            }
            .into());
        }
        for (&id, other) in self.order.iter().zip(source.faces()) {
            if let Some(face) = self.faces.get_mut(id) {
                face.set_plane(*other.plane());
                face.set_texture(other.texture().clone());
            }
        }
        self.rebuild_all();
        Ok(())
    }

    /// Moves every face by `translation`.
    pub fn translate(&mut self, translation: &Vector3) {
        let lock = self.config.texture_lock;
        for face in self.faces.values_mut() {
            face.translate(translation, lock);
        }
        self.rebuild_all();
    }

    /// Transforms every face. See [`Brush::transform_faces`].
    pub fn transform(&mut self, matrix: &Matrix4) -> bool {
        let all: Vec<usize> = (0..self.order.len()).collect();
        self.transform_faces(&all, matrix)
    }

    /// Transforms the planes of the faces at `indices`.
    ///
    /// Out-of-range indices are skipped. Returns `false` and leaves the brush
    /// untouched if the matrix is singular.
    pub fn transform_faces(&mut self, indices: &[usize], matrix: &Matrix4) -> bool {
        let lock = self.config.texture_lock;
        let mut updated = Vec::with_capacity(indices.len());
        for &index in indices {
            let Some(face) = self.order.get(index).and_then(|&id| self.faces.get(id)) else {
                continue;
            };
            let mut face = face.clone();
            if !face.transform(matrix, lock) {
                warn!(index, "singular transform ignored");
                return false;
            }
            updated.push((self.order[index], face));
        }
        for (id, face) in updated {
            if let Some(slot) = self.faces.get_mut(id) {
                *slot = face;
            }
        }
        self.rebuild_all();
        true
    }

    /// Snaps every face to `grid`.
    pub fn snap_to(&mut self, grid: f64) {
        let all: Vec<usize> = (0..self.order.len()).collect();
        self.snap_faces(&all, grid);
    }

    /// Snaps the faces at `indices` to `grid`; faces that cannot be refitted
    /// keep their plane.
    pub fn snap_faces(&mut self, indices: &[usize], grid: f64) {
        let mut changed = false;
        for &index in indices {
            let Some(&id) = self.order.get(index) else {
                continue;
            };
            if let Some(face) = self.faces.get_mut(id) {
                changed |= face.snap_to(grid);
            }
        }
        if changed {
            self.rebuild_all();
        }
    }

    // --- Internal ---

    fn index_error(&self, index: usize) -> IndexError {
        IndexError::FaceIndex {
            index,
            len: self.order.len(),
        }
    }

    fn notify(&self, f: impl FnOnce(&mut dyn BrushObserver)) {
        let Some(attachment) = &self.observer else {
            return;
        };
        let Some(observer) = attachment.observer.upgrade() else {
            return;
        };
        let borrowed = observer.try_borrow_mut();
        match borrowed {
            Ok(mut observer) => f(&mut *observer),
            Err(_) => error!("brush observer is already borrowed, notification dropped"),
        }
    }

    fn rebuild_all(&mut self) {
        let all: Vec<usize> = (0..self.order.len()).collect();
        self.rebuild_windings(&all);
        self.update_connectivity();
    }

    fn rebuild_windings(&mut self, indices: &[usize]) {
        let planes = self.planes();
        for &index in indices {
            let Some(&id) = self.order.get(index) else {
                continue;
            };
            let winding = build_winding(&planes, index, &self.config);
            if let Some(face) = self.faces.get_mut(id) {
                face.set_winding(winding);
            }
            if let Some(face) = self.faces.get(id) {
                self.notify(|o| o.winding_changed(index, face));
            }
        }
        self.bounds.invalidate();
    }

    fn update_connectivity(&mut self) {
        self.topology = Topology::derive(&self.faces, &self.order, self.config.point_epsilon);
        self.bounds.invalidate();
        self.replay_connectivity();
    }

    fn replay_connectivity(&self) {
        self.notify(|o| {
            o.connectivity_changed();
            o.edge_clear();
            for &edge in self.topology.edges() {
                o.edge_push_back(edge);
            }
            o.vertex_clear();
            for (index, &vertex) in self.topology.vertices().iter().enumerate() {
                o.vertex_push_back(vertex, self.topology.incident_faces(index));
            }
        });
    }
}

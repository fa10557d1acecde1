use slotmap::{SecondaryMap, SlotMap};

use crate::math::Point3;

use super::face::{Face, FaceId};

/// An edge shared by two faces, addressed through the first face's winding.
///
/// `local` is the index of the edge's start point in `face`'s winding; the
/// end point is the next point around the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRef {
    /// Face whose winding the edge is read from.
    pub face: FaceId,
    /// Start point index within that winding.
    pub local: usize,
    /// The other face sharing both endpoints.
    pub adjacent: FaceId,
}

impl EdgeRef {
    /// The two faces meeting at the edge, lower id first.
    #[must_use]
    pub fn face_pair(&self) -> (FaceId, FaceId) {
        if self.face <= self.adjacent {
            (self.face, self.adjacent)
        } else {
            (self.adjacent, self.face)
        }
    }
}

/// A corner where at least three face windings meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    /// Face whose winding the vertex is read from.
    pub face: FaceId,
    /// Point index within that winding.
    pub local: usize,
    /// Number of faces meeting at the vertex.
    pub valence: usize,
}

/// Derived edge and vertex sets of a brush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    edges: Vec<EdgeRef>,
    vertices: Vec<VertexRef>,
    incident: Vec<Vec<FaceId>>,
    open: Vec<usize>,
}

/// Windings of a brush in declaration order; degenerate ones are empty.
struct Windings<'a> {
    ids: &'a [FaceId],
    points: Vec<&'a [Point3]>,
    positions: SecondaryMap<FaceId, usize>,
    eps: f64,
}

impl<'a> Windings<'a> {
    fn new(faces: &'a SlotMap<FaceId, Face>, order: &'a [FaceId], eps: f64) -> Self {
        let points = order
            .iter()
            .map(|&id| {
                faces
                    .get(id)
                    .map(|face| face.winding().points())
                    .filter(|points| points.len() >= 3)
                    .unwrap_or(&[])
            })
            .collect();
        let positions = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            ids: order,
            points,
            positions,
            eps,
        }
    }

    fn find(&self, position: usize, point: &Point3) -> Option<usize> {
        self.points[position]
            .iter()
            .position(|p| (p - point).norm() < self.eps)
    }

    /// Faces whose winding passes through `point`, in declaration order.
    fn incident(&self, point: &Point3) -> Vec<usize> {
        (0..self.points.len())
            .filter(|&position| self.find(position, point).is_some())
            .collect()
    }

    /// The other face sharing the edge starting at `local` of `position`.
    fn neighbour(&self, position: usize, local: usize) -> Option<usize> {
        let points = self.points[position];
        let (a, b) = (&points[local], &points[(local + 1) % points.len()]);
        (0..self.points.len()).find(|&other| {
            other != position && self.find(other, a).is_some() && self.find(other, b).is_some()
        })
    }
}

impl Topology {
    /// Derives edges and vertices from the windings of `order`.
    ///
    /// An edge exists where two windings share both endpoints; a vertex where
    /// a point is shared by three or more windings. Both are listed in face
    /// declaration order, then winding order.
    #[must_use]
    pub fn derive(faces: &SlotMap<FaceId, Face>, order: &[FaceId], eps: f64) -> Self {
        let mut topology = Self::default();
        let all: Vec<usize> = (0..order.len()).collect();
        topology.update(faces, order, &all, eps);
        topology
    }

    /// Re-derives only the edges and vertices touching the faces at
    /// `affected`.
    ///
    /// The face list must be unchanged since the last derivation. Every face
    /// whose winding changed must be listed, along with every face whose
    /// winding passes through a point a changed winding gained. Under those
    /// conditions the result equals [`Topology::derive`].
    pub fn update(
        &mut self,
        faces: &SlotMap<FaceId, Face>,
        order: &[FaceId],
        affected: &[usize],
        eps: f64,
    ) {
        let windings = Windings::new(faces, order, eps);
        let mut touched = vec![false; order.len()];
        for &position in affected {
            if let Some(flag) = touched.get_mut(position) {
                *flag = true;
            }
        }
        let is_touched = |id: FaceId| windings.positions.get(id).is_none_or(|&p| touched[p]);

        self.open.resize(order.len(), 0);
        self.edges
            .retain(|edge| !is_touched(edge.face) && !is_touched(edge.adjacent));
        for position in (0..order.len()).filter(|&p| touched[p]) {
            self.open[position] = 0;
            let n = windings.points[position].len();
            for local in 0..n {
                match windings.neighbour(position, local) {
                    Some(other) if other > position => self.edges.push(EdgeRef {
                        face: windings.ids[position],
                        local,
                        adjacent: windings.ids[other],
                    }),
                    // Recorded from the earlier face, which is not rescanned.
                    Some(other) if !touched[other] => {
                        let end = &windings.points[position][(local + 1) % n];
                        if let Some(start) = windings.find(other, end) {
                            self.edges.push(EdgeRef {
                                face: windings.ids[other],
                                local: start,
                                adjacent: windings.ids[position],
                            });
                        }
                    }
                    Some(_) => {}
                    None => self.open[position] += 1,
                }
            }
        }
        self.edges.sort_by_key(|edge| (windings.positions[edge.face], edge.local));

        let mut vertices: Vec<(VertexRef, Vec<FaceId>)> = self
            .vertices
            .drain(..)
            .zip(self.incident.drain(..))
            .filter(|(_, incident)| incident.iter().all(|&id| !is_touched(id)))
            .collect();
        for position in (0..order.len()).filter(|&p| touched[p]) {
            for point in windings.points[position] {
                let known = vertices.iter().any(|(vertex, _)| {
                    windings
                        .find(windings.positions[vertex.face], point)
                        .is_some_and(|local| local == vertex.local)
                });
                if known {
                    continue;
                }
                let incident = windings.incident(point);
                let Some(&first) = incident.first() else {
                    continue;
                };
                if incident.len() < 3 {
                    continue;
                }
                let Some(local) = windings.find(first, point) else {
                    continue;
                };
                vertices.push((
                    VertexRef {
                        face: windings.ids[first],
                        local,
                        valence: incident.len(),
                    },
                    incident.iter().map(|&p| windings.ids[p]).collect(),
                ));
            }
        }
        vertices.sort_by_key(|(vertex, _)| (windings.positions[vertex.face], vertex.local));
        (self.vertices, self.incident) = vertices.into_iter().unzip();
    }

    /// Derived edges.
    #[must_use]
    pub fn edges(&self) -> &[EdgeRef] {
        &self.edges
    }

    /// Derived vertices.
    #[must_use]
    pub fn vertices(&self) -> &[VertexRef] {
        &self.vertices
    }

    /// Faces meeting at the vertex at `index`, in declaration order.
    #[must_use]
    pub fn incident_faces(&self, index: usize) -> &[FaceId] {
        self.incident.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of winding edges with no neighbouring face.
    #[must_use]
    pub fn open_edges(&self) -> usize {
        self.open.iter().sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::Brush;
    use crate::config::KernelConfig;
    use crate::math::{Aabb, Plane3, Vector3};

    fn unit_cube() -> Brush {
        Brush::cuboid(
            &Aabb::from_points(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)]),
            KernelConfig::default(),
        )
    }

    #[test]
    fn vertices_list_their_faces() {
        let brush = unit_cube();
        let topology = brush.topology();
        for index in 0..topology.vertices().len() {
            let faces = topology.incident_faces(index);
            assert_eq!(faces.len(), 3);
            assert_eq!(faces[0], topology.vertices()[index].face);
        }
        assert!(topology.incident_faces(8).is_empty());
    }

    #[test]
    fn partial_update_matches_full_derivation() {
        let mut brush = unit_cube();
        // Tilting +X changes the +X, +Y, -Y, +Z, -Z windings but not -X.
        let tilted = Plane3::new(Vector3::new(1.0, 0.0, 0.25), 1.0).unwrap();
        brush.set_face_plane(0, tilted).unwrap();

        let order = brush.face_ids().to_vec();
        let full = Topology::derive(&brush.faces, &order, brush.config().point_epsilon);
        assert_eq!(brush.topology(), &full);
        assert_eq!(full.edges().len(), 12);
        assert_eq!(full.vertices().len(), 8);
        assert_eq!(full.open_edges(), 0);
    }

    #[test]
    fn face_pair_is_unordered() {
        let brush = unit_cube();
        let edge = brush.topology().edges()[0];
        let flipped = EdgeRef {
            face: edge.adjacent,
            local: 0,
            adjacent: edge.face,
        };
        assert_eq!(edge.face_pair(), flipped.face_pair());
    }
}

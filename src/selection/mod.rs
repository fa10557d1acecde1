mod test;
mod work_zone;

pub use test::SelectionTest;
pub use work_zone::WorkZone;

use crate::math::Plane3;
use crate::scene::NodeId;

/// Granularity of component selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentMode {
    Face,
    Edge,
    Vertex,
}

impl ComponentMode {
    /// All modes, in declaration order.
    pub const ALL: [ComponentMode; 3] = [ComponentMode::Face, ComponentMode::Edge, ComponentMode::Vertex];
}

/// A hit reported by a selection test.
///
/// `depth` is the distance along the test ray (zero for volume tests);
/// `distance` is how far the hit lies from the ray itself, zero for faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub depth: f64,
    pub distance: f64,
}

impl Intersection {
    /// Creates an intersection.
    #[must_use]
    pub fn new(depth: f64, distance: f64) -> Self {
        Self { depth, distance }
    }

    /// Orders nearer hits first, then hits closer to the ray.
    #[must_use]
    pub fn cmp_rank(&self, other: &Self) -> std::cmp::Ordering {
        self.depth
            .total_cmp(&other.depth)
            .then(self.distance.total_cmp(&other.distance))
    }
}

/// What a hit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    /// A whole node.
    Object(NodeId),
    /// One face, edge or vertex of a node.
    Component {
        node: NodeId,
        mode: ComponentMode,
        index: usize,
    },
}

/// Receives hits from selection tests.
pub trait Selector {
    fn add_intersection(&mut self, target: SelectionTarget, hit: Intersection);
}

/// Collects hits and ranks them.
///
/// Ranking is by [`Intersection::cmp_rank`]. Equal hits keep the order they
/// were reported in, which is ascending component index within one node and
/// pre-order across the graph.
#[derive(Debug, Clone, Default)]
pub struct SelectionPool {
    hits: Vec<(SelectionTarget, Intersection)>,
}

impl Selector for SelectionPool {
    fn add_intersection(&mut self, target: SelectionTarget, hit: Intersection) {
        self.hits.push((target, hit));
    }
}

impl SelectionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hits collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns `true` if nothing was hit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits ordered best first.
    #[must_use]
    pub fn ranked(&self) -> Vec<(SelectionTarget, Intersection)> {
        let mut ranked = self.hits.clone();
        // Stable sort: ties keep report order
        ranked.sort_by(|a, b| a.1.cmp_rank(&b.1));
        ranked
    }

    /// The best hit.
    #[must_use]
    pub fn best(&self) -> Option<(SelectionTarget, Intersection)> {
        self.hits
            .iter()
            .copied()
            .reduce(|best, next| if next.1.cmp_rank(&best.1).is_lt() { next } else { best })
    }

    /// Drops every hit.
    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

/// Planes picked by a plane-selection pass, matched with a tolerance.
#[derive(Debug, Clone)]
pub struct SelectedPlanes {
    planes: Vec<Plane3>,
    eps: f64,
}

impl SelectedPlanes {
    /// Creates an empty set matching planes within `eps`.
    #[must_use]
    pub fn new(eps: f64) -> Self {
        Self {
            planes: Vec::new(),
            eps,
        }
    }

    /// Adds a plane. Returns `false` if an equal plane was already present.
    pub fn insert(&mut self, plane: Plane3) -> bool {
        if self.contains(&plane) {
            return false;
        }
        self.planes.push(plane);
        true
    }

    /// Returns `true` if an equal plane is present.
    #[must_use]
    pub fn contains(&self, plane: &Plane3) -> bool {
        self.planes.iter().any(|p| p.approx_eq(plane, self.eps))
    }

    /// Number of planes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

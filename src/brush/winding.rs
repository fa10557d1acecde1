use crate::config::KernelConfig;
use crate::math::polygon::{centroid, polygon_area};
use crate::math::{Aabb, Plane3, Point3};

/// A closed, convex polygon lying on a face plane.
///
/// Points are ordered counter-clockwise when viewed from the front of the
/// plane. A winding with fewer than three points is degenerate and is kept
/// empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Winding {
    points: Vec<Point3>,
}

impl Winding {
    /// Wraps an ordered point sequence.
    ///
    /// Sequences shorter than three points become the empty winding.
    #[must_use]
    pub fn new(points: Vec<Point3>) -> Self {
        if points.len() < 3 {
            return Self::default();
        }
        Self { points }
    }

    /// A square of half-size `extent` lying on `plane`, centered on the
    /// point of the plane closest to the origin.
    #[must_use]
    pub fn from_plane(plane: &Plane3, extent: f64) -> Self {
        let center = plane.origin();
        let (u, v) = plane.basis();
        let u = u * extent;
        let v = v * extent;
        Self {
            points: vec![
                center - u - v,
                center + u - v,
                center + u + v,
                center - u + v,
            ],
        }
    }

    /// Clips the winding to the half-space behind `plane`.
    ///
    /// Points within `eps` of the plane are kept. A result with fewer than
    /// three points is the empty winding.
    #[must_use]
    pub fn clip(&self, plane: &Plane3, eps: f64) -> Self {
        let n = self.points.len();
        if n < 3 {
            return Self::default();
        }

        let dists: Vec<f64> = self.points.iter().map(|p| plane.distance_to(p)).collect();
        if dists.iter().all(|&d| d <= eps) {
            return self.clone();
        }

        let mut out = Vec::with_capacity(n + 1);
        for i in 0..n {
            let j = (i + 1) % n;
            let (a, b) = (&self.points[i], &self.points[j]);
            let (da, db) = (dists[i], dists[j]);

            if da <= eps {
                out.push(*a);
            }
            if (da > eps && db < -eps) || (da < -eps && db > eps) {
                let t = da / (da - db);
                out.push(a + (b - a) * t);
            }
        }

        dedup_ring(&mut out, eps);
        Self::new(out)
    }

    /// The ordered points.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` for the empty winding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns `true` if the winding has no area to contribute.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Mean of the points.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3> {
        centroid(&self.points)
    }

    /// Bounding box of the points.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    /// Area of the polygon measured along `plane`'s normal.
    #[must_use]
    pub fn area(&self, plane: &Plane3) -> f64 {
        polygon_area(&self.points, plane.normal())
    }
}

/// Removes consecutive coincident points, including across the wrap.
fn dedup_ring(points: &mut Vec<Point3>, eps: f64) {
    points.dedup_by(|b, a| (*a - *b).norm() < eps);
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first - last).norm() < eps {
            points.pop();
        } else {
            break;
        }
    }
}

/// Rebuilds the winding of face `index` from the full plane set of its brush.
///
/// Starts from a large square on the face plane and clips it behind every
/// other plane. When two faces share the same plane, the one declared first
/// keeps the polygon and the later one becomes degenerate.
#[must_use]
pub fn build_winding(planes: &[Plane3], index: usize, config: &KernelConfig) -> Winding {
    let Some(plane) = planes.get(index) else {
        return Winding::default();
    };

    let mut winding = Winding::from_plane(plane, config.world_extent);
    for (other_index, other) in planes.iter().enumerate() {
        if other_index == index {
            continue;
        }
        if other.approx_eq(plane, config.point_epsilon) {
            if other_index < index {
                return Winding::default();
            }
            continue;
        }
        winding = winding.clip(other, config.plane_epsilon);
        if winding.is_degenerate() {
            break;
        }
    }
    winding
}

use crate::brush::Winding;
use crate::config::KernelConfig;
use crate::error::{GeometryError, Result};
use crate::math::polygon::{point_in_polygon, ray_point_distance, ray_segment_distance};
use crate::math::{Aabb, Plane3, Point3, Vector3};

use super::Intersection;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Ray { origin: Point3, direction: Vector3 },
    Volume(Aabb),
}

/// A pick ray or a selection volume.
///
/// Ray tests report the distance along the ray as hit depth. Volume tests
/// report depth zero, so their hits rank in report order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionTest {
    shape: Shape,
    radius: Option<f64>,
}

impl SelectionTest {
    /// A pick ray from `origin` along `direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if `direction` is zero-length.
    pub fn ray(origin: Point3, direction: Vector3) -> Result<Self> {
        let len = direction.norm();
        if len < f64::EPSILON {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            shape: Shape::Ray {
                origin,
                direction: direction / len,
            },
            radius: None,
        })
    }

    /// A box selection volume.
    #[must_use]
    pub fn volume(bounds: Aabb) -> Self {
        Self {
            shape: Shape::Volume(bounds),
            radius: None,
        }
    }

    /// Overrides the pick radius used for edges and vertices.
    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Pick radius for edges and vertices.
    #[must_use]
    pub fn radius(&self, config: &KernelConfig) -> f64 {
        self.radius.unwrap_or(config.select_epsilon)
    }

    /// Tests a convex polygon lying on `plane`.
    ///
    /// A ray hits where it crosses the plane inside the polygon; a volume
    /// hits when some area of the polygon is left after clipping it to the
    /// box.
    #[must_use]
    pub fn test_polygon(&self, points: &[Point3], plane: &Plane3) -> Option<Intersection> {
        if points.len() < 3 {
            return None;
        }
        match &self.shape {
            Shape::Ray { origin, direction } => {
                let t = plane.intersect_ray(origin, direction)?;
                if t < 0.0 {
                    return None;
                }
                let hit = origin + direction * t;
                let (u, v) = plane.basis();
                point_in_polygon(&hit, points, &u, &v).then(|| Intersection::new(t, 0.0))
            }
            Shape::Volume(bounds) => {
                if !bounds.intersects(&Aabb::from_points(points)) {
                    return None;
                }
                box_planes(bounds)
                    .iter()
                    .try_fold(Winding::new(points.to_vec()), |winding, side| {
                        let clipped = winding.clip(side, 0.0);
                        (!clipped.is_degenerate()).then_some(clipped)
                    })
                    .map(|_| Intersection::new(0.0, 0.0))
            }
        }
    }

    /// Tests the segment `a..b`.
    ///
    /// A volume only hits a segment it fully encloses.
    #[must_use]
    pub fn test_segment(&self, a: &Point3, b: &Point3, radius: f64) -> Option<Intersection> {
        match &self.shape {
            Shape::Ray { origin, direction } => {
                let (distance, t) = ray_segment_distance(origin, direction, a, b);
                (distance <= radius).then(|| Intersection::new(t, distance))
            }
            Shape::Volume(bounds) => (bounds.contains(a, 0.0) && bounds.contains(b, 0.0))
                .then(|| Intersection::new(0.0, 0.0)),
        }
    }

    /// Tests a single point.
    #[must_use]
    pub fn test_point(&self, point: &Point3, radius: f64) -> Option<Intersection> {
        match &self.shape {
            Shape::Ray { origin, direction } => {
                let (distance, t) = ray_point_distance(origin, direction, point);
                (distance <= radius).then(|| Intersection::new(t, distance))
            }
            Shape::Volume(bounds) => bounds
                .contains(point, 0.0)
                .then(|| Intersection::new(0.0, 0.0)),
        }
    }

    /// Tests a bounding box, used to cull whole nodes before finer tests.
    #[must_use]
    pub fn test_aabb(&self, aabb: &Aabb, radius: f64) -> bool {
        if !aabb.is_valid() {
            return false;
        }
        match &self.shape {
            Shape::Ray { origin, direction } => {
                // Slab test against the box grown by the pick radius
                let mut t_min = 0.0_f64;
                let mut t_max = f64::INFINITY;
                for i in 0..3 {
                    let (lo, hi) = (aabb.min[i] - radius, aabb.max[i] + radius);
                    if direction[i].abs() < f64::EPSILON {
                        if origin[i] < lo || origin[i] > hi {
                            return false;
                        }
                        continue;
                    }
                    let inv = 1.0 / direction[i];
                    let (t0, t1) = ((lo - origin[i]) * inv, (hi - origin[i]) * inv);
                    t_min = t_min.max(t0.min(t1));
                    t_max = t_max.min(t0.max(t1));
                    if t_min > t_max {
                        return false;
                    }
                }
                true
            }
            Shape::Volume(bounds) => bounds.intersects(aabb),
        }
    }
}

/// The six faces of `bounds`, facing outwards.
fn box_planes(bounds: &Aabb) -> [Plane3; 6] {
    [
        Plane3::from_unit_normal(Vector3::x(), bounds.max.x),
        Plane3::from_unit_normal(-Vector3::x(), -bounds.min.x),
        Plane3::from_unit_normal(Vector3::y(), bounds.max.y),
        Plane3::from_unit_normal(-Vector3::y(), -bounds.min.y),
        Plane3::from_unit_normal(Vector3::z(), bounds.max.z),
        Plane3::from_unit_normal(-Vector3::z(), -bounds.min.z),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn down_ray(x: f64, y: f64) -> SelectionTest {
        SelectionTest::ray(p(x, y, 10.0), Vector3::new(0.0, 0.0, -1.0)).unwrap()
    }

    fn square() -> (Vec<Point3>, Plane3) {
        let points = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)];
        (points, Plane3::new(Vector3::z(), 1.0).unwrap())
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert!(SelectionTest::ray(p(0.0, 0.0, 0.0), Vector3::zeros()).is_err());
    }

    #[test]
    fn ray_hits_polygon_at_depth() {
        let (points, plane) = square();
        let hit = down_ray(0.5, 0.5).test_polygon(&points, &plane).unwrap();
        assert_relative_eq!(hit.depth, 9.0);
        assert!(down_ray(2.0, 0.5).test_polygon(&points, &plane).is_none());
    }

    #[test]
    fn polygon_behind_ray_is_missed() {
        let (points, plane) = square();
        let test = SelectionTest::ray(p(0.5, 0.5, 0.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        assert!(test.test_polygon(&points, &plane).is_none());
    }

    #[test]
    fn segment_and_point_use_radius() {
        let test = down_ray(0.1, 0.0);
        let hit = test.test_segment(&p(0.0, -1.0, 0.0), &p(0.0, 1.0, 0.0), 0.25).unwrap();
        assert_relative_eq!(hit.distance, 0.1, epsilon = 1e-12);
        assert_relative_eq!(hit.depth, 10.0, epsilon = 1e-12);
        assert!(test.test_segment(&p(0.0, -1.0, 0.0), &p(0.0, 1.0, 0.0), 0.05).is_none());
        assert!(test.test_point(&p(0.0, 0.0, 0.0), 0.25).is_some());
        assert!(test.test_point(&p(1.0, 0.0, 0.0), 0.25).is_none());
    }

    #[test]
    fn volume_encloses_points_and_segments() {
        let test = SelectionTest::volume(Aabb::from_points(&[p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0)]));
        assert!(test.test_point(&p(1.0, 1.0, 1.0), 0.0).is_some());
        assert!(test.test_segment(&p(0.5, 0.5, 0.5), &p(1.5, 1.5, 1.5), 0.0).is_some());
        assert!(test.test_segment(&p(0.5, 0.5, 0.5), &p(3.0, 1.5, 1.5), 0.0).is_none());
        let (points, plane) = square();
        assert_eq!(test.test_polygon(&points, &plane).unwrap().depth, 0.0);
    }

    #[test]
    fn volume_must_reach_the_polygon() {
        let triangle = vec![p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 4.0, 0.0)];
        let plane = Plane3::new(Vector3::z(), 0.0).unwrap();
        // Inside the triangle's bounds but past its hypotenuse
        let corner = SelectionTest::volume(Aabb::from_points(&[p(2.5, 2.5, -1.0), p(3.5, 3.5, 1.0)]));
        assert!(corner.test_polygon(&triangle, &plane).is_none());

        let inside = SelectionTest::volume(Aabb::from_points(&[p(0.5, 0.5, -1.0), p(1.0, 1.0, 1.0)]));
        assert!(inside.test_polygon(&triangle, &plane).is_some());

        // Slanted face whose bounds enclose the box
        let slanted = vec![p(0.0, 0.0, 0.0), p(4.0, 0.0, 4.0), p(4.0, 4.0, 4.0), p(0.0, 4.0, 0.0)];
        let slanted_plane = Plane3::from_points(&slanted[0], &slanted[1], &slanted[2]).unwrap();
        let above = SelectionTest::volume(Aabb::from_points(&[p(1.0, 1.0, 2.5), p(1.5, 1.5, 3.0)]));
        assert!(above.test_polygon(&slanted, &slanted_plane).is_none());
        let through = SelectionTest::volume(Aabb::from_points(&[p(1.0, 1.0, 0.5), p(1.5, 1.5, 2.0)]));
        assert!(through.test_polygon(&slanted, &slanted_plane).is_some());
    }

    #[test]
    fn aabb_cull() {
        let aabb = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        assert!(down_ray(0.5, 0.5).test_aabb(&aabb, 0.0));
        assert!(!down_ray(1.2, 0.5).test_aabb(&aabb, 0.0));
        assert!(down_ray(1.2, 0.5).test_aabb(&aabb, 0.25));
        assert!(!down_ray(0.5, 0.5).test_aabb(&Aabb::empty(), 1.0));
    }

    #[test]
    fn default_radius_comes_from_config() {
        let config = KernelConfig::default();
        assert_relative_eq!(down_ray(0.0, 0.0).radius(&config), config.select_epsilon);
        assert_relative_eq!(down_ray(0.0, 0.0).with_radius(2.0).radius(&config), 2.0);
    }
}

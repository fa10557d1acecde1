use crate::error::{GeometryError, Result};

use super::{transform_point, Matrix4, Point3, Vector3};

/// Length under which a normal is treated as zero.
const NORMAL_EPSILON: f64 = 1e-12;

/// An oriented plane `normal · p = dist`.
///
/// The normal is unit length and points out of the half-space a brush keeps:
/// points with `distance_to(p) <= 0` are behind (inside) the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane3 {
    normal: Vector3,
    dist: f64,
}

impl Plane3 {
    /// Creates a plane from a normal and its distance from the origin.
    ///
    /// The normal is normalized and `dist` rescaled to match.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn new(normal: Vector3, dist: f64) -> Result<Self> {
        let len = normal.norm();
        if len < NORMAL_EPSILON {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            normal: normal / len,
            dist: dist / len,
        })
    }

    /// Builds a plane from a normal already known to be unit length.
    pub(crate) fn from_unit_normal(normal: Vector3, dist: f64) -> Self {
        debug_assert!((normal.norm() - 1.0).abs() < 1e-9, "normal must be unit length");
        Self { normal, dist }
    }

    /// Creates a plane through `point` facing along `normal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_point_normal(point: &Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < NORMAL_EPSILON {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;
        Ok(Self {
            normal,
            dist: normal.dot(&point.coords),
        })
    }

    /// Creates a plane through three points.
    ///
    /// Points ordered counter-clockwise when viewed from the front give a
    /// normal pointing towards the viewer.
    ///
    /// # Errors
    ///
    /// Returns an error if the points are collinear.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Result<Self> {
        let normal = (b - a).cross(&(c - a));
        if normal.norm() < NORMAL_EPSILON {
            return Err(GeometryError::Degenerate("collinear plane points".into()).into());
        }
        Self::from_point_normal(a, normal)
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the signed distance of the plane from the origin.
    #[must_use]
    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Signed distance from the plane to `point`; positive in front.
    #[must_use]
    pub fn distance_to(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.dist
    }

    /// The point of the plane closest to the origin.
    #[must_use]
    pub fn origin(&self) -> Point3 {
        Point3::from(self.normal * self.dist)
    }

    /// The same plane facing the other way.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// Returns `true` if both planes coincide and face the same way.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.normal - other.normal).norm() < eps && (self.dist - other.dist).abs() < eps
    }

    /// Two orthonormal in-plane axes `(u, v)` with `u × v == normal`.
    #[must_use]
    pub fn basis(&self) -> (Vector3, Vector3) {
        // Choose a reference vector not parallel to the normal
        let reference = if self.normal.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };
        let u = self.normal.cross(&reference).normalize();
        let v = self.normal.cross(&u);
        (u, v)
    }

    /// Transforms the plane by an affine matrix.
    ///
    /// Normals go through the inverse transpose, so mirrored and
    /// non-uniformly scaled planes keep facing outwards. Returns `None` if
    /// the linear part of the matrix is singular.
    #[must_use]
    pub fn transformed(&self, matrix: &Matrix4) -> Option<Self> {
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let inverse = linear.try_inverse()?;
        let normal = inverse.transpose() * self.normal;
        let len = normal.norm();
        if len < NORMAL_EPSILON {
            return None;
        }
        let normal = normal / len;
        let point = transform_point(matrix, &self.origin());
        Some(Self {
            normal,
            dist: normal.dot(&point.coords),
        })
    }

    /// Intersects the ray `origin + t * direction` with the plane.
    ///
    /// Returns `t`, or `None` if the ray runs parallel to the plane.
    #[must_use]
    pub fn intersect_ray(&self, origin: &Point3, direction: &Vector3) -> Option<f64> {
        let denom = self.normal.dot(direction);
        if denom.abs() < NORMAL_EPSILON {
            return None;
        }
        Some(-self.distance_to(origin) / denom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn new_normalizes() {
        let plane = Plane3::new(Vector3::new(0.0, 0.0, 2.0), 4.0).unwrap();
        assert_relative_eq!(plane.normal().z, 1.0);
        assert_relative_eq!(plane.dist(), 2.0);
    }

    #[test]
    fn zero_normal_is_rejected() {
        assert!(Plane3::new(Vector3::zeros(), 1.0).is_err());
    }

    #[test]
    fn from_points_faces_ccw_viewer() {
        let plane = Plane3::from_points(&p(0.0, 0.0, 1.0), &p(1.0, 0.0, 1.0), &p(0.0, 1.0, 1.0))
            .unwrap();
        assert_relative_eq!(plane.normal().z, 1.0);
        assert_relative_eq!(plane.dist(), 1.0);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let r = Plane3::from_points(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0), &p(2.0, 0.0, 0.0));
        assert!(r.is_err());
    }

    #[test]
    fn basis_is_right_handed() {
        let plane = Plane3::new(Vector3::new(1.0, 2.0, -3.0), 0.5).unwrap();
        let (u, v) = plane.basis();
        assert_relative_eq!(u.cross(&v), *plane.normal(), epsilon = 1e-12);
        assert_relative_eq!(u.dot(&v), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn translation_moves_distance() {
        let plane = Plane3::new(Vector3::x(), 1.0).unwrap();
        let m = Matrix4::new_translation(&Vector3::new(2.0, 5.0, 0.0));
        let moved = plane.transformed(&m).unwrap();
        assert_relative_eq!(moved.dist(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(*moved.normal(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn mirror_keeps_outward_normal() {
        let plane = Plane3::new(Vector3::x(), 1.0).unwrap();
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let mirrored = plane.transformed(&m).unwrap();
        assert_relative_eq!(*mirrored.normal(), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(mirrored.dist(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_transform_is_none() {
        let plane = Plane3::new(Vector3::z(), 1.0).unwrap();
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 0.0));
        assert!(plane.transformed(&m).is_none());
    }

    #[test]
    fn ray_hits_plane() {
        let plane = Plane3::new(Vector3::z(), 2.0).unwrap();
        let t = plane
            .intersect_ray(&p(0.0, 0.0, 10.0), &Vector3::new(0.0, 0.0, -1.0))
            .unwrap();
        assert_relative_eq!(t, 8.0);
        assert!(plane.intersect_ray(&p(0.0, 0.0, 10.0), &Vector3::x()).is_none());
    }
}

pub mod aabb;
pub mod plane;
pub mod polygon;

pub use aabb::Aabb;
pub use plane::Plane3;

/// 2D point type, used for texture coordinates.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Unit quaternion used for pending rotations.
pub type Rotation = nalgebra::UnitQuaternion<f64>;

/// Transforms a point by a 4x4 matrix (homogeneous coordinates).
#[must_use]
pub fn transform_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    let v = matrix * nalgebra::Vector4::new(point.x, point.y, point.z, 1.0);
    Point3::new(v.x, v.y, v.z)
}

/// Rounds every coordinate of `point` to the nearest multiple of `grid`.
///
/// A non-positive grid leaves the point unchanged.
#[must_use]
pub fn snap_point(point: &Point3, grid: f64) -> Point3 {
    if grid <= 0.0 {
        return *point;
    }
    point.map(|c| (c / grid).round() * grid)
}

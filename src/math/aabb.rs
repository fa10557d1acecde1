use super::{Point3, Vector3};

/// An axis-aligned bounding box.
///
/// The empty box has `min > max` on every axis and absorbs nothing when
/// merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// The empty box.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// The smallest box containing every point.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for point in points {
            aabb.include_point(point);
        }
        aabb
    }

    /// Returns `true` unless this is the empty box.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Grows the box to contain `point`.
    pub fn include_point(&mut self, point: &Point3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grows the box to contain `other`.
    pub fn include_aabb(&mut self, other: &Aabb) {
        if other.is_valid() {
            self.include_point(&other.min);
            self.include_point(&other.max);
        }
    }

    /// Union of two boxes.
    #[must_use]
    pub fn union(mut self, other: &Aabb) -> Self {
        self.include_aabb(other);
        self
    }

    /// Center of the box.
    #[must_use]
    pub fn origin(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Half-size of the box along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3 {
        (self.max - self.min) * 0.5
    }

    /// Returns `true` if `point` lies inside or on the box, grown by `eps`.
    #[must_use]
    pub fn contains(&self, point: &Point3, eps: f64) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] - eps && point[i] <= self.max[i] + eps)
    }

    /// Returns `true` if both boxes are valid and overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.is_valid()
            && other.is_valid()
            && (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }
}

use crate::math::{snap_point, Matrix4, Plane3, Point2, Point3, Vector3};

use super::texture::TextureProjection;
use super::winding::Winding;

slotmap::new_key_type! {
    /// Stable identifier of a face within its brush.
    pub struct FaceId;
}

/// One bounding half-space of a brush.
///
/// The plane is the source of truth; the winding is derived from the planes
/// of every face in the same brush and only the brush rewrites it.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    plane: Plane3,
    texture: TextureProjection,
    winding: Winding,
}

impl Face {
    /// Creates a face with the default texture projection.
    #[must_use]
    pub fn new(plane: Plane3) -> Self {
        Self::with_texture(plane, TextureProjection::default())
    }

    /// Creates a face with an explicit texture projection.
    #[must_use]
    pub fn with_texture(plane: Plane3, texture: TextureProjection) -> Self {
        Self {
            plane,
            texture,
            winding: Winding::default(),
        }
    }

    /// The bounding plane.
    #[must_use]
    pub fn plane(&self) -> &Plane3 {
        &self.plane
    }

    /// The texture projection.
    #[must_use]
    pub fn texture(&self) -> &TextureProjection {
        &self.texture
    }

    /// The cached polygon.
    #[must_use]
    pub fn winding(&self) -> &Winding {
        &self.winding
    }

    /// Returns `true` if the face has a non-degenerate polygon.
    #[must_use]
    pub fn contributes(&self) -> bool {
        !self.winding.is_degenerate()
    }

    /// Centroid of the polygon.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3> {
        self.winding.centroid()
    }

    /// Texture coordinates for every winding point, in winding order.
    #[must_use]
    pub fn texcoords(&self) -> Vec<Point2> {
        self.winding
            .points()
            .iter()
            .map(|p| self.texture.texcoords(p, self.plane.normal()))
            .collect()
    }

    pub(crate) fn set_plane(&mut self, plane: Plane3) {
        self.plane = plane;
    }

    pub(crate) fn set_texture(&mut self, texture: TextureProjection) {
        self.texture = texture;
    }

    pub(crate) fn set_winding(&mut self, winding: Winding) {
        self.winding = winding;
    }

    pub(crate) fn translate(&mut self, translation: &Vector3, texture_lock: bool) {
        let normal = *self.plane.normal();
        self.plane = Plane3::from_unit_normal(normal, self.plane.dist() + normal.dot(translation));
        if texture_lock {
            self.texture.translate_locked(&normal, translation);
        }
    }

    /// Transforms the plane; returns `false` and leaves the face untouched
    /// when the matrix is singular.
    pub(crate) fn transform(&mut self, matrix: &Matrix4, texture_lock: bool) -> bool {
        let Some(plane) = self.plane.transformed(matrix) else {
            return false;
        };
        let linear = matrix.fixed_view::<3, 3>(0, 0);
        if texture_lock && linear.into_owned() == nalgebra::Matrix3::identity() {
            let translation = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
            self.texture.translate_locked(self.plane.normal(), &translation);
        }
        self.plane = plane;
        true
    }

    /// Snaps the winding points to `grid` and refits the plane through them.
    ///
    /// Returns `false` if no snapped triple spans a plane facing the same way.
    pub(crate) fn snap_to(&mut self, grid: f64) -> bool {
        let snapped: Vec<Point3> = self
            .winding
            .points()
            .iter()
            .map(|p| snap_point(p, grid))
            .collect();
        if snapped.len() < 3 {
            return false;
        }

        let normal = *self.plane.normal();
        let fitted = (1..snapped.len() - 1).find_map(|i| {
            Plane3::from_points(&snapped[0], &snapped[i], &snapped[i + 1])
                .ok()
                .filter(|candidate| candidate.normal().dot(&normal) > 0.0)
        });
        match fitted {
            Some(plane) => {
                self.plane = plane;
                true
            }
            None => false,
        }
    }
}

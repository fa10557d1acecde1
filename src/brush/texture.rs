use crate::math::{Point2, Point3, Vector2, Vector3};

/// Material assigned to faces that were never given one.
pub const DEFAULT_MATERIAL: &str = "_default";

/// Paraxial texture projection of a face.
///
/// Texture coordinates are the point projected onto the face's tangent axes,
/// rotated by `rotation` (radians), divided by `scale` and shifted by `offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureProjection {
    /// Material (shader) name.
    pub material: String,
    /// Offset added after scaling, in texture units.
    pub offset: Vector2,
    /// World units per texture unit along each axis.
    pub scale: Vector2,
    /// Rotation of the projection around the face normal, in radians.
    pub rotation: f64,
}

impl Default for TextureProjection {
    fn default() -> Self {
        Self {
            material: DEFAULT_MATERIAL.to_owned(),
            offset: Vector2::zeros(),
            scale: Vector2::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

impl TextureProjection {
    /// Creates a default projection using `material`.
    #[must_use]
    pub fn with_material(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            ..Default::default()
        }
    }

    /// Texture coordinates of `point` on a face with the given normal.
    #[must_use]
    pub fn texcoords(&self, point: &Point3, normal: &Vector3) -> Point2 {
        let (u_axis, v_axis) = tangent_axes(normal);
        let u = point.coords.dot(&u_axis);
        let v = point.coords.dot(&v_axis);
        let (su, sv) = self.rotate_scale(u, v);
        Point2::new(su + self.offset.x, sv + self.offset.y)
    }

    /// Adjusts the offset so texture coordinates stay fixed while the face
    /// moves by `translation`.
    pub fn translate_locked(&mut self, normal: &Vector3, translation: &Vector3) {
        let (u_axis, v_axis) = tangent_axes(normal);
        let (du, dv) = self.rotate_scale(translation.dot(&u_axis), translation.dot(&v_axis));
        self.offset.x -= du;
        self.offset.y -= dv;
    }

    fn rotate_scale(&self, u: f64, v: f64) -> (f64, f64) {
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let ru = u * cos_r - v * sin_r;
        let rv = u * sin_r + v * cos_r;
        (ru / self.scale.x.max(1e-3), rv / self.scale.y.max(1e-3))
    }
}

/// Tangent axes of a face from its normal (paraxial projection).
#[must_use]
pub fn tangent_axes(normal: &Vector3) -> (Vector3, Vector3) {
    let abs_n = normal.abs();
    let up = if abs_n.z >= abs_n.x && abs_n.z >= abs_n.y {
        // Normal is mostly Z, use Y as reference
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = normal.cross(&up);
    let u = if u.norm() > 0.0 { u.normalize() } else { u };
    let v = normal.cross(&u);
    let v = if v.norm() > 0.0 { v.normalize() } else { v };
    (u, v)
}

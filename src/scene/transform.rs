use crate::math::{Matrix4, Rotation, Vector3};

/// Where a node is in the deferred-transform cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformPhase {
    /// Nothing pending; base geometry is current.
    #[default]
    Identity,
    /// A transform is being previewed; base geometry is untouched.
    Pending,
    /// The last pending transform was committed to the base geometry.
    Frozen,
}

/// What a pending transform applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformKind {
    /// The whole node.
    #[default]
    Primitive,
    /// Only the selected components.
    Component,
}

/// Pending translation, rotation and scale of a node.
///
/// The composed matrix is `T * R * S`, unless an explicit matrix was set,
/// which replaces the components until the next reset.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    translation: Vector3,
    rotation: Rotation,
    scale: Vector3,
    explicit: Option<Matrix4>,
    kind: TransformKind,
    phase: TransformPhase,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Rotation::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            explicit: None,
            kind: TransformKind::default(),
            phase: TransformPhase::default(),
        }
    }
}

impl TransformState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> TransformPhase {
        self.phase
    }

    #[must_use]
    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.phase == TransformPhase::Pending
    }

    pub fn set_translation(&mut self, translation: Vector3) {
        self.translation = translation;
        self.explicit = None;
        self.phase = TransformPhase::Pending;
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.explicit = None;
        self.phase = TransformPhase::Pending;
    }

    pub fn set_scale(&mut self, scale: Vector3) {
        self.scale = scale;
        self.explicit = None;
        self.phase = TransformPhase::Pending;
    }

    /// Replaces the pending transform with an arbitrary matrix.
    pub fn set_matrix(&mut self, matrix: Matrix4) {
        self.explicit = Some(matrix);
        self.phase = TransformPhase::Pending;
    }

    pub fn set_kind(&mut self, kind: TransformKind) {
        self.kind = kind;
    }

    /// The pending matrix; identity when nothing is pending.
    #[must_use]
    pub fn matrix(&self) -> Matrix4 {
        if !self.is_pending() {
            return Matrix4::identity();
        }
        if let Some(matrix) = self.explicit {
            return matrix;
        }
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Drops the pending transform. Returns `true` if one was pending.
    pub fn revert(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.clear_components();
        if was_pending {
            self.phase = TransformPhase::Identity;
        }
        was_pending
    }

    /// Marks the pending transform committed. Returns `true` if one was pending.
    pub fn freeze(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.clear_components();
        if was_pending {
            self.phase = TransformPhase::Frozen;
        }
        was_pending
    }

    fn clear_components(&mut self) {
        let kind = self.kind;
        *self = Self {
            phase: self.phase,
            ..Self::default()
        };
        self.kind = kind;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{transform_point, Point3};

    #[test]
    fn starts_at_identity() {
        let state = TransformState::new();
        assert_eq!(state.phase(), TransformPhase::Identity);
        assert_eq!(state.matrix(), Matrix4::identity());
    }

    #[test]
    fn composes_translate_rotate_scale() {
        let mut state = TransformState::new();
        state.set_scale(Vector3::new(2.0, 2.0, 2.0));
        state.set_rotation(Rotation::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2));
        state.set_translation(Vector3::new(10.0, 0.0, 0.0));
        assert!(state.is_pending());

        let p = transform_point(&state.matrix(), &Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(10.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn explicit_matrix_overrides_components() {
        let mut state = TransformState::new();
        state.set_translation(Vector3::new(1.0, 0.0, 0.0));
        let m = Matrix4::new_scaling(3.0);
        state.set_matrix(m);
        assert_eq!(state.matrix(), m);
    }

    #[test]
    fn revert_and_freeze_transitions() {
        let mut state = TransformState::new();
        assert!(!state.revert());
        assert!(!state.freeze());
        assert_eq!(state.phase(), TransformPhase::Identity);

        state.set_kind(TransformKind::Component);
        state.set_translation(Vector3::x());
        assert!(state.revert());
        assert_eq!(state.phase(), TransformPhase::Identity);
        assert_eq!(state.kind(), TransformKind::Component);

        state.set_translation(Vector3::x());
        assert!(state.freeze());
        assert_eq!(state.phase(), TransformPhase::Frozen);
        assert_eq!(state.matrix(), Matrix4::identity());

        state.set_translation(Vector3::y());
        assert_eq!(state.phase(), TransformPhase::Pending);
    }
}

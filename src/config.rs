/// Tolerances and editing options shared by the brush kernel and the scene graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConfig {
    /// Distance under which a point is classified as lying on a plane.
    pub plane_epsilon: f64,

    /// Distance under which two points are considered coincident.
    pub point_epsilon: f64,

    /// Half-size of the initial polygon laid on a face plane before clipping.
    pub world_extent: f64,

    /// Hit radius for edge and vertex tests when the test does not carry one.
    pub select_epsilon: f64,

    /// Keep texture coordinates fixed when faces are translated.
    pub texture_lock: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            plane_epsilon: 1e-6,
            point_epsilon: 1e-5,
            world_extent: 131_072.0,
            select_epsilon: 0.25,
            texture_lock: true,
        }
    }
}

impl KernelConfig {
    /// Tighter tolerances for small-scale scenes.
    ///
    /// Shrinks the world extent so clipped coordinates keep more precision.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            plane_epsilon: 1e-9,
            point_epsilon: 1e-7,
            world_extent: 4096.0,
            select_epsilon: 0.05,
            ..Default::default()
        }
    }

    /// Returns a copy with texture lock switched on or off.
    #[must_use]
    pub fn with_texture_lock(mut self, enabled: bool) -> Self {
        self.texture_lock = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precise_keeps_texture_lock_default() {
        let config = KernelConfig::precise();
        assert!(config.texture_lock);
        assert!(config.plane_epsilon < KernelConfig::default().plane_epsilon);
    }

    #[test]
    fn with_texture_lock_overrides() {
        let config = KernelConfig::default().with_texture_lock(false);
        assert!(!config.texture_lock);
    }
}

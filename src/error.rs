use thiserror::Error;

use crate::selection::ComponentMode;

/// Top-level error type for the brushwork kernel.
#[derive(Debug, Error)]
pub enum BrushworkError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Errors raised by explicit geometric constructors.
///
/// Degenerate solids are not errors; these only cover constructors that
/// cannot produce a value at all.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Out-of-contract index access.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("face index {index} out of range (brush has {len} faces)")]
    FaceIndex { index: usize, len: usize },

    #[error("{mode:?} component index {index} out of range ({len} available)")]
    ComponentIndex {
        mode: ComponentMode,
        index: usize,
        len: usize,
    },

    #[error("plane count mismatch: expected {expected}, got {actual}")]
    PlaneCount { expected: usize, actual: usize },
}

/// Errors related to scene graph structure.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("node not found in scene graph")]
    NodeNotFound,

    #[error("scene graph has no root")]
    NoRoot,

    #[error("the root node cannot be erased, replace it with set_root")]
    RootErase,

    #[error("node is not {0}")]
    MissingCapability(&'static str),

    #[error("cannot move a node under itself or its descendants")]
    CyclicParent,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Convenience type alias for results using [`BrushworkError`].
pub type Result<T> = std::result::Result<T, BrushworkError>;

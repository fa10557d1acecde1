pub mod brush;
pub mod cache;
pub mod config;
pub mod error;
pub mod math;
pub mod render;
pub mod scene;
pub mod selection;

pub use config::KernelConfig;
pub use error::{BrushworkError, Result};

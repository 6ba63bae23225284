//! # voxmesh reconstruction
//!
//! Surface extraction from scalar volumes.
//!
//! [`meshify`] wraps marching cubes with optional pre-smoothing of the
//! field, cavity filling and largest-component selection.

pub mod marching_cubes;
pub mod meshify;

// Re-export commonly used items
pub use marching_cubes::*;
pub use meshify::*;

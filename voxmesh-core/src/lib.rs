//! Core data structures and traits for voxmesh
//!
//! This crate provides the fundamental types shared by the volume to mesh
//! pipeline: triangle meshes, scalar volumes, quadrics, affine transforms
//! and the common error type.

pub mod error;
pub mod mesh;
pub mod point;
pub mod quadric;
pub mod traits;
pub mod transform;
pub mod volume;

pub use error::*;
pub use mesh::*;
pub use point::*;
pub use quadric::*;
pub use traits::*;
pub use transform::*;
pub use volume::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};

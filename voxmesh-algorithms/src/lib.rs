//! # voxmesh algorithms
//!
//! Building blocks shared by the extraction and decimation stages:
//! automatic threshold selection, connected component labeling, radix
//! ordering of collapse costs and HC Laplacian smoothing.

pub mod labeling;
pub mod radix;
pub mod smoothing;
pub mod threshold;

// Re-export commonly used items
pub use labeling::*;
pub use radix::*;
pub use smoothing::*;
pub use threshold::*;

//! Volume input and mesh output for voxmesh
//!
//! Loads NIfTI-1 volumes and writes triangle meshes in the formats common
//! to neuroimaging viewers: GIFTI, MZ3, OBJ, PLY, FreeSurfer, STL and
//! legacy VTK. The output format is chosen from the file extension.

pub mod atlas;
pub mod error;
pub mod gifti;
pub mod mz3;
pub mod nifti;
pub mod obj;
pub mod pial;
pub mod ply;
pub mod registry;
pub mod stl;
pub mod vtk;

pub use atlas::AtlasLabels;
pub use error::*;
pub use nifti::{read_header, read_nifti, write_nifti, Datatype, NiftiHeader};
pub use registry::{MeshWriteOptions, MeshWriter, MeshWriterRegistry};

use std::path::Path;
use voxmesh_core::{Result, TriangleMesh};

/// Write a mesh with the built-in writers, format from the path extension
pub fn write_mesh<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    path: P,
    options: &MeshWriteOptions,
) -> Result<()> {
    MeshWriterRegistry::with_defaults().write_mesh(mesh, path.as_ref(), options)
}

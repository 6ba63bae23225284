//! Wavefront OBJ writer

use crate::registry::{MeshWriteOptions, MeshWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Result, TriangleMesh};

/// Writes ASCII OBJ with 1-based face indices. OBJ has no binary form, so
/// [`MeshWriteOptions::binary`] is ignored.
pub struct ObjWriter;

impl MeshWriter for ObjWriter {
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path, _: &MeshWriteOptions) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_obj(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "OBJ"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }
}

pub fn write_obj<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "# voxmesh")?;
    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}

//! MZ3 writer
//!
//! MZ3 is the compact surface format of Surf Ice. The header is
//!
//! ```text
//! UINT16  magic 0x5A4D ("MZ")
//! UINT16  attributes (bit 0 faces, bit 1 vertices)
//! UINT32  face count
//! UINT32  vertex count
//! UINT32  bytes to skip after the header
//! ```
//!
//! followed by `INT32[3]` faces and `REAL32[3]` vertices, all little
//! endian. Readers accept the file with or without gzip compression; this
//! writer stores it uncompressed.

use crate::registry::{MeshWriteOptions, MeshWriter};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Result, TriangleMesh};

pub const MZ3_MAGIC: u16 = 0x5A4D;
const ATTR_FACES: u16 = 1;
const ATTR_VERTICES: u16 = 2;

pub struct Mz3Writer;

impl MeshWriter for Mz3Writer {
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path, _: &MeshWriteOptions) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_mz3(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "MZ3"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mz3"]
    }
}

pub fn write_mz3<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    let count = |n: usize, what: &str| {
        u32::try_from(n).map_err(|_| Error::InvalidData(format!("too many {} for MZ3", what)))
    };
    writer.write_u16::<LittleEndian>(MZ3_MAGIC)?;
    writer.write_u16::<LittleEndian>(ATTR_FACES | ATTR_VERTICES)?;
    writer.write_u32::<LittleEndian>(count(mesh.face_count(), "faces")?)?;
    writer.write_u32::<LittleEndian>(count(mesh.vertex_count(), "vertices")?)?;
    writer.write_u32::<LittleEndian>(0)?;

    for f in &mesh.faces {
        for &i in f {
            let index = i32::try_from(i)
                .map_err(|_| Error::InvalidData(format!("vertex index {} too large", i)))?;
            writer.write_i32::<LittleEndian>(index)?;
        }
    }
    for v in &mesh.vertices {
        writer.write_f32::<LittleEndian>(v.x)?;
        writer.write_f32::<LittleEndian>(v.y)?;
        writer.write_f32::<LittleEndian>(v.z)?;
    }
    Ok(())
}

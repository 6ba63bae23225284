//! STL writer
//!
//! Binary layout:
//!
//! ```text
//! UINT8[80]    header
//! UINT32       triangle count
//! foreach triangle
//!     REAL32[3] normal
//!     REAL32[3] vertex 1
//!     REAL32[3] vertex 2
//!     REAL32[3] vertex 3
//!     UINT16    attribute byte count (0)
//! ```

use crate::registry::{MeshWriteOptions, MeshWriter};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Point3f, Result, TriangleMesh, Vector3f};

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Writes binary or ASCII STL. STL stores unshared vertices, so every
/// triangle carries its own three corners.
pub struct StlWriter;

impl MeshWriter for StlWriter {
    fn write_mesh(
        &self,
        mesh: &TriangleMesh,
        path: &Path,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        if options.binary {
            write_stl_binary(mesh, &mut writer)?;
        } else {
            write_stl_ascii(mesh, &mut writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "STL"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["stl"]
    }
}

fn facets(mesh: &TriangleMesh) -> impl Iterator<Item = (Vector3f, [&Point3f; 3])> + '_ {
    mesh.faces.iter().enumerate().map(move |(i, f)| {
        let normal = mesh.face_normal(i).unwrap_or_else(Vector3f::zeros);
        (
            normal,
            [&mesh.vertices[f[0]], &mesh.vertices[f[1]], &mesh.vertices[f[2]]],
        )
    })
}

pub fn write_stl_binary<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    let mut header = [b' '; HEADER_SIZE];
    let text = b"binary STL written by voxmesh";
    header[..text.len()].copy_from_slice(text);
    writer.write_all(&header)?;

    let count = u32::try_from(mesh.faces.len())
        .map_err(|_| Error::InvalidData("too many triangles for STL".to_string()))?;
    writer.write_u32::<LittleEndian>(count)?;

    for (normal, corners) in facets(mesh) {
        for value in normal.iter() {
            writer.write_f32::<LittleEndian>(*value)?;
        }
        for corner in corners {
            writer.write_f32::<LittleEndian>(corner.x)?;
            writer.write_f32::<LittleEndian>(corner.y)?;
            writer.write_f32::<LittleEndian>(corner.z)?;
        }
        writer.write_u16::<LittleEndian>(0)?;
    }
    Ok(())
}

pub fn write_stl_ascii<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "solid voxmesh")?;
    for (n, corners) in facets(mesh) {
        writeln!(writer, "  facet normal {} {} {}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in corners {
            writeln!(writer, "      vertex {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid voxmesh")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    fn quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_binary_size_and_normal() {
        let mut out = Vec::new();
        write_stl_binary(&quad(), &mut out).unwrap();
        assert_eq!(out.len(), HEADER_SIZE + 4 + 2 * 50);
        assert_eq!(LittleEndian::read_u32(&out[80..84]), 2);
        // Normal of the first facet points along +z
        assert_eq!(LittleEndian::read_f32(&out[92..96]), 1.0);
        // Third corner of the second facet
        let start = 84 + 50 + 12 + 24;
        assert_eq!(LittleEndian::read_f32(&out[start..start + 4]), 0.0);
        assert_eq!(LittleEndian::read_f32(&out[start + 4..start + 8]), 1.0);
    }

    #[test]
    fn test_ascii_structure() {
        let mut out = Vec::new();
        write_stl_ascii(&quad(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("solid voxmesh\n"));
        assert_eq!(text.matches("facet normal 0 0 1").count(), 2);
        assert_eq!(text.matches("vertex ").count(), 6);
        assert!(text.trim_end().ends_with("endsolid voxmesh"));
    }
}

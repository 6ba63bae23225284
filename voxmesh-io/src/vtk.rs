//! Legacy VTK polydata writer

use crate::registry::{MeshWriteOptions, MeshWriter};
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Result, TriangleMesh};

/// Writes legacy VTK `POLYDATA`. Binary legacy VTK is big endian.
pub struct VtkWriter;

impl MeshWriter for VtkWriter {
    fn write_mesh(
        &self,
        mesh: &TriangleMesh,
        path: &Path,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_vtk(mesh, &mut writer, options.binary)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "VTK"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["vtk"]
    }
}

pub fn write_vtk<W: Write>(mesh: &TriangleMesh, writer: &mut W, binary: bool) -> Result<()> {
    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "voxmesh surface")?;
    writeln!(writer, "{}", if binary { "BINARY" } else { "ASCII" })?;
    writeln!(writer, "DATASET POLYDATA")?;

    writeln!(writer, "POINTS {} float", mesh.vertex_count())?;
    for v in &mesh.vertices {
        if binary {
            writer.write_f32::<BigEndian>(v.x)?;
            writer.write_f32::<BigEndian>(v.y)?;
            writer.write_f32::<BigEndian>(v.z)?;
        } else {
            writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
        }
    }
    if binary {
        writeln!(writer)?;
    }

    writeln!(writer, "POLYGONS {} {}", mesh.face_count(), mesh.face_count() * 4)?;
    for f in &mesh.faces {
        if binary {
            writer.write_i32::<BigEndian>(3)?;
            for &i in f {
                let index = i32::try_from(i)
                    .map_err(|_| Error::InvalidData(format!("vertex index {} too large", i)))?;
                writer.write_i32::<BigEndian>(index)?;
            }
        } else {
            writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ByteOrder;
    use voxmesh_core::Point3f;

    fn triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 3.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_ascii() {
        let mut out = Vec::new();
        write_vtk(&triangle(), &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "# vtk DataFile Version 3.0\nvoxmesh surface\nASCII\nDATASET POLYDATA\n\
                        POINTS 3 float\n0 0 0\n2 0 0\n0 3 0\nPOLYGONS 1 4\n3 0 1 2\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_binary_is_big_endian() {
        let mut out = Vec::new();
        write_vtk(&triangle(), &mut out, true).unwrap();
        let header = "# vtk DataFile Version 3.0\nvoxmesh surface\nBINARY\nDATASET POLYDATA\nPOINTS 3 float\n";
        assert!(out.starts_with(header.as_bytes()));

        let points = &out[header.len()..header.len() + 36];
        assert_eq!(BigEndian::read_f32(&points[12..16]), 2.0);
        assert_eq!(BigEndian::read_f32(&points[28..32]), 3.0);

        let polygons = b"\nPOLYGONS 1 4\n";
        let rest = &out[header.len() + 36..];
        assert!(rest.starts_with(polygons));
        let cells = &rest[polygons.len()..];
        assert_eq!(cells.len(), 16);
        assert_eq!(BigEndian::read_i32(&cells[0..4]), 3);
        assert_eq!(BigEndian::read_i32(&cells[12..16]), 2);
    }
}

//! FreeSurfer triangle surface writer (`lh.pial` and friends)

use crate::registry::{MeshWriteOptions, MeshWriter};
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Result, TriangleMesh};

/// Three byte magic number of a FreeSurfer triangle file
pub const TRIANGLE_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFE];

pub struct PialWriter;

impl MeshWriter for PialWriter {
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path, _: &MeshWriteOptions) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_pial(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "FreeSurfer"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pial"]
    }
}

pub fn write_pial<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    let to_i32 = |n: usize| {
        i32::try_from(n).map_err(|_| Error::InvalidData(format!("{} exceeds FreeSurfer limits", n)))
    };
    writer.write_all(&TRIANGLE_MAGIC)?;
    writer.write_all(b"created by voxmesh\n\n")?;
    writer.write_i32::<BigEndian>(to_i32(mesh.vertex_count())?)?;
    writer.write_i32::<BigEndian>(to_i32(mesh.face_count())?)?;
    for v in &mesh.vertices {
        writer.write_f32::<BigEndian>(v.x)?;
        writer.write_f32::<BigEndian>(v.y)?;
        writer.write_f32::<BigEndian>(v.z)?;
    }
    for f in &mesh.faces {
        for &i in f {
            writer.write_i32::<BigEndian>(to_i32(i)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ByteOrder;
    use voxmesh_core::Point3f;

    #[test]
    fn test_layout() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(-1.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let mut out = Vec::new();
        write_pial(&mesh, &mut out).unwrap();

        assert_eq!(&out[..3], &TRIANGLE_MAGIC);
        let text_end = 3 + b"created by voxmesh\n\n".len();
        assert_eq!(&out[3..text_end], b"created by voxmesh\n\n");
        let body = &out[text_end..];
        assert_eq!(BigEndian::read_i32(&body[0..4]), 3);
        assert_eq!(BigEndian::read_i32(&body[4..8]), 1);
        assert_eq!(BigEndian::read_f32(&body[8..12]), -1.0);
        assert_eq!(body.len(), 8 + 36 + 12);
        assert_eq!(BigEndian::read_i32(&body[body.len() - 4..]), 2);
    }
}

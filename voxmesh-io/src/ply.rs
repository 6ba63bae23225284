//! PLY writer

use crate::registry::{MeshWriteOptions, MeshWriter};
use ply_rs::{
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Result, TriangleMesh};

/// Writes PLY, binary little endian or ASCII.
pub struct PlyWriter;

impl MeshWriter for PlyWriter {
    fn write_mesh(
        &self,
        mesh: &TriangleMesh,
        path: &Path,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_ply(mesh, &mut writer, options.binary)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "PLY"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ply"]
    }
}

pub fn write_ply<W: Write>(mesh: &TriangleMesh, writer: &mut W, binary: bool) -> Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = if binary {
        Encoding::BinaryLittleEndian
    } else {
        Encoding::Ascii
    };

    // Define vertex element
    let mut vertex_element = ElementDef::new("vertex".to_string());
    vertex_element.count = mesh.vertices.len();
    for name in ["x", "y", "z"] {
        vertex_element.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    ply.header.elements.add(vertex_element);

    // Define face element
    let mut face_element = ElementDef::new("face".to_string());
    face_element.count = mesh.faces.len();
    face_element.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    ply.header.elements.add(face_element);

    let vertices = mesh
        .vertices
        .iter()
        .map(|v| {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(v.x));
            element.insert("y".to_string(), Property::Float(v.y));
            element.insert("z".to_string(), Property::Float(v.z));
            element
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let mut faces = Vec::with_capacity(mesh.faces.len());
    for face in &mesh.faces {
        let indices = face
            .iter()
            .map(|&i| {
                i32::try_from(i).map_err(|_| {
                    Error::InvalidData(format!("vertex index {} does not fit PLY int", i))
                })
            })
            .collect::<Result<Vec<i32>>>()?;
        let mut element = DefaultElement::new();
        element.insert("vertex_indices".to_string(), Property::ListInt(indices));
        faces.push(element);
    }
    ply.payload.insert("face".to_string(), faces);

    Writer::new().write_ply(writer, &mut ply)?;
    Ok(())
}

//! GIFTI surface writer
//!
//! Writes a `POINTSET` array of `Float32` coordinates and a `TRIANGLE`
//! array of `Int32` indices. Binary mode stores each array as base64 of
//! little endian values, otherwise the values are written as ASCII text.

use crate::registry::{MeshWriteOptions, MeshWriter};
use base64::{engine::general_purpose::STANDARD, Engine};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use voxmesh_core::{Error, Result, TriangleMesh};

pub struct GiftiWriter;

impl MeshWriter for GiftiWriter {
    fn write_mesh(
        &self,
        mesh: &TriangleMesh,
        path: &Path,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_gifti(mesh, &mut writer, options.binary)?;
        writer.flush()?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "GIFTI"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gii"]
    }
}

pub fn write_gifti<W: Write>(mesh: &TriangleMesh, writer: &mut W, binary: bool) -> Result<()> {
    let encoding = if binary { "Base64Binary" } else { "ASCII" };

    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<!DOCTYPE GIFTI SYSTEM "http://www.nitrc.org/frs/download.php/115/gifti.dtd">"#
    )?;
    writeln!(writer, r#"<GIFTI Version="1.0" NumberOfDataArrays="2">"#)?;
    writeln!(writer, "<MetaData/>")?;
    writeln!(writer, "<LabelTable/>")?;

    // Vertex coordinates
    write_array_open(
        writer,
        "NIFTI_INTENT_POINTSET",
        "NIFTI_TYPE_FLOAT32",
        mesh.vertex_count(),
        encoding,
    )?;
    writeln!(writer, "<CoordinateSystemTransformMatrix>")?;
    writeln!(writer, "<DataSpace><![CDATA[NIFTI_XFORM_UNKNOWN]]></DataSpace>")?;
    writeln!(
        writer,
        "<TransformedSpace><![CDATA[NIFTI_XFORM_UNKNOWN]]></TransformedSpace>"
    )?;
    writeln!(
        writer,
        "<MatrixData>1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1</MatrixData>"
    )?;
    writeln!(writer, "</CoordinateSystemTransformMatrix>")?;
    if binary {
        let mut raw: Vec<u8> = Vec::with_capacity(mesh.vertex_count() * 12);
        for v in &mesh.vertices {
            raw.write_f32::<LittleEndian>(v.x)?;
            raw.write_f32::<LittleEndian>(v.y)?;
            raw.write_f32::<LittleEndian>(v.z)?;
        }
        write_data(writer, &STANDARD.encode(raw))?;
    } else {
        write_ascii_rows(writer, mesh.vertices.iter().map(|v| [v.x, v.y, v.z]))?;
    }
    writeln!(writer, "</DataArray>")?;

    // Triangles
    write_array_open(
        writer,
        "NIFTI_INTENT_TRIANGLE",
        "NIFTI_TYPE_INT32",
        mesh.face_count(),
        encoding,
    )?;
    let faces = mesh
        .faces
        .iter()
        .map(|f| -> Result<[i32; 3]> {
            let mut row = [0i32; 3];
            for (out, &i) in row.iter_mut().zip(f) {
                *out = i32::try_from(i)
                    .map_err(|_| Error::InvalidData(format!("vertex index {} too large", i)))?;
            }
            Ok(row)
        })
        .collect::<Result<Vec<[i32; 3]>>>()?;
    if binary {
        let mut raw: Vec<u8> = Vec::with_capacity(faces.len() * 12);
        for row in &faces {
            for &i in row {
                raw.write_i32::<LittleEndian>(i)?;
            }
        }
        write_data(writer, &STANDARD.encode(raw))?;
    } else {
        write_ascii_rows(writer, faces.into_iter())?;
    }
    writeln!(writer, "</DataArray>")?;
    writeln!(writer, "</GIFTI>")?;
    Ok(())
}

fn write_array_open<W: Write>(
    writer: &mut W,
    intent: &str,
    datatype: &str,
    rows: usize,
    encoding: &str,
) -> Result<()> {
    writeln!(
        writer,
        r#"<DataArray Intent="{}" DataType="{}" ArrayIndexingOrder="RowMajorOrder" Dimensionality="2" Dim0="{}" Dim1="3" Encoding="{}" Endian="LittleEndian" ExternalFileName="" ExternalFileOffset="">"#,
        intent, datatype, rows, encoding
    )?;
    writeln!(writer, "<MetaData/>")?;
    Ok(())
}

fn write_data<W: Write>(writer: &mut W, payload: &str) -> Result<()> {
    writeln!(writer, "<Data>{}</Data>", payload)?;
    Ok(())
}

fn write_ascii_rows<W, I, T>(writer: &mut W, rows: I) -> Result<()>
where
    W: Write,
    I: Iterator<Item = [T; 3]>,
    T: Display,
{
    writeln!(writer, "<Data>")?;
    for [a, b, c] in rows {
        writeln!(writer, "{} {} {}", a, b, c)?;
    }
    writeln!(writer, "</Data>")?;
    Ok(())
}

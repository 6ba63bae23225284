//! Mesh writer registry
//!
//! Writers are registered under the file extensions they handle, so the
//! output format is resolved once from the destination path and the
//! pipeline never needs to know which format it is producing.

use crate::{gifti, mz3, obj, pial, ply, stl, vtk};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use voxmesh_core::{Error, Result, TriangleMesh};

/// Options shared by all mesh writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshWriteOptions {
    /// Prefer the binary encoding when the format has one
    pub binary: bool,
}

impl Default for MeshWriteOptions {
    fn default() -> Self {
        Self { binary: true }
    }
}

impl MeshWriteOptions {
    #[must_use]
    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }
}

/// Trait for writing meshes to files
pub trait MeshWriter: Send + Sync {
    /// Write a mesh to the given path
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path, options: &MeshWriteOptions)
        -> Result<()>;

    /// Get the format name this writer handles
    fn format_name(&self) -> &'static str;

    /// Lowercase file extensions, without the dot
    fn extensions(&self) -> &'static [&'static str];
}

/// Registry that maps file extensions to mesh writers
pub struct MeshWriterRegistry {
    writers: HashMap<String, Arc<dyn MeshWriter>>,
}

impl MeshWriterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            writers: HashMap::new(),
        }
    }

    /// Create a registry with every built-in writer
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(gifti::GiftiWriter));
        registry.register(Box::new(mz3::Mz3Writer));
        registry.register(Box::new(obj::ObjWriter));
        registry.register(Box::new(pial::PialWriter));
        registry.register(Box::new(ply::PlyWriter));
        registry.register(Box::new(stl::StlWriter));
        registry.register(Box::new(vtk::VtkWriter));
        registry
    }

    /// Register a writer under each of its extensions, replacing any
    /// writer previously registered for them.
    pub fn register(&mut self, writer: Box<dyn MeshWriter>) {
        let writer: Arc<dyn MeshWriter> = Arc::from(writer);
        for ext in writer.extensions() {
            self.writers.insert(ext.to_lowercase(), Arc::clone(&writer));
        }
    }

    /// Find the writer for the extension of `path`
    pub fn writer_for_path(&self, path: &Path) -> Result<&dyn MeshWriter> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "{} has no extension; expected one of {}",
                    path.display(),
                    self.supported_extensions().join(", ")
                ))
            })?;
        self.writers
            .get(&ext)
            .map(|writer| writer.as_ref())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "no mesh writer for .{}; expected one of {}",
                    ext,
                    self.supported_extensions().join(", ")
                ))
            })
    }

    /// Write a mesh, choosing the format from the path extension
    pub fn write_mesh(
        &self,
        mesh: &TriangleMesh,
        path: &Path,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        let writer = self.writer_for_path(path)?;
        tracing::debug!(
            format = writer.format_name(),
            path = %path.display(),
            vertices = mesh.vertex_count(),
            triangles = mesh.face_count(),
            "writing mesh"
        );
        writer.write_mesh(mesh, path, options)
    }

    /// Registered extensions, sorted
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.writers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Check if an extension is supported
    pub fn supports(&self, ext: &str) -> bool {
        self.writers.contains_key(&ext.to_lowercase())
    }
}

impl Default for MeshWriterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_extensions() {
        let registry = MeshWriterRegistry::default();
        for ext in ["gii", "mz3", "obj", "ply", "pial", "stl", "vtk"] {
            assert!(registry.supports(ext), "missing {}", ext);
        }
        assert!(registry.supports("OBJ"));
        assert!(!registry.supports("nii"));
    }

    #[test]
    fn test_writer_for_path() {
        let registry = MeshWriterRegistry::with_defaults();
        let writer = registry.writer_for_path(Path::new("out/lh.pial")).unwrap();
        assert_eq!(writer.format_name(), "FreeSurfer");
        let writer = registry.writer_for_path(Path::new("MESH.GII")).unwrap();
        assert_eq!(writer.format_name(), "GIFTI");
    }

    #[test]
    fn test_unknown_extension() {
        let registry = MeshWriterRegistry::with_defaults();
        let err = registry
            .writer_for_path(Path::new("mesh.xyz"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(err.to_string().contains("obj"));
        assert!(registry.writer_for_path(Path::new("mesh")).is_err());
    }

    #[test]
    fn test_multiple_extensions() {
        struct Multi;
        impl MeshWriter for Multi {
            fn write_mesh(
                &self,
                mesh: &TriangleMesh,
                path: &Path,
                options: &MeshWriteOptions,
            ) -> Result<()> {
                obj::ObjWriter.write_mesh(mesh, path, options)
            }
            fn format_name(&self) -> &'static str {
                "wavefront"
            }
            fn extensions(&self) -> &'static [&'static str] {
                &["wobj", "obj2"]
            }
        }

        let dir = tempdir().unwrap();
        let mut registry = MeshWriterRegistry::new();
        registry.register(Box::new(Multi));
        assert!(registry.supports("wobj"));
        assert!(registry.supports("obj2"));
        assert_eq!(registry.supported_extensions(), vec!["obj2", "wobj"]);

        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                voxmesh_core::Point3f::new(0.0, 0.0, 0.0),
                voxmesh_core::Point3f::new(1.0, 0.0, 0.0),
                voxmesh_core::Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let path = dir.path().join("tri.wobj");
        registry
            .write_mesh(&mesh, &path, &MeshWriteOptions::default())
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("f 1 2 3"));
    }
}

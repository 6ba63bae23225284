//! File level tests for volume loading and mesh writing

use std::path::Path;
use tempfile::tempdir;
use voxmesh_core::{Point3f, ScalarVolume, Transform3D, TriangleMesh};
use voxmesh_io::{read_nifti, write_mesh, write_nifti, MeshWriteOptions, MeshWriterRegistry};

fn tetrahedron() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
}

#[test]
fn test_every_format_writes_a_file() {
    let dir = tempdir().unwrap();
    let registry = MeshWriterRegistry::with_defaults();
    let mesh = tetrahedron();

    for binary in [true, false] {
        let options = MeshWriteOptions::default().with_binary(binary);
        for ext in registry.supported_extensions() {
            let path = dir.path().join(format!("tet_{}.{}", binary, ext));
            registry.write_mesh(&mesh, &path, &options).unwrap();
            let size = std::fs::metadata(&path).unwrap().len();
            assert!(size > 0, "{} is empty", path.display());
        }
    }
}

#[test]
fn test_write_mesh_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tet.off");
    assert!(write_mesh(&tetrahedron(), &path, &MeshWriteOptions::default()).is_err());
    assert!(!path.exists());
}

#[test]
fn test_write_to_missing_directory_fails() {
    let path = Path::new("/nonexistent-dir/voxmesh/tet.obj");
    let err = write_mesh(&tetrahedron(), path, &MeshWriteOptions::default()).unwrap_err();
    assert!(matches!(err, voxmesh_core::Error::Io(_)));
}

#[test]
fn test_nifti_roundtrip_keeps_geometry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ball.nii");
    let volume = ScalarVolume::from_fn([9, 8, 7], |x, y, z| {
        let d = ((x as f32 - 4.0).powi(2) + (y as f32 - 4.0).powi(2) + (z as f32 - 3.0).powi(2))
            .sqrt();
        3.0 - d
    })
    .with_affine(Transform3D::from_rows(
        [-1.0, 0.0, 0.0, 90.0],
        [0.0, 1.0, 0.0, -126.0],
        [0.0, 0.0, 1.0, -72.0],
    ));

    write_nifti(&volume, &path).unwrap();
    let loaded = read_nifti(&path).unwrap();
    assert_eq!(loaded, volume);
    assert!(loaded.affine.is_mirroring());
}

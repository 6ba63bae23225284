//! Core traits for voxmesh

use crate::{mesh::TriangleMesh, transform::Transform3D};

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

impl Transformable for TriangleMesh {
    /// Maps every vertex. A mirroring transform also flips the winding so
    /// faces keep pointing outward.
    fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        if transform.is_mirroring() {
            self.flip_winding();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point3f;
    use nalgebra::Vector3;

    fn make_tetrahedron() -> TriangleMesh {
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
    fn test_mirror_keeps_outward_winding() {
        let mut mesh = make_tetrahedron();
        assert!(mesh.signed_volume() > 0.0);
        mesh.transform(&Transform3D::scaling(Vector3::new(-2.0, 1.0, 1.0)));
        assert_eq!(mesh.vertices[1], Point3f::new(-2.0, 0.0, 0.0));
        assert!(mesh.signed_volume() > 0.0);
    }
}

//! Affine transformation utilities

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D affine transformation, typically voxel to world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f64>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a scaling transformation
    pub fn scaling(scale: Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&scale),
        }
    }

    /// Build from the three rows of a 3x4 affine (NIfTI srow_x/y/z).
    pub fn from_rows(row_x: [f32; 4], row_y: [f32; 4], row_z: [f32; 4]) -> Self {
        let mut matrix = Matrix4::identity();
        for (r, row) in [row_x, row_y, row_z].iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                matrix[(r, c)] = value as f64;
            }
        }
        Self { matrix }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let p = Point3::new(point.x as f64, point.y as f64, point.z as f64);
        let h = self.matrix * p.to_homogeneous();
        match Point3::from_homogeneous(h) {
            Some(q) => Point3::new(q.x as f32, q.y as f32, q.z as f32),
            None => *point,
        }
    }

    /// The linear 3x3 part
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Determinant of the linear part. Negative means the map mirrors space.
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    /// True when the transform reverses orientation.
    pub fn is_mirroring(&self) -> bool {
        self.determinant() < 0.0
    }

    /// Compose this transformation with another
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse transformation
    pub fn inverse(self) -> Option<Self> {
        self.matrix
            .try_inverse()
            .map(|inv_matrix| Self { matrix: inv_matrix })
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.matrix - Matrix4::identity()).norm() < epsilon
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f64>> for Transform3D {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

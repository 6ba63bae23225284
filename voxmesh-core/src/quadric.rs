//! Quadric error metric

use crate::point::*;
use nalgebra::{Matrix4, Vector4};
use std::ops::{Add, AddAssign};

/// Symmetric 4x4 quadric measuring squared distance to a set of planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric {
    pub matrix: Matrix4<f64>,
}

impl Quadric {
    pub fn zero() -> Self {
        Self {
            matrix: Matrix4::zeros(),
        }
    }

    /// Quadric of the plane `ax + by + cz + d = 0` with unit normal (a, b, c).
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        Self {
            matrix: plane * plane.transpose(),
        }
    }

    /// Plane quadric of a triangle. Degenerate triangles give the zero quadric.
    pub fn from_triangle(v0: &Point3d, v1: &Point3d, v2: &Point3d) -> Self {
        match compute_plane(v0, v1, v2) {
            Some(plane) => Self::from_plane(&plane),
            None => Self::zero(),
        }
    }

    /// vᵗQv for the homogeneous point (x, y, z, 1).
    pub fn evaluate(&self, point: &Point3d) -> f64 {
        let v = Vector4::new(point.x, point.y, point.z, 1.0);
        (v.transpose() * self.matrix * v)[(0, 0)]
    }

    /// Position minimizing the error, `None` when the system is singular.
    pub fn optimal_position(&self) -> Option<Point3d> {
        let mut m = self.matrix;
        m[(3, 0)] = 0.0;
        m[(3, 1)] = 0.0;
        m[(3, 2)] = 0.0;
        m[(3, 3)] = 1.0;

        let det = m.fixed_view::<3, 3>(0, 0).determinant();
        if det.abs() < 1e-12 {
            return None;
        }

        let inv = m.try_inverse()?;
        let sol = inv * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let p = Point3d::new(sol.x, sol.y, sol.z);
        if p.coords.iter().all(|c| c.is_finite()) {
            Some(p)
        } else {
            None
        }
    }
}

impl Default for Quadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            matrix: self.matrix + rhs.matrix,
        }
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.matrix += rhs.matrix;
    }
}

/// Plane `[a, b, c, d]` through three points with unit normal.
pub fn compute_plane(v0: &Point3d, v1: &Point3d, v2: &Point3d) -> Option<Vector4<f64>> {
    let normal = (v1 - v0).cross(&(v2 - v0));
    let len = normal.norm();
    if len < 1e-12 || !len.is_finite() {
        return None;
    }
    let n = normal / len;
    let d = -n.dot(&v0.coords);
    Some(Vector4::new(n.x, n.y, n.z, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_quadric_distance() {
        let q = Quadric::from_triangle(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(q.evaluate(&Point3d::new(5.0, -3.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 0.0, 2.0)), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_optimal_position_three_planes() {
        let origin = Point3d::origin();
        let x = Point3d::new(1.0, 0.0, 0.0);
        let y = Point3d::new(0.0, 1.0, 0.0);
        let z = Point3d::new(0.0, 0.0, 1.0);
        let mut q = Quadric::from_triangle(&origin, &x, &y);
        q += Quadric::from_triangle(&origin, &y, &z);
        q += Quadric::from_triangle(&origin, &z, &x);

        let p = q.optimal_position().unwrap();
        assert_relative_eq!(p.coords.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_single_plane_is_singular() {
        let q = Quadric::from_triangle(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.0, 1.0, 0.0),
        );
        assert!(q.optimal_position().is_none());
    }

    #[test]
    fn test_degenerate_triangle() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 1.0, 1.0);
        assert!(compute_plane(&a, &b, &b).is_none());
        assert_eq!(Quadric::from_triangle(&a, &b, &b), Quadric::zero());
    }
}

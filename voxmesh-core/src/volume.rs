//! Scalar voxel volumes

use crate::error::{Error, Result};
use crate::transform::Transform3D;
use ndarray::{Array3, ShapeBuilder};

/// A dense 3D grid of intensities with its voxel to world affine.
///
/// Data is indexed `[x, y, z]` and stored with x varying fastest, matching
/// the on-disk order of NIfTI images.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume {
    pub data: Array3<f32>,
    pub affine: Transform3D,
}

impl ScalarVolume {
    pub fn new(data: Array3<f32>, affine: Transform3D) -> Self {
        Self { data, affine }
    }

    /// Build from values laid out x fastest, then y, then z.
    pub fn from_vec(dims: [usize; 3], values: Vec<f32>, affine: Transform3D) -> Result<Self> {
        let expected = dims[0] * dims[1] * dims[2];
        if values.len() != expected {
            return Err(Error::InvalidData(format!(
                "volume {}x{}x{} needs {} values, got {}",
                dims[0],
                dims[1],
                dims[2],
                expected,
                values.len()
            )));
        }
        let data = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), values)
            .map_err(|e| Error::InvalidData(e.to_string()))?;
        Ok(Self { data, affine })
    }

    /// Build by evaluating `f(x, y, z)` at every voxel, identity affine.
    pub fn from_fn<F>(dims: [usize; 3], mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        let data = Array3::from_shape_fn((dims[0], dims[1], dims[2]).f(), |(x, y, z)| f(x, y, z));
        Self {
            data,
            affine: Transform3D::identity(),
        }
    }

    /// Grid dimensions `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[[x, y, z]]
    }

    /// Linear index of a voxel in x-fastest order.
    #[inline]
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        let [nx, ny, _] = self.dims();
        x + nx * (y + ny * z)
    }

    /// All values in x-fastest order.
    pub fn to_vec(&self) -> Vec<f32> {
        // reversed axes iterate x fastest regardless of memory layout
        self.data.t().iter().copied().collect()
    }

    /// Minimum and maximum finite intensity, `None` when there is none.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// New volume with `f` applied to every voxel, same geometry.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        let [nx, ny, nz] = self.dims();
        let data = Array3::from_shape_fn((nx, ny, nz).f(), |(x, y, z)| f(self.data[[x, y, z]]));
        Self {
            data,
            affine: self.affine,
        }
    }

    pub fn with_affine(mut self, affine: Transform3D) -> Self {
        self.affine = affine;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_layout() {
        let values: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let vol = ScalarVolume::from_vec([2, 3, 4], values.clone(), Transform3D::identity()).unwrap();
        assert_eq!(vol.dims(), [2, 3, 4]);
        assert_eq!(vol.get(1, 0, 0), 1.0);
        assert_eq!(vol.get(0, 1, 0), 2.0);
        assert_eq!(vol.get(0, 0, 1), 6.0);
        assert_eq!(vol.linear_index(1, 2, 3), 1 + 2 * (2 + 3 * 3));
        assert_eq!(vol.to_vec(), values);
    }

    #[test]
    fn test_from_vec_wrong_length() {
        let err = ScalarVolume::from_vec([2, 2, 2], vec![0.0; 7], Transform3D::identity());
        assert!(matches!(err, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_value_range_and_map() {
        let vol = ScalarVolume::from_fn([3, 3, 3], |x, y, z| (x + y + z) as f32);
        assert_eq!(vol.value_range(), Some((0.0, 6.0)));

        let doubled = vol.map(|v| v * 2.0);
        assert_eq!(doubled.get(2, 2, 2), 12.0);
        assert_eq!(doubled.to_vec().len(), 27);
    }

    #[test]
    fn test_empty_volume() {
        let vol = ScalarVolume::from_fn([0, 4, 4], |_, _, _| 1.0);
        assert!(vol.is_empty());
        assert_eq!(vol.value_range(), None);
    }
}

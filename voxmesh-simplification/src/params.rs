//! Parameters for quadric decimation.

/// What the decimator aims for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecimationTarget {
    /// Stop once the mesh has at most this many triangles
    Triangles(usize),
    /// Keep this fraction of the input triangles (0.0 to 1.0)
    Ratio(f64),
    /// Only remove geometry whose collapse costs nothing
    Lossless,
}

impl DecimationTarget {
    /// Triangle budget for a mesh with `original` triangles, `None` for lossless.
    #[must_use]
    pub fn resolve(&self, original: usize) -> Option<usize> {
        match *self {
            DecimationTarget::Triangles(n) => Some(n),
            DecimationTarget::Ratio(r) => {
                let r = if r.is_finite() { r.clamp(0.0, 1.0) } else { 1.0 };
                Some((original as f64 * r).round() as usize)
            }
            DecimationTarget::Lossless => None,
        }
    }
}

/// Parameters for mesh decimation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimateParams {
    /// Triangle target. Default: keep 25% of the triangles
    pub target: DecimationTarget,

    /// Growth rate of the per-pass error threshold. Higher values collapse
    /// more per pass with less care. Default: 7.0
    pub aggressiveness: f64,

    /// Run a lossless cleanup after reaching the target. Default: false
    pub finish_lossless: bool,

    /// Upper bound on collapse passes per phase. Default: 100
    pub max_passes: usize,
}

impl Default for DecimateParams {
    fn default() -> Self {
        Self {
            target: DecimationTarget::Ratio(0.25),
            aggressiveness: 7.0,
            finish_lossless: false,
            max_passes: 100,
        }
    }
}

impl DecimateParams {
    /// Create params targeting a specific triangle count.
    #[must_use]
    pub fn with_target_triangles(count: usize) -> Self {
        Self {
            target: DecimationTarget::Triangles(count),
            ..Default::default()
        }
    }

    /// Create params targeting a ratio of original triangles.
    #[must_use]
    pub fn with_target_ratio(ratio: f64) -> Self {
        Self {
            target: DecimationTarget::Ratio(ratio.clamp(0.0, 1.0)),
            ..Default::default()
        }
    }

    /// Create params that only perform zero-cost collapses.
    #[must_use]
    pub fn lossless() -> Self {
        Self {
            target: DecimationTarget::Lossless,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn aggressiveness(mut self, aggressiveness: f64) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    #[must_use]
    pub fn finish_lossless(mut self, enabled: bool) -> Self {
        self.finish_lossless = enabled;
        self
    }

    #[must_use]
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    /// Smallest cosine allowed between a face normal before and after a
    /// collapse.
    #[must_use]
    pub fn min_normal_cosine(&self) -> f64 {
        if self.aggressiveness > 0.0 {
            (1.4 / self.aggressiveness).clamp(0.0, 0.9)
        } else {
            0.9
        }
    }

    /// Error threshold for zero-based pass `pass`.
    #[must_use]
    pub fn pass_threshold(&self, pass: usize) -> f64 {
        1e-9 * ((pass + 3) as f64).powf(self.aggressiveness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = DecimateParams::default();
        assert_eq!(params.target, DecimationTarget::Ratio(0.25));
        assert_eq!(params.aggressiveness, 7.0);
        assert!(!params.finish_lossless);
        assert_eq!(params.max_passes, 100);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(DecimationTarget::Ratio(0.25).resolve(1000), Some(250));
        assert_eq!(DecimationTarget::Ratio(0.5).resolve(5), Some(3));
        assert_eq!(DecimationTarget::Ratio(7.0).resolve(10), Some(10));
        assert_eq!(DecimationTarget::Triangles(12).resolve(1000), Some(12));
        assert_eq!(DecimationTarget::Lossless.resolve(1000), None);
    }

    #[test]
    fn test_threshold_grows() {
        let params = DecimateParams::default();
        assert!(params.pass_threshold(0) < params.pass_threshold(1));
        assert!((params.pass_threshold(0) - 1e-9 * 3f64.powi(7)).abs() < 1e-15);
    }

    #[test]
    fn test_normal_tolerance() {
        assert!((DecimateParams::default().min_normal_cosine() - 0.2).abs() < 1e-12);
        assert_eq!(DecimateParams::default().aggressiveness(1.0).min_normal_cosine(), 0.9);
        assert_eq!(DecimateParams::default().aggressiveness(0.0).min_normal_cosine(), 0.9);
    }
}

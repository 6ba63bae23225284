//! Automatic isolevel selection from the intensity histogram

use std::fmt;
use std::str::FromStr;
use tracing::debug;
use voxmesh_core::{Error, Result, ScalarVolume};

/// Number of histogram bins used for threshold selection.
pub const HISTOGRAM_BINS: usize = 1000;

/// How the isolevel is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IsoMode {
    /// Low threshold, keeps faint structure
    Dark,
    /// Balanced separation of foreground and background
    #[default]
    Medium,
    /// High threshold, keeps only intense foreground
    Bright,
    /// Explicit isolevel
    Value(f32),
}

impl FromStr for IsoMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "dark" => Ok(IsoMode::Dark),
            "m" | "medium" => Ok(IsoMode::Medium),
            "b" | "bright" => Ok(IsoMode::Bright),
            other => other
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(IsoMode::Value)
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "isolevel must be d, m, b or a number, got '{}'",
                        s
                    ))
                }),
        }
    }
}

impl fmt::Display for IsoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsoMode::Dark => write!(f, "dark"),
            IsoMode::Medium => write!(f, "medium"),
            IsoMode::Bright => write!(f, "bright"),
            IsoMode::Value(v) => write!(f, "{}", v),
        }
    }
}

struct Histogram {
    counts: Vec<u64>,
    lo: f64,
    width: f64,
}

impl Histogram {
    fn threshold_at(&self, bin: usize) -> f32 {
        (self.lo + bin as f64 * self.width) as f32
    }
}

/// Pick an isolevel for `volume`.
///
/// Voxels equal to the volume minimum are background and ignored. The medium
/// level is the Otsu split of the remaining intensities, dark and bright are
/// Otsu splits of the lower and upper halves, so dark <= medium <= bright.
pub fn select_isolevel(volume: &ScalarVolume, mode: IsoMode) -> Result<f32> {
    if let IsoMode::Value(v) = mode {
        return Ok(v);
    }

    let (min, _) = volume.value_range().ok_or_else(|| {
        Error::Algorithm("cannot select a threshold for an empty volume".to_string())
    })?;

    let (fg_lo, fg_hi) = volume
        .data
        .iter()
        .filter(|v| v.is_finite() && **v > min)
        .fold(None, |acc: Option<(f32, f32)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or_else(|| {
            Error::Algorithm("no voxels brighter than the background".to_string())
        })?;

    if fg_hi <= fg_lo {
        // Binary image: split halfway between background and foreground.
        let level = min + (fg_lo - min) * 0.5;
        debug!(min, foreground = fg_lo, level, "single foreground intensity");
        return Ok(level);
    }

    let hist = build_histogram(volume, min, fg_lo, fg_hi);
    let full = hist.counts.len();
    let medium = otsu_split(&hist.counts, 0, full).unwrap_or(full / 2);

    let split = match mode {
        IsoMode::Dark => otsu_split(&hist.counts, 0, medium).unwrap_or(medium),
        IsoMode::Bright => otsu_split(&hist.counts, medium, full).unwrap_or(medium),
        _ => medium,
    };

    let level = hist.threshold_at(split);
    debug!(%mode, min, fg_lo, fg_hi, bin = split, level, "selected isolevel");
    Ok(level)
}

fn build_histogram(volume: &ScalarVolume, background: f32, lo: f32, hi: f32) -> Histogram {
    let lo = lo as f64;
    let width = (hi as f64 - lo) / HISTOGRAM_BINS as f64;
    let mut counts = vec![0u64; HISTOGRAM_BINS];
    for &v in volume.data.iter() {
        if !v.is_finite() || v <= background {
            continue;
        }
        let bin = (((v as f64 - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    Histogram { counts, lo, width }
}

/// Otsu split index `t` in `(start, end)` maximizing between-class variance
/// of bins `[start, t)` and `[t, end)`. `None` when no split separates mass.
fn otsu_split(counts: &[u64], start: usize, end: usize) -> Option<usize> {
    if end <= start + 1 {
        return None;
    }
    let total: f64 = counts[start..end].iter().map(|&c| c as f64).sum();
    let weighted: f64 = counts[start..end]
        .iter()
        .enumerate()
        .map(|(i, &c)| (start + i) as f64 * c as f64)
        .sum();
    if total == 0.0 {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    let mut w0 = 0.0;
    let mut sum0 = 0.0;
    for t in (start + 1)..end {
        let c = counts[t - 1] as f64;
        w0 += c;
        sum0 += (t - 1) as f64 * c;
        let w1 = total - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }
        let mu0 = sum0 / w0;
        let mu1 = (weighted - sum0) / w1;
        let between = w0 * w1 * (mu0 - mu1) * (mu0 - mu1);
        if best.map_or(true, |(_, b)| between > b) {
            best = Some((t, between));
        }
    }
    best.map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn graded_volume() -> ScalarVolume {
        // background 0, a dim shell ramping up to a bright core
        ScalarVolume::from_fn([24, 24, 24], |x, y, z| {
            let d = ((x as f32 - 12.0).powi(2) + (y as f32 - 12.0).powi(2) + (z as f32 - 12.0).powi(2))
                .sqrt();
            if d < 4.0 {
                900.0 + d
            } else if d < 7.0 {
                400.0 + 10.0 * d
            } else if d < 10.0 {
                100.0 + 5.0 * d
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_explicit_value_passthrough() {
        let vol = graded_volume();
        assert_eq!(select_isolevel(&vol, IsoMode::Value(12.5)).unwrap(), 12.5);
    }

    #[test]
    fn test_monotone_modes() {
        let vol = graded_volume();
        let dark = select_isolevel(&vol, IsoMode::Dark).unwrap();
        let medium = select_isolevel(&vol, IsoMode::Medium).unwrap();
        let bright = select_isolevel(&vol, IsoMode::Bright).unwrap();
        assert!(dark <= medium, "dark {} > medium {}", dark, medium);
        assert!(medium <= bright, "medium {} > bright {}", medium, bright);
        assert!(dark > 0.0);
        assert!(bright < 905.0);
    }

    /// Random intensities drawn from a few differently shaped distributions
    fn random_volume(rng: &mut StdRng, kind: usize) -> ScalarVolume {
        ScalarVolume::from_fn([12, 12, 12], |_, _, _| match kind {
            // uniform
            0 => rng.gen_range(0.0..1000.0),
            // bimodal: dim tissue and bright tissue over a zero background
            1 => match rng.gen_range(0..3) {
                0 => 0.0,
                1 => rng.gen_range(80.0..120.0),
                _ => rng.gen_range(700.0..900.0),
            },
            // heavy tailed
            2 => {
                let u: f32 = 1.0 - rng.gen::<f32>();
                u.powf(-1.5)
            }
            // negative background, as in CT
            _ => {
                if rng.gen_bool(0.5) {
                    -1024.0
                } else {
                    rng.gen_range(-200.0..1500.0)
                }
            }
        })
    }

    #[test]
    fn test_monotone_modes_random_distributions() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..20 {
            for kind in 0..4 {
                let vol = random_volume(&mut rng, kind);
                let dark = select_isolevel(&vol, IsoMode::Dark).unwrap();
                let medium = select_isolevel(&vol, IsoMode::Medium).unwrap();
                let bright = select_isolevel(&vol, IsoMode::Bright).unwrap();
                assert!(
                    dark <= medium && medium <= bright,
                    "round {} kind {}: {} {} {}",
                    round,
                    kind,
                    dark,
                    medium,
                    bright
                );
            }
        }
    }

    #[test]
    fn test_medium_separates_two_levels() {
        let vol = ScalarVolume::from_fn([10, 10, 10], |x, _, _| match x {
            0..=1 => 0.0,
            2..=5 => 100.0,
            _ => 200.0,
        });
        let medium = select_isolevel(&vol, IsoMode::Medium).unwrap();
        assert!(medium > 100.0 && medium <= 200.0);
    }

    #[test]
    fn test_binary_volume_splits_halfway() {
        let vol = ScalarVolume::from_fn([4, 4, 4], |x, _, _| if x > 1 { 1.0 } else { 0.0 });
        for mode in [IsoMode::Dark, IsoMode::Medium, IsoMode::Bright] {
            assert_eq!(select_isolevel(&vol, mode).unwrap(), 0.5);
        }
    }

    #[test]
    fn test_constant_volume_errors() {
        let vol = ScalarVolume::from_fn([4, 4, 4], |_, _, _| 3.0);
        assert!(matches!(
            select_isolevel(&vol, IsoMode::Medium),
            Err(Error::Algorithm(_))
        ));
    }

    #[test]
    fn test_empty_volume_errors() {
        let vol = ScalarVolume::from_fn([0, 0, 0], |_, _, _| 0.0);
        assert!(select_isolevel(&vol, IsoMode::Dark).is_err());
    }

    #[test]
    fn test_parse_iso_mode() {
        assert_eq!("d".parse::<IsoMode>().unwrap(), IsoMode::Dark);
        assert_eq!("Medium".parse::<IsoMode>().unwrap(), IsoMode::Medium);
        assert_eq!("b".parse::<IsoMode>().unwrap(), IsoMode::Bright);
        assert_eq!("128.5".parse::<IsoMode>().unwrap(), IsoMode::Value(128.5));
        assert!("bogus".parse::<IsoMode>().is_err());
        assert!("nan".parse::<IsoMode>().is_err());
    }
}

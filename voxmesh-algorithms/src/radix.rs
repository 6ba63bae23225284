//! Stable radix ordering of floating point costs

/// Orders collapse candidates by cost in linear time.
///
/// Keys are quantized to `f32` and mapped to order-preserving `u32`s, then
/// sorted with four 8-bit least-significant-digit passes. The sort is stable
/// and NaN keys go last. Scratch buffers are kept between calls.
#[derive(Debug, Default)]
pub struct CandidateSorter {
    keys: Vec<u32>,
    order: Vec<usize>,
    scratch: Vec<usize>,
}

impl CandidateSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of `costs` in ascending cost order.
    pub fn argsort(&mut self, costs: &[f64]) -> &[usize] {
        let n = costs.len();
        self.keys.clear();
        self.keys.extend(costs.iter().map(|&c| order_key(c)));
        self.order.clear();
        self.order.extend(0..n);
        self.scratch.clear();
        self.scratch.resize(n, 0);

        for shift in [0u32, 8, 16, 24] {
            let mut counts = [0usize; 256];
            for &k in &self.keys {
                counts[((k >> shift) & 0xff) as usize] += 1;
            }
            // every key shares this digit
            if counts.iter().any(|&c| c == n) {
                continue;
            }

            let mut total = 0;
            for c in counts.iter_mut() {
                let start = total;
                total += *c;
                *c = start;
            }

            for &i in &self.order {
                let digit = ((self.keys[i] >> shift) & 0xff) as usize;
                self.scratch[counts[digit]] = i;
                counts[digit] += 1;
            }
            std::mem::swap(&mut self.order, &mut self.scratch);
        }

        &self.order
    }
}

/// Map a cost to a `u32` whose unsigned order matches the float order.
#[inline]
fn order_key(cost: f64) -> u32 {
    let f = cost as f32;
    if f.is_nan() {
        return u32::MAX;
    }
    let bits = f.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn test_sorts_ascending() {
        let costs = [3.5, -1.0, 0.0, 1e-9, 100.0, -250.0, 2.0];
        let mut sorter = CandidateSorter::new();
        let order = sorter.argsort(&costs).to_vec();
        let sorted: Vec<f64> = order.iter().map(|&i| costs[i]).collect();
        assert_eq!(sorted, vec![-250.0, -1.0, 0.0, 1e-9, 2.0, 3.5, 100.0]);
    }

    #[test]
    fn test_stable_ties() {
        let costs = [1.0, 0.5, 1.0, 0.5, 1.0];
        let mut sorter = CandidateSorter::new();
        assert_eq!(sorter.argsort(&costs), &[1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_nan_and_infinity_last() {
        let costs = [f64::NAN, f64::INFINITY, 1.0, f64::NEG_INFINITY];
        let mut sorter = CandidateSorter::new();
        assert_eq!(sorter.argsort(&costs), &[3, 2, 1, 0]);
    }

    #[test]
    fn test_reuse_and_empty() {
        let mut sorter = CandidateSorter::new();
        assert!(sorter.argsort(&[]).is_empty());
        assert_eq!(sorter.argsort(&[2.0, 1.0]), &[1, 0]);
        assert_eq!(sorter.argsort(&[5.0]), &[0]);
    }

    #[test]
    fn test_matches_comparison_sort() {
        let mut rng = StdRng::seed_from_u64(42);
        let costs: Vec<f64> = (0..2000)
            .map(|_| rng.gen_range(-50.0..220.0))
            .collect();

        let mut expected: Vec<usize> = (0..costs.len()).collect();
        expected.sort_by(|&a, &b| (costs[a] as f32).total_cmp(&(costs[b] as f32)));

        let mut sorter = CandidateSorter::new();
        assert_eq!(sorter.argsort(&costs), expected.as_slice());
    }
}

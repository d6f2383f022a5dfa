//! Size constraints along one axis and the allocation solver.

/// A size constraint: `min <= preferred <= max`, with a weight that decides
/// who absorbs slack or deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    /// Hard lower bound.
    pub min: u32,
    /// Size requested when space allows.
    pub preferred: u32,
    /// Hard upper bound.
    pub max: u32,
    /// Priority for absorbing leftover space. Zero never grows or shrinks.
    pub weight: u32,
}

impl Default for Dimension {
    fn default() -> Self {
        Self {
            min: 0,
            preferred: 0,
            max: u32::MAX,
            weight: 1,
        }
    }
}

impl Dimension {
    /// A fully constrained size.
    pub fn exact(n: u32) -> Self {
        Self {
            min: n,
            preferred: n,
            max: n,
            weight: 1,
        }
    }

    /// A preferred size with loose bounds.
    pub fn fit(preferred: u32) -> Self {
        Self {
            preferred,
            ..Self::default()
        }
    }

    pub fn with_min(mut self, min: u32) -> Self {
        self.min = min;
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Preferred size forced inside the bounds.
    pub fn clamped_preferred(&self) -> u32 {
        self.preferred.clamp(self.min, self.max)
    }
}

/// Assign sizes along one axis. Each child starts at its clamped preferred
/// size; leftover space is then handed to children in descending weight
/// order (ties broken by index), each growing to its max or shrinking to
/// its min before the next child is touched. When even the bounds cannot
/// absorb the difference, the allocations stay clamped and the caller deals
/// with the mismatch.
pub fn distribute(total: u32, dims: &[Dimension]) -> Vec<u32> {
    let mut alloc: Vec<u32> = dims.iter().map(Dimension::clamped_preferred).collect();
    let sum: u64 = alloc.iter().map(|&a| a as u64).sum();

    let mut order: Vec<usize> = (0..dims.len()).filter(|&i| dims[i].weight > 0).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(dims[i].weight));

    if sum < total as u64 {
        let mut slack = (total as u64 - sum) as u32;
        for &i in &order {
            if slack == 0 {
                break;
            }
            let room = dims[i].max - alloc[i];
            let take = slack.min(room);
            alloc[i] += take;
            slack -= take;
        }
    } else if sum > total as u64 {
        let mut deficit = (sum - total as u64).min(u32::MAX as u64) as u32;
        for &i in &order {
            if deficit == 0 {
                break;
            }
            let room = alloc[i] - dims[i].min;
            let give = deficit.min(room);
            alloc[i] -= give;
            deficit -= give;
        }
    }
    alloc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_fit_unchanged() {
        let dims = [Dimension::fit(3), Dimension::fit(7)];
        assert_eq!(distribute(10, &dims), vec![3, 7]);
    }

    #[test]
    fn slack_goes_to_heaviest_first() {
        let dims = [
            Dimension {
                min: 1,
                preferred: 5,
                max: 10,
                weight: 1,
            },
            Dimension {
                min: 2,
                preferred: 2,
                max: 2,
                weight: 1,
            },
            Dimension {
                min: 1,
                preferred: 3,
                max: 20,
                weight: 2,
            },
        ];
        assert_eq!(distribute(15, &dims), vec![5, 2, 8]);
    }

    #[test]
    fn slack_overflows_to_next_by_index() {
        let dims = [
            Dimension::fit(1).with_max(2),
            Dimension::fit(1).with_max(10),
        ];
        // Equal weights; the first child fills to its max, the rest spills.
        assert_eq!(distribute(10, &dims), vec![2, 8]);
    }

    #[test]
    fn deficit_shrinks_toward_min() {
        let dims = [
            Dimension::fit(8).with_min(2),
            Dimension::fit(8).with_min(2).with_weight(2),
        ];
        assert_eq!(distribute(12, &dims), vec![8, 4]);
        assert_eq!(distribute(5, &dims), vec![3, 2]);
    }

    #[test]
    fn unsatisfiable_stays_clamped() {
        let dims = [Dimension::exact(4), Dimension::exact(4)];
        assert_eq!(distribute(3, &dims), vec![4, 4]);
        assert_eq!(distribute(20, &dims), vec![4, 4]);
    }

    #[test]
    fn zero_weight_is_untouchable() {
        let dims = [
            Dimension::fit(2).with_weight(0),
            Dimension::fit(2).with_max(100),
        ];
        assert_eq!(distribute(10, &dims), vec![2, 8]);
    }

    #[test]
    fn zero_space() {
        let dims = [Dimension::fit(3).with_min(0), Dimension::fit(2).with_min(0)];
        assert_eq!(distribute(0, &dims), vec![0, 0]);
    }

    proptest! {
        #[test]
        fn conservation(
            total in 0u32..200,
            raw in proptest::collection::vec((0u32..20, 0u32..20, 0u32..20, 0u32..4), 1..8)
        ) {
            let dims: Vec<Dimension> = raw
                .iter()
                .map(|&(min, pref, extra, weight)| Dimension {
                    min,
                    preferred: min + pref,
                    max: min + pref + extra,
                    weight,
                })
                .collect();
            let alloc = distribute(total, &dims);
            for (a, d) in alloc.iter().zip(&dims) {
                prop_assert!(*a >= d.min && *a <= d.max);
            }
            let weighted = dims.iter().any(|d| d.weight > 0);
            let min_sum: u32 = dims.iter().map(|d| if d.weight > 0 { d.min } else { d.clamped_preferred() }).sum();
            let max_sum: u64 = dims
                .iter()
                .map(|d| if d.weight > 0 { d.max as u64 } else { d.clamped_preferred() as u64 })
                .sum();
            if weighted && min_sum <= total && total as u64 <= max_sum {
                let sum: u32 = alloc.iter().sum();
                prop_assert_eq!(sum, total);
            }
        }
    }
}

// Copyright 2019 Palantir Technologies, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reservoir samples: statistically representative, bounded-memory subsets of an unbounded
//! stream of `i64` observations.

pub use crate::sample::exp_decay::ExpDecaySample;
pub use crate::sample::uniform::UniformSample;

pub mod exp_decay;
pub mod uniform;

/// A bounded reservoir over an unbounded stream of `i64` values.
pub trait Sample: 'static + Sync + Send {
    /// Adds a value to the sample.
    fn update(&self, value: i64);

    /// Returns the total number of values ever passed to [`update`](Sample::update).
    fn count(&self) -> u64;

    /// Returns the number of values currently retained, always `<= capacity`.
    fn size(&self) -> usize;

    /// Returns a copy of the currently retained values. Order is unspecified.
    fn values(&self) -> Vec<i64>;

    /// Discards every retained value and resets the observation count to 0.
    fn clear(&self);

    /// Freezes the sample's current state into an immutable, statistics-bearing snapshot.
    fn snapshot(&self) -> SampleSnapshot {
        SampleSnapshot::new(self.values(), self.count())
    }
}

/// An immutable, point-in-time view of a [`Sample`]'s retained values and their statistics.
///
/// All statistics are computed eagerly from a single sorted copy of the values taken at
/// construction time; mutating the source sample afterward has no effect on an already-produced
/// snapshot.
#[derive(Debug, Clone)]
pub struct SampleSnapshot {
    values: Vec<i64>,
    count: u64,
}

impl SampleSnapshot {
    /// Creates a snapshot from an unsorted set of retained values and the total update count.
    pub fn new(mut values: Vec<i64>, count: u64) -> SampleSnapshot {
        values.sort_unstable();
        SampleSnapshot { values, count }
    }

    /// Returns the total number of values ever observed by the source sample, not just those
    /// retained.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the number of values retained in this snapshot.
    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Returns the retained values in ascending order.
    #[inline]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Returns the smallest retained value, or 0 if empty.
    #[inline]
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Returns the largest retained value, or 0 if empty.
    #[inline]
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Returns the sum of the retained values.
    #[inline]
    pub fn sum(&self) -> i64 {
        self.values.iter().sum()
    }

    /// Returns the arithmetic mean of the retained values, or 0 if empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.
        } else {
            self.sum() as f64 / self.values.len() as f64
        }
    }

    /// Returns the population variance of the retained values, computed via Welford's online
    /// algorithm.
    pub fn variance(&self) -> f64 {
        if self.values.len() <= 1 {
            return 0.;
        }

        let mut mean = 0.;
        let mut m2 = 0.;
        for (i, &value) in self.values.iter().enumerate() {
            let n = (i + 1) as f64;
            let x = value as f64;
            let delta = x - mean;
            mean += delta / n;
            let delta2 = x - mean;
            m2 += delta * delta2;
        }

        m2 / self.values.len() as f64
    }

    /// Returns the population standard deviation of the retained values.
    #[inline]
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Returns the value at the given quantile (0 to 1 inclusive), or 0 if empty.
    ///
    /// Uses linear interpolation between the two nearest ranks, matching the classic
    /// `percentile(sorted, q)` formula: `pos = q * (n + 1)`, clamped to `[x[0], x[n-1]]`.
    pub fn percentile(&self, quantile: f64) -> f64 {
        percentile(&self.values, quantile)
    }

    /// Returns the values at each of the given quantiles, in the same order as requested.
    ///
    /// The working copy is sorted only once, regardless of how many quantiles are requested
    /// (the snapshot's values are already sorted at construction time).
    pub fn percentiles(&self, quantiles: &[f64]) -> Vec<f64> {
        quantiles.iter().map(|&q| percentile(&self.values, q)).collect()
    }
}

fn percentile(sorted: &[i64], quantile: f64) -> f64 {
    assert!((0. ..=1.).contains(&quantile), "quantile must be in [0, 1]");

    let n = sorted.len();
    if n == 0 {
        return 0.;
    }

    let pos = quantile * (n as f64 + 1.);
    if pos < 1. {
        return sorted[0] as f64;
    }
    if pos >= n as f64 {
        return sorted[n - 1] as f64;
    }

    let lower_idx = pos as usize;
    let lower = sorted[lower_idx - 1] as f64;
    let upper = sorted[lower_idx] as f64;
    lower + (pos - pos.floor()) * (upper - lower)
}

/// The fixed set of quantiles exported for histograms and timers (spec.md §4.9's `GetAll`
/// contract).
pub const EXPORT_QUANTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_snapshot_returns_zero() {
        let snapshot = SampleSnapshot::new(vec![], 0);
        assert_eq!(snapshot.min(), 0);
        assert_eq!(snapshot.max(), 0);
        assert_eq!(snapshot.mean(), 0.);
        assert_eq!(snapshot.stddev(), 0.);
        assert_eq!(snapshot.percentile(0.5), 0.);
    }

    #[test]
    fn percentile_boundaries() {
        let snapshot = SampleSnapshot::new((1..=10).collect(), 10);
        assert_eq!(snapshot.percentile(0.), 1.);
        assert_eq!(snapshot.percentile(1.), 10.);
    }

    #[test]
    fn percentile_matches_linear_interpolation() {
        let snapshot = SampleSnapshot::new(vec![1, 2, 3, 4, 5], 5);
        // pos = 0.5 * 6 = 3.0 -> exact rank 3 -> value 3
        assert_eq!(snapshot.percentile(0.5), 3.);
    }

    #[test]
    fn mean_and_variance() {
        let snapshot = SampleSnapshot::new(vec![2, 4, 4, 4, 5, 5, 7, 9], 8);
        assert_eq!(snapshot.mean(), 5.);
        assert!((snapshot.variance() - 4.).abs() < 1e-9);
        assert!((snapshot.stddev() - 2.).abs() < 1e-9);
    }
}

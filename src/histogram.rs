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
use crate::sample::{ExpDecaySample, Sample, SampleSnapshot};

/// A metric tracking a statistical distribution of values.
///
/// The histogram's [`Default`] implementation uses an [`ExpDecaySample`](crate::ExpDecaySample)
/// reservoir, biasing its statistics toward recently observed values.
pub struct Histogram {
    sample: Box<dyn Sample>,
}

impl Default for Histogram {
    #[inline]
    fn default() -> Histogram {
        Histogram::new(ExpDecaySample::new())
    }
}

impl Histogram {
    /// Creates a new histogram backed by the given reservoir sample.
    pub fn new<S>(sample: S) -> Histogram
    where
        S: Sample,
    {
        Histogram {
            sample: Box::new(sample),
        }
    }

    /// Adds a value to the histogram.
    #[inline]
    pub fn update(&self, value: i64) {
        self.sample.update(value);
    }

    /// Returns the number of values added to the histogram.
    #[inline]
    pub fn count(&self) -> u64 {
        self.sample.count()
    }

    /// Returns the number of values currently retained by the underlying sample.
    #[inline]
    pub fn size(&self) -> usize {
        self.sample.size()
    }

    /// Returns the minimum retained value, or 0 if empty.
    #[inline]
    pub fn min(&self) -> i64 {
        self.snapshot().min()
    }

    /// Returns the maximum retained value, or 0 if empty.
    #[inline]
    pub fn max(&self) -> i64 {
        self.snapshot().max()
    }

    /// Returns the arithmetic mean of the retained values, or 0 if empty.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.snapshot().mean()
    }

    /// Returns the population standard deviation of the retained values.
    #[inline]
    pub fn stddev(&self) -> f64 {
        self.snapshot().stddev()
    }

    /// Returns the population variance of the retained values.
    #[inline]
    pub fn variance(&self) -> f64 {
        self.snapshot().variance()
    }

    /// Returns the sum of the retained values.
    #[inline]
    pub fn sum(&self) -> i64 {
        self.snapshot().sum()
    }

    /// Returns the value at the given quantile, or 0 if empty.
    #[inline]
    pub fn percentile(&self, quantile: f64) -> f64 {
        self.snapshot().percentile(quantile)
    }

    /// Returns the values at each of the given quantiles.
    #[inline]
    pub fn percentiles(&self, quantiles: &[f64]) -> Vec<f64> {
        self.snapshot().percentiles(quantiles)
    }

    /// Returns a snapshot of the statistical distribution of retained values.
    #[inline]
    pub fn snapshot(&self) -> SampleSnapshot {
        self.sample.snapshot()
    }

    /// Discards every retained value and resets the count to 0.
    #[inline]
    pub fn clear(&self) {
        self.sample.clear();
    }

    /// Returns a reference to the underlying reservoir sample.
    #[inline]
    pub fn sample(&self) -> &dyn Sample {
        &*self.sample
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sample::UniformSample;

    #[test]
    fn basic() {
        let histogram = Histogram::new(UniformSample::new(100));
        assert_eq!(histogram.count(), 0);

        histogram.update(15);
        assert_eq!(histogram.count(), 1);
        assert_eq!(histogram.min(), 15);

        histogram.update(10);
        assert_eq!(histogram.count(), 2);
        assert_eq!(histogram.min(), 10);
        assert_eq!(histogram.max(), 15);
    }

    #[test]
    fn snapshot_is_isolated_from_later_updates() {
        let histogram = Histogram::new(UniformSample::new(100));
        histogram.update(1);
        histogram.update(2);

        let snapshot = histogram.snapshot();
        histogram.update(1000);

        assert_eq!(snapshot.max(), 2);
        assert_eq!(snapshot.count(), 2);
    }

    #[test]
    fn clear_resets_count_and_retained_values() {
        let histogram = Histogram::new(UniformSample::new(100));
        histogram.update(1);
        histogram.update(2);
        assert_eq!(histogram.count(), 2);

        histogram.clear();
        assert_eq!(histogram.count(), 0);
        assert_eq!(histogram.size(), 0);
    }

    #[test]
    fn sample_accessor_reflects_updates() {
        let histogram = Histogram::new(UniformSample::new(100));
        histogram.update(7);
        assert_eq!(histogram.sample().count(), 1);
    }
}

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

//! A reservoir which exponentially weights in favor of recent values.
//!
//! Based on the `ExponentiallyDecayingReservoir` class in the Java Dropwizard Metrics library,
//! which is itself based on the forward decay model described in Cormode et al., "Forward
//! Decay", 2009.

use crate::sample::Sample;
use crate::Clock;
use ordered_float::NotNan;
use rand::distr::OpenClosed01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const DEFAULT_SIZE: usize = 1028;
const DEFAULT_ALPHA: f64 = 0.015;
const DEFAULT_RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy)]
struct Entry {
    priority: NotNan<f64>,
    value: i64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority.cmp(&other.priority)
    }
}

struct State {
    heap: BinaryHeap<Reverse<Entry>>,
    count: u64,
    t0: Instant,
    next_rescale: Instant,
    rng: SmallRng,
}

/// A reservoir which exponentially weights in favor of recent values.
///
/// Maintains a bounded min-heap of `(priority, value)` pairs where `priority = exp(alpha * age) /
/// u` for a uniform draw `u` in `(0, 1]` and `age` measured in seconds since the start of the
/// current epoch. Older entries are periodically rescaled down so priorities never grow
/// unbounded; any entry whose rescaled priority underflows to zero is dropped.
pub struct ExpDecaySample {
    capacity: usize,
    alpha: f64,
    rescale_threshold: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl ExpDecaySample {
    /// Creates a new sample with the default configuration: capacity 1028, alpha 0.015, and a
    /// one hour rescale threshold.
    pub fn new() -> ExpDecaySample {
        Builder::default().build()
    }

    /// Returns a builder for configuring a new sample.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Adds a value to the sample at the current time.
    pub fn update(&self, value: i64) {
        self.update_at(self.clock.now(), value);
    }

    /// Adds a value to the sample as observed at the given time.
    ///
    /// Exposed separately from [`update`](Self::update) so tests can drive the sample with an
    /// injected [`Clock`](crate::Clock) rather than real wall-clock time.
    pub fn update_at(&self, time: Instant, value: i64) {
        let mut state = self.state.lock();
        self.rescale_if_needed(&mut state, time);

        state.count += 1;

        let delta_secs = (time - state.t0).as_secs_f64();
        let u: f64 = state.rng.sample(OpenClosed01);
        let priority = (self.alpha * delta_secs).exp() / u;
        let priority = match NotNan::new(priority) {
            Ok(p) => p,
            Err(_) => return,
        };
        let entry = Entry { priority, value };

        if state.heap.len() < self.capacity {
            state.heap.push(Reverse(entry));
        } else if let Some(&Reverse(min)) = state.heap.peek() {
            if entry.priority > min.priority {
                state.heap.pop();
                state.heap.push(Reverse(entry));
            }
        }
    }

    /// Performs a rescale pass if `now` is past the current epoch's rescale deadline.
    ///
    /// Reads (`Values`/`Size`/`Count`) trigger this check as well as writes, so a reservoir that
    /// receives no further updates after its retained priorities have decayed to nothing still
    /// reports an empty set rather than stale entries.
    fn rescale_if_needed(&self, state: &mut State, now: Instant) {
        if now < state.next_rescale {
            return;
        }

        log::debug!("rescaling exponentially decaying sample");

        let scaling_factor = (-self.alpha * (now - state.t0).as_secs_f64()).exp();
        state.heap = std::mem::take(&mut state.heap)
            .into_iter()
            .filter_map(|Reverse(entry)| {
                let scaled = *entry.priority * scaling_factor;
                NotNan::new(scaled).ok().filter(|p| *p > 0.).map(|priority| {
                    Reverse(Entry {
                        priority,
                        value: entry.value,
                    })
                })
            })
            .collect();

        state.t0 = now;
        state.next_rescale = now + self.rescale_threshold;
    }
}

impl Default for ExpDecaySample {
    fn default() -> Self {
        ExpDecaySample::new()
    }
}

impl Sample for ExpDecaySample {
    fn update(&self, value: i64) {
        ExpDecaySample::update(self, value);
    }

    fn count(&self) -> u64 {
        self.state.lock().count
    }

    fn size(&self) -> usize {
        let mut state = self.state.lock();
        self.rescale_if_needed(&mut state, self.clock.now());
        state.heap.len()
    }

    fn values(&self) -> Vec<i64> {
        let mut state = self.state.lock();
        self.rescale_if_needed(&mut state, self.clock.now());
        state.heap.iter().map(|Reverse(e)| e.value).collect()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.heap.clear();
        state.count = 0;
        state.t0 = now;
        state.next_rescale = now + self.rescale_threshold;
    }
}

/// A builder for [`ExpDecaySample`]s.
pub struct Builder {
    capacity: usize,
    alpha: f64,
    rescale_threshold: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            capacity: DEFAULT_SIZE,
            alpha: DEFAULT_ALPHA,
            rescale_threshold: DEFAULT_RESCALE_THRESHOLD,
            clock: crate::clock::SYSTEM_CLOCK.clone(),
        }
    }
}

impl Builder {
    /// Sets the reservoir's capacity. Defaults to 1028.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the decay factor alpha. Defaults to 0.015.
    #[inline]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the interval at which retained priorities are rescaled. Defaults to one hour.
    #[inline]
    pub fn rescale_threshold(mut self, threshold: Duration) -> Self {
        self.rescale_threshold = threshold;
        self
    }

    /// Sets the [`Clock`] used as the sample's time source.
    #[inline]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the sample.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    pub fn build(self) -> ExpDecaySample {
        assert!(self.capacity > 0, "capacity must be positive");

        let now = self.clock.now();
        ExpDecaySample {
            capacity: self.capacity,
            alpha: self.alpha,
            rescale_threshold: self.rescale_threshold,
            state: Mutex::new(State {
                heap: BinaryHeap::with_capacity(self.capacity),
                count: 0,
                t0: now,
                next_rescale: now + self.rescale_threshold,
                rng: SmallRng::from_rng(&mut rand::rng()),
            }),
            clock: self.clock,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::test::TestClock;
    use std::sync::Arc;

    #[test]
    fn no_rescale_retains_exact_input_multiset() {
        let sample = ExpDecaySample::builder().capacity(100).alpha(0.99).build();
        for i in 0..100 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 100);
        assert_eq!(sample.size(), 100);
        let mut values = sample.values();
        values.sort_unstable();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn capacity_bounds_retained_size() {
        let sample = ExpDecaySample::builder().capacity(100).alpha(0.99).build();
        for i in 0..1000 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 1000);
        assert_eq!(sample.size(), 100);
        for value in sample.values() {
            assert!((0..1000).contains(&value));
        }
    }

    #[test]
    fn delta_is_measured_in_seconds_not_nanoseconds() {
        let clock = Arc::new(TestClock::new());
        let sample = ExpDecaySample::builder()
            .capacity(100)
            .alpha(0.99)
            .clock(clock.clone())
            .build();

        let t0 = clock.now();
        for _ in 0..100 {
            sample.update_at(t0, 10);
        }

        clock.advance(Duration::from_millis(1));
        let t1 = clock.now();
        for _ in 0..100 {
            sample.update_at(t1, 20);
        }

        // If delta were computed in nanoseconds, exp(alpha * 1_000_000) would overflow to
        // infinity and every later-inserted value would dominate the heap.
        let mean = sample.values().iter().sum::<i64>() as f64 / sample.size() as f64;
        assert!((14. ..=16.).contains(&mean), "mean {} not in [14, 16]", mean);
    }

    #[test]
    fn rescale_can_drop_every_retained_value() {
        // With the default alpha (0.015), `exp(-alpha * elapsed_secs)` only genuinely underflows
        // to IEEE-754 zero once `elapsed_secs` exceeds roughly 745 / alpha (~14 hours) — a long
        // but finite idle period is enough to prove a fully-decayed entry is evicted rather than
        // retained at a vanishingly small but nonzero priority.
        let clock = Arc::new(TestClock::new());
        let sample = ExpDecaySample::builder()
            .clock(clock.clone())
            .rescale_threshold(Duration::from_secs(60))
            .build();

        sample.update(1);
        assert_eq!(sample.size(), 1);

        clock.advance(Duration::from_secs(15 * 60 * 60));
        assert!(sample.values().is_empty());
    }

    #[test]
    fn clear_resets_count_and_values() {
        let sample = ExpDecaySample::builder().capacity(100).alpha(0.99).build();
        sample.update(1);
        sample.update(2);
        assert_eq!(sample.count(), 2);

        sample.clear();
        assert_eq!(sample.count(), 0);
        assert_eq!(sample.size(), 0);
        assert!(sample.values().is_empty());
    }

    #[test]
    fn concurrent_updates_keep_count_consistent() {
        use std::thread;

        let sample = Arc::new(ExpDecaySample::new());
        let mut handles = vec![];
        for t in 0..8 {
            let sample = sample.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    sample.update(t * 1000 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sample.count(), 8 * 200);
    }
}

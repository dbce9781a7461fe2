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

//! A fixed-size reservoir with uniform retention probability (algorithm R).

use crate::sample::Sample;
use parking_lot::Mutex;
use rand::Rng;

struct State {
    count: u64,
    values: Vec<i64>,
}

/// A fixed-size reservoir that retains each observed value with probability `capacity / n`,
/// where `n` is the number of values observed so far (Vitter's algorithm R).
pub struct UniformSample {
    capacity: usize,
    state: Mutex<State>,
}

impl UniformSample {
    /// Creates a new sample with the given reservoir capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> UniformSample {
        assert!(capacity > 0, "capacity must be positive");

        UniformSample {
            capacity,
            state: Mutex::new(State {
                count: 0,
                values: Vec::with_capacity(capacity),
            }),
        }
    }
}

impl Sample for UniformSample {
    fn update(&self, value: i64) {
        let mut state = self.state.lock();
        state.count += 1;

        if state.values.len() < self.capacity {
            state.values.push(value);
        } else {
            let j = rand::rng().random_range(0..state.count as usize);
            if j < self.capacity {
                state.values[j] = value;
            }
        }
    }

    fn count(&self) -> u64 {
        self.state.lock().count
    }

    fn size(&self) -> usize {
        self.state.lock().values.len()
    }

    fn values(&self) -> Vec<i64> {
        self.state.lock().values.clone()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.count = 0;
        state.values.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tail_inclusion() {
        let sample = UniformSample::new(100);
        for i in 0..100 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 100);
        assert_eq!(sample.size(), 100);
        let sum: i64 = sample.values().iter().sum();
        assert_eq!(sum, 99 * 100 / 2);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let sample = UniformSample::new(10);
        for i in 0..1000 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 1000);
        assert_eq!(sample.size(), 10);
    }

    #[test]
    fn clear_resets_count_and_values() {
        let sample = UniformSample::new(10);
        for i in 0..10 {
            sample.update(i);
        }
        assert_eq!(sample.size(), 10);

        sample.clear();
        assert_eq!(sample.count(), 0);
        assert_eq!(sample.size(), 0);
        assert!(sample.values().is_empty());
    }

    #[test]
    fn concurrent_update_and_count() {
        use std::sync::Arc;
        use std::thread;

        let sample = Arc::new(UniformSample::new(50));
        let mut handles = vec![];
        for t in 0..8 {
            let sample = sample.clone();
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    sample.update(t * 1000 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sample.count(), 8 * 500);
        assert_eq!(sample.size(), 50);
    }

    proptest! {
        #[test]
        fn retained_values_are_subset_of_input(inputs in proptest::collection::vec(any::<i16>(), 0..500)) {
            let sample = UniformSample::new(20);
            for &v in &inputs {
                sample.update(v as i64);
            }

            prop_assert_eq!(sample.count(), inputs.len() as u64);
            prop_assert!(sample.size() <= 20.min(inputs.len()));
            for retained in sample.values() {
                prop_assert!(inputs.iter().any(|&v| v as i64 == retained));
            }
        }
    }
}

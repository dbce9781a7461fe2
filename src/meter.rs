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

//! A metric tracking the rate of occurrence of an event.

use crate::arbiter::ARBITER;
use crate::clock::Clock;
use crate::ewma::Ewma;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

struct State {
    count: i64,
    rate_1m: Ewma,
    rate_5m: Ewma,
    rate_15m: Ewma,
    snapshot: MeterSnapshot,
}

/// The shared, tickable state behind a [`Meter`]. Split out from `Meter` so the arbiter can hold
/// a `Weak` reference to it without keeping the public handle alive.
pub(crate) struct MeterInner {
    uncounted: AtomicI64,
    stopped: AtomicBool,
    start_time: Instant,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl MeterInner {
    fn new_at(start_time: Instant, clock: Arc<dyn Clock>) -> MeterInner {
        MeterInner {
            uncounted: AtomicI64::new(0),
            stopped: AtomicBool::new(false),
            start_time,
            clock,
            state: Mutex::new(State {
                count: 0,
                rate_1m: Ewma::new(1.),
                rate_5m: Ewma::new(5.),
                rate_15m: Ewma::new(15.),
                snapshot: MeterSnapshot::default(),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with(clock: Arc<dyn Clock>) -> MeterInner {
        let now = clock.now();
        MeterInner::new_at(now, clock)
    }

    fn mark(&self, n: i64) {
        self.uncounted.fetch_add(n, Ordering::SeqCst);
    }

    /// Folds any events accumulated since the last tick into the three EWMAs and refreshes the
    /// cached snapshot. Invoked once every 5 seconds by the [`MeterArbiter`](crate::arbiter::MeterArbiter).
    pub(crate) fn tick(&self) {
        let uncounted = self.uncounted.swap(0, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.count += uncounted;

        state.rate_1m.tick(uncounted);
        state.rate_5m.tick(uncounted);
        state.rate_15m.tick(uncounted);

        let now = self.clock.now();
        let mean = if state.count == 0 {
            0.
        } else {
            state.count as f64 / (now - self.start_time).as_secs_f64()
        };
        state.snapshot = MeterSnapshot {
            count: state.count,
            rate_1m: state.rate_1m.rate(),
            rate_5m: state.rate_5m.rate(),
            rate_15m: state.rate_15m.rate(),
            rate_mean: mean,
        };
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn count(&self) -> i64 {
        self.state.lock().count + self.uncounted.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> MeterSnapshot {
        self.state.lock().snapshot
    }
}

/// An immutable reading of a [`Meter`]'s count and rolling average rates, all in events per
/// second except for `count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeterSnapshot {
    count: i64,
    rate_1m: f64,
    rate_5m: f64,
    rate_15m: f64,
    rate_mean: f64,
}

impl MeterSnapshot {
    /// Returns the total number of events marked.
    #[inline]
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Returns the one minute exponentially-weighted moving average rate.
    #[inline]
    pub fn one_minute_rate(&self) -> f64 {
        self.rate_1m
    }

    /// Returns the five minute exponentially-weighted moving average rate.
    #[inline]
    pub fn five_minute_rate(&self) -> f64 {
        self.rate_5m
    }

    /// Returns the fifteen minute exponentially-weighted moving average rate.
    #[inline]
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.rate_15m
    }

    /// Returns the mean rate since the meter was created.
    #[inline]
    pub fn mean_rate(&self) -> f64 {
        self.rate_mean
    }
}

/// A metric tracking the rate of occurrence of an event.
///
/// A meter's rolling rates are computed by a single background ticker shared by every live
/// meter in the process (see [`MeterArbiter`](crate::arbiter::MeterArbiter)), rather than on
/// read, so idle meters do not pay a catch-up cost the next time they're queried.
pub struct Meter {
    inner: Arc<MeterInner>,
}

impl Default for Meter {
    #[inline]
    fn default() -> Meter {
        Meter::new()
    }
}

impl Meter {
    /// Creates a new meter and registers it with the shared arbiter.
    pub fn new() -> Meter {
        Meter::new_with(crate::clock::SYSTEM_CLOCK.clone())
    }

    /// Creates a new meter using the provided [`Clock`] as its time source.
    pub fn new_with(clock: Arc<dyn Clock>) -> Meter {
        let now = clock.now();
        let inner = Arc::new(MeterInner::new_at(now, clock));
        ARBITER.register(&inner);
        Meter { inner }
    }

    /// Marks the occurrence of `n` event(s).
    #[inline]
    pub fn mark(&self, n: i64) {
        self.inner.mark(n);
    }

    /// Returns the number of events registered by the meter, including those not yet folded
    /// into the rolling rates by the next tick.
    #[inline]
    pub fn count(&self) -> i64 {
        self.inner.count()
    }

    /// Returns the one minute rolling average rate of the occurrence of events, in events per
    /// second, as of the most recent tick.
    #[inline]
    pub fn one_minute_rate(&self) -> f64 {
        self.inner.snapshot().one_minute_rate()
    }

    /// Returns the five minute rolling average rate of the occurrence of events, in events per
    /// second, as of the most recent tick.
    #[inline]
    pub fn five_minute_rate(&self) -> f64 {
        self.inner.snapshot().five_minute_rate()
    }

    /// Returns the fifteen minute rolling average rate of the occurrence of events, in events
    /// per second, as of the most recent tick.
    #[inline]
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.inner.snapshot().fifteen_minute_rate()
    }

    /// Returns the mean rate of the occurrence of events since the meter's creation, in events
    /// per second.
    #[inline]
    pub fn mean_rate(&self) -> f64 {
        self.inner.snapshot().mean_rate()
    }

    /// Returns an immutable reading of the meter's count and rolling average rates.
    #[inline]
    pub fn snapshot(&self) -> MeterSnapshot {
        self.inner.snapshot()
    }

    /// Removes the meter from the shared arbiter; subsequent ticks no longer visit it.
    #[inline]
    pub fn stop(&self) {
        self.inner.stop();
    }
}

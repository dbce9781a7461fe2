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
use crate::clock::Clock;
use crate::sample::{ExpDecaySample, Sample, SampleSnapshot};
use crate::{Meter, MeterSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A metric tracking the duration and rate of events.
///
/// The timer's default reservoir implementation (used by its [`Default`] implementation) is the
/// [`ExpDecaySample`]. Durations are recorded and reported in nanoseconds.
pub struct Timer {
    meter: Meter,
    sample: Box<dyn Sample>,
    clock: Arc<dyn Clock>,
}

impl Default for Timer {
    #[inline]
    fn default() -> Timer {
        Timer::new(ExpDecaySample::new())
    }
}

impl Timer {
    /// Creates a new timer backed by the given reservoir sample.
    pub fn new<S>(sample: S) -> Timer
    where
        S: Sample,
    {
        Timer {
            meter: Meter::new(),
            sample: Box::new(sample),
            clock: crate::clock::SYSTEM_CLOCK.clone(),
        }
    }

    /// Creates a new timer using the provided [`Clock`] as its time source.
    pub fn new_with<S>(sample: S, clock: Arc<dyn Clock>) -> Timer
    where
        S: Sample,
    {
        Timer {
            meter: Meter::new_with(clock.clone()),
            sample: Box::new(sample),
            clock,
        }
    }

    /// Adds a new timed event to the metric.
    #[inline]
    pub fn update(&self, duration: Duration) {
        self.meter.mark(1);
        self.sample.update(duration.as_nanos() as i64);
    }

    /// Adds a new timed event whose duration is the time elapsed since `start`.
    #[inline]
    pub fn update_since(&self, start: Instant) {
        self.update(self.clock.now() - start);
    }

    /// Returns a guard type which reports the time elapsed since its creation when it drops.
    #[inline]
    pub fn time(&self) -> Time<'_> {
        Time {
            timer: self,
            start: self.clock.now(),
        }
    }

    /// Returns the number of events reported to the metric.
    #[inline]
    pub fn count(&self) -> i64 {
        self.meter.count()
    }

    /// Returns the one minute rolling average rate of the occurrence of events measured in
    /// events per second.
    #[inline]
    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    /// Returns the five minute rolling average rate of the occurrence of events measured in
    /// events per second.
    #[inline]
    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    /// Returns the fifteen minute rolling average rate of the occurrence of events measured in
    /// events per second.
    #[inline]
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    /// Returns the mean rate of the occurrence of events since the creation of the timer
    /// measured in events per second.
    #[inline]
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// Returns an immutable reading of the timer's event count and rolling average rates.
    #[inline]
    pub fn rate_snapshot(&self) -> MeterSnapshot {
        self.meter.snapshot()
    }

    /// Returns a snapshot of the statistical distribution of durations of events, measured in
    /// nanoseconds.
    #[inline]
    pub fn snapshot(&self) -> SampleSnapshot {
        self.sample.snapshot()
    }

    /// Stops the timer's embedded meter, removing it from the shared ticker.
    #[inline]
    pub fn stop(&self) {
        self.meter.stop();
    }
}

/// A guard type which reports the time elapsed since its creation to a timer when it drops.
pub struct Time<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for Time<'_> {
    #[inline]
    fn drop(&mut self) {
        self.timer.update(self.timer.clock.now() - self.start);
    }
}

#[cfg(test)]
mod test {
    use crate::clock::test::TestClock;
    use crate::Timer;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    #[allow(clippy::float_cmp)]
    fn basic() {
        let timer = Timer::default();

        for _ in 0..15 {
            timer.update(Duration::from_nanos(0));
        }

        for _ in 0..5 {
            timer.update(Duration::from_nanos(5));
        }

        assert_eq!(timer.count(), 20);
        assert_eq!(timer.snapshot().percentile(0.8), 5.);
    }

    #[test]
    fn time_guard_reports_elapsed_duration() {
        let clock = Arc::new(TestClock::new());
        let timer = Timer::new_with(crate::sample::ExpDecaySample::new(), clock.clone());

        let guard = timer.time();
        clock.advance(Duration::from_millis(10));
        drop(guard);

        assert_eq!(timer.count(), 1);
        assert!(timer.snapshot().max() >= 10_000_000);
    }

    #[test]
    fn update_since_records_elapsed_duration() {
        let clock = Arc::new(TestClock::new());
        let timer = Timer::new_with(crate::sample::ExpDecaySample::new(), clock.clone());

        let start = clock.now();
        clock.advance(Duration::from_millis(10));
        timer.update_since(start);

        assert_eq!(timer.count(), 1);
        assert!(timer.snapshot().max() >= 10_000_000);
    }

    #[test]
    fn real_clock_time_guard() {
        let timer = Timer::default();

        let guard = timer.time();
        thread::sleep(Duration::from_millis(5));
        drop(guard);

        assert_eq!(timer.count(), 1);
        assert!(timer.snapshot().max() > 0);
    }
}

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

//! The shared background ticker that drives every live [`Meter`](crate::Meter)'s EWMAs.

use crate::meter::MeterInner;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

pub(crate) static ARBITER: Lazy<MeterArbiter> = Lazy::new(MeterArbiter::new);

const TICK_PERIOD: Duration = Duration::from_secs(crate::ewma::INTERVAL_SECS);

struct State {
    meters: Vec<Weak<MeterInner>>,
    running: bool,
}

/// The process-wide ticker shared by every [`Meter`](crate::Meter) and [`Timer`](crate::Timer).
///
/// Rather than each meter ticking its own EWMAs on read, every live meter registers here and is
/// driven by a single lazily-spawned background thread that wakes every 5 seconds. The thread
/// exits once the live-meter set becomes empty, and a later registration restarts it.
pub(crate) struct MeterArbiter {
    state: Mutex<State>,
}

impl MeterArbiter {
    fn new() -> MeterArbiter {
        MeterArbiter {
            state: Mutex::new(State {
                meters: vec![],
                running: false,
            }),
        }
    }

    /// Registers a meter with the arbiter, spawning the background ticker thread if it isn't
    /// already running.
    pub(crate) fn register(&'static self, meter: &Arc<MeterInner>) {
        let mut state = self.state.lock();
        state.meters.push(Arc::downgrade(meter));

        if !state.running {
            state.running = true;
            thread::spawn(move || self.run());
        }
    }

    fn run(&'static self) {
        log::trace!("meter arbiter ticker starting");
        loop {
            thread::sleep(TICK_PERIOD);
            if !self.tick_now() {
                break;
            }
        }
        log::trace!("meter arbiter ticker stopping");
    }

    /// Performs one synchronous tick pass over every live meter, pruning dead and stopped ones.
    ///
    /// Returns `false` if the live-meter set is empty after pruning, signalling the background
    /// thread (or a test driving ticks directly) that it may stop looping.
    pub(crate) fn tick_now(&self) -> bool {
        let mut state = self.state.lock();
        state.meters.retain(|weak| match weak.upgrade() {
            Some(meter) if !meter.is_stopped() => {
                meter.tick();
                true
            }
            _ => false,
        });

        if state.meters.is_empty() {
            state.running = false;
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meter::MeterInner;
    use crate::clock::test::TestClock;

    #[test]
    fn prunes_dropped_and_stopped_meters() {
        let arbiter = MeterArbiter::new();
        let clock = Arc::new(TestClock::new());

        let kept = Arc::new(MeterInner::new_with(clock.clone()));
        arbiter.register_for_test(&kept);

        {
            let dropped = Arc::new(MeterInner::new_with(clock.clone()));
            arbiter.register_for_test(&dropped);
        }

        let stopped = Arc::new(MeterInner::new_with(clock.clone()));
        arbiter.register_for_test(&stopped);
        stopped.stop();

        assert!(arbiter.tick_now());
        assert_eq!(arbiter.state.lock().meters.len(), 1);
    }

    impl MeterArbiter {
        fn register_for_test(&self, meter: &Arc<MeterInner>) {
            self.state.lock().meters.push(Arc::downgrade(meter));
        }
    }
}

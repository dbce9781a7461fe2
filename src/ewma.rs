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

//! An exponentially-weighted moving average of a rolling event count.
//!
//! Modeled after Java metrics-core's `EWMA.java`, which in turn models the load-average
//! calculation used by the Unix `uptime` command.

pub(crate) const INTERVAL_SECS: u64 = 5;
const SECONDS_PER_MINUTE: f64 = 60.;

/// An exponentially-weighted moving average seeded with a target half-life, in minutes.
pub(crate) struct Ewma {
    rate: f64,
    alpha: f64,
    initialized: bool,
}

impl Ewma {
    pub(crate) fn new(half_life_minutes: f64) -> Ewma {
        Ewma {
            rate: 0.,
            alpha: 1. - (-(INTERVAL_SECS as f64) / SECONDS_PER_MINUTE / half_life_minutes).exp(),
            initialized: false,
        }
    }

    /// Folds `uncounted` events observed over the last tick interval into the rate.
    pub(crate) fn tick(&mut self, uncounted: i64) {
        let instant_rate = uncounted as f64 / INTERVAL_SECS as f64;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Returns the current smoothed per-second rate.
    pub(crate) fn rate(&self) -> f64 {
        self.rate
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn alphas_match_dropwizard_constants() {
        assert_approx_eq!(Ewma::new(1.).alpha, 0.0800, 0.0001);
        assert_approx_eq!(Ewma::new(5.).alpha, 0.0163, 0.0001);
        assert_approx_eq!(Ewma::new(15.).alpha, 0.00549, 0.00001);
    }

    #[test]
    fn first_tick_seeds_rate_directly() {
        let mut ewma = Ewma::new(1.);
        assert_eq!(ewma.rate(), 0.);
        ewma.tick(25);
        assert_approx_eq!(ewma.rate(), 5., 1e-9);
    }

    #[test]
    fn subsequent_ticks_smooth_toward_instant_rate() {
        let mut ewma = Ewma::new(1.);
        ewma.tick(25);
        let before = ewma.rate();
        ewma.tick(0);
        assert!(ewma.rate() < before);
        assert!(ewma.rate() > 0.);
    }
}

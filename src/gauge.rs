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
use serde::Serialize;
use serde_value::Value;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A metric which holds a mutable `i64` value set directly by callers.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    /// Creates a new gauge initialized to 0.
    #[inline]
    pub fn new() -> Gauge {
        Gauge::default()
    }

    /// Sets the gauge's value.
    #[inline]
    pub fn update(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Returns the gauge's current value.
    #[inline]
    pub fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A metric which holds a mutable `f64` value set directly by callers.
///
/// The value is stored as the bit pattern of an `f64` inside an `AtomicU64` so that reads and
/// writes remain lock-free.
#[derive(Debug, Default)]
pub struct GaugeFloat(AtomicU64);

impl GaugeFloat {
    /// Creates a new gauge initialized to 0.
    #[inline]
    pub fn new() -> GaugeFloat {
        GaugeFloat::default()
    }

    /// Sets the gauge's value.
    #[inline]
    pub fn update(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Returns the gauge's current value.
    #[inline]
    pub fn value(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// A gauge whose value is computed on read from a user-supplied producer rather than stored.
///
/// It is implemented for all closures returning a serializable type, so any `Fn() -> R` with
/// `R: Serialize` can be registered directly without an intermediate wrapper type.
pub trait FunctionalGauge: 'static + Sync + Send {
    /// Computes and returns the gauge's current value.
    fn value(&self) -> Value;
}

impl<F, R> FunctionalGauge for F
where
    F: Fn() -> R + 'static + Sync + Send,
    R: Serialize,
{
    fn value(&self) -> Value {
        serde_value::to_value(self()).expect("value failed to serialize")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gauge_update() {
        let gauge = Gauge::new();
        assert_eq!(gauge.value(), 0);
        gauge.update(42);
        assert_eq!(gauge.value(), 42);
        gauge.update(-7);
        assert_eq!(gauge.value(), -7);
    }

    #[test]
    fn gauge_float_update() {
        let gauge = GaugeFloat::new();
        assert_eq!(gauge.value(), 0.);
        gauge.update(3.5);
        assert_eq!(gauge.value(), 3.5);
    }

    #[test]
    fn functional_gauge() {
        let producer = || 100i64;
        assert_eq!(FunctionalGauge::value(&producer), Value::I64(100));
    }
}

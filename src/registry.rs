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
use crate::error::RegistryError;
use crate::sample::EXPORT_QUANTILES;
use crate::{Counter, FunctionalGauge, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, Timer};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

static DEFAULT_REGISTRY: Lazy<MetricRegistry> = Lazy::new(MetricRegistry::new);

/// An enum of all metric types a [`MetricRegistry`] can hold.
#[derive(Clone)]
pub enum Metric {
    /// A counter metric.
    Counter(Arc<Counter>),
    /// An int64 gauge metric.
    Gauge(Arc<Gauge>),
    /// A float64 gauge metric.
    GaugeFloat(Arc<GaugeFloat>),
    /// A value-on-read gauge metric.
    FunctionalGauge(Arc<dyn FunctionalGauge>),
    /// A histogram metric.
    Histogram(Arc<Histogram>),
    /// A meter metric.
    Meter(Arc<Meter>),
    /// A timer metric.
    Timer(Arc<Timer>),
    /// A healthcheck metric.
    Healthcheck(Arc<Healthcheck>),
}

impl Metric {
    fn stop(&self) {
        match self {
            Metric::Meter(m) => m.stop(),
            Metric::Timer(t) => t.stop(),
            _ => {}
        }
    }

    fn export(&self) -> MetricExport {
        match self {
            Metric::Counter(c) => MetricExport::Counter {
                count: c.count(),
            },
            Metric::Gauge(g) => MetricExport::Gauge { value: g.value() },
            Metric::GaugeFloat(g) => MetricExport::GaugeFloat { value: g.value() },
            Metric::FunctionalGauge(g) => MetricExport::FunctionalGauge {
                value: g.value(),
            },
            Metric::Histogram(h) => {
                let snapshot = h.snapshot();
                let p = snapshot.percentiles(&EXPORT_QUANTILES);
                MetricExport::Histogram {
                    count: h.count(),
                    min: snapshot.min(),
                    max: snapshot.max(),
                    mean: snapshot.mean(),
                    std_dev: snapshot.stddev(),
                    variance: snapshot.variance(),
                    p50: p[0],
                    p75: p[1],
                    p95: p[2],
                    p99: p[3],
                    p999: p[4],
                }
            }
            Metric::Meter(m) => {
                let snapshot = m.snapshot();
                MetricExport::Meter {
                    count: snapshot.count(),
                    m1: snapshot.one_minute_rate(),
                    m5: snapshot.five_minute_rate(),
                    m15: snapshot.fifteen_minute_rate(),
                    mean: snapshot.mean_rate(),
                }
            }
            Metric::Timer(t) => {
                let snapshot = t.snapshot();
                let rates = t.rate_snapshot();
                let p = snapshot.percentiles(&EXPORT_QUANTILES);
                MetricExport::Timer {
                    count: rates.count(),
                    min: snapshot.min(),
                    max: snapshot.max(),
                    mean: snapshot.mean(),
                    std_dev: snapshot.stddev(),
                    variance: snapshot.variance(),
                    p50: p[0],
                    p75: p[1],
                    p95: p[2],
                    p99: p[3],
                    p999: p[4],
                    m1: rates.one_minute_rate(),
                    m5: rates.five_minute_rate(),
                    m15: rates.fifteen_minute_rate(),
                    rate_mean: rates.mean_rate(),
                }
            }
            Metric::Healthcheck(h) => MetricExport::Healthcheck { error: h.error() },
        }
    }
}

/// A uniform, per-kind export structure produced by [`Registry::get_all`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MetricExport {
    /// A counter export.
    Counter {
        /// The counter's value.
        count: i64,
    },
    /// An int64 gauge export.
    Gauge {
        /// The gauge's value.
        value: i64,
    },
    /// A float64 gauge export.
    GaugeFloat {
        /// The gauge's value.
        value: f64,
    },
    /// A value-on-read gauge export.
    FunctionalGauge {
        /// The gauge's computed value.
        value: serde_value::Value,
    },
    /// A histogram export.
    Histogram {
        /// The total number of values observed.
        count: u64,
        /// The smallest retained value.
        min: i64,
        /// The largest retained value.
        max: i64,
        /// The arithmetic mean of the retained values.
        mean: f64,
        /// The population standard deviation of the retained values.
        std_dev: f64,
        /// The population variance of the retained values.
        variance: f64,
        /// The 50th percentile.
        p50: f64,
        /// The 75th percentile.
        p75: f64,
        /// The 95th percentile.
        p95: f64,
        /// The 99th percentile.
        p99: f64,
        /// The 99.9th percentile.
        p999: f64,
    },
    /// A meter export.
    Meter {
        /// The total number of events marked.
        count: i64,
        /// The one minute rolling average rate.
        m1: f64,
        /// The five minute rolling average rate.
        m5: f64,
        /// The fifteen minute rolling average rate.
        m15: f64,
        /// The mean rate since creation.
        mean: f64,
    },
    /// A timer export: a histogram of durations plus a meter of call rates.
    Timer {
        /// The total number of events timed.
        count: i64,
        /// The smallest retained duration, in nanoseconds.
        min: i64,
        /// The largest retained duration, in nanoseconds.
        max: i64,
        /// The arithmetic mean duration, in nanoseconds.
        mean: f64,
        /// The population standard deviation of retained durations.
        std_dev: f64,
        /// The population variance of retained durations.
        variance: f64,
        /// The 50th percentile duration.
        p50: f64,
        /// The 75th percentile duration.
        p75: f64,
        /// The 95th percentile duration.
        p95: f64,
        /// The 99th percentile duration.
        p99: f64,
        /// The 99.9th percentile duration.
        p999: f64,
        /// The one minute rolling average call rate.
        m1: f64,
        /// The five minute rolling average call rate.
        m5: f64,
        /// The fifteen minute rolling average call rate.
        m15: f64,
        /// The mean call rate since creation.
        rate_mean: f64,
    },
    /// A healthcheck export.
    Healthcheck {
        /// The most recently recorded error, or `None` if healthy.
        error: Option<String>,
    },
}

/// A named collection of metrics supporting get-or-create semantics and safe iteration.
///
/// Implemented by [`MetricRegistry`] and [`PrefixedRegistry`].
pub trait Registry: Sync + Send {
    /// Registers a metric under `name`, failing if the name is already taken.
    fn register(&self, name: &str, metric: Metric) -> Result<(), RegistryError>;

    /// Returns the metric registered under `name`, registering the result of `factory` if
    /// absent. `factory` is invoked at most once, and only if the name is not already present.
    fn get_or_register_with(&self, name: &str, factory: Box<dyn FnOnce() -> Metric + '_>) -> Metric;

    /// Returns the metric registered under `name`, if any.
    fn get(&self, name: &str) -> Option<Metric>;

    /// Removes and returns the metric registered under `name`, if any, stopping it first if it
    /// has a stop hook (Meter, Timer).
    fn unregister(&self, name: &str) -> Option<Metric>;

    /// Stops and removes every registered metric.
    fn unregister_all(&self);

    /// Invokes `visitor` once per registered metric, over a consistent snapshot of the entry
    /// set taken before visiting begins.
    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric));

    /// Returns a uniform per-kind export structure for every registered metric, suitable for
    /// serialization by an external exporter.
    fn get_all(&self) -> HashMap<String, MetricExport>;
}

/// A thread-safe, name-indexed collection of metrics.
pub struct MetricRegistry {
    metrics: Mutex<HashMap<String, Metric>>,
}

impl Default for MetricRegistry {
    #[inline]
    fn default() -> MetricRegistry {
        MetricRegistry::new()
    }
}

impl MetricRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> MetricRegistry {
        MetricRegistry {
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the process-wide default registry.
    pub fn default_registry() -> &'static MetricRegistry {
        &DEFAULT_REGISTRY
    }

    /// Returns the counter registered under `name`, registering a new one if absent.
    ///
    /// If `name` is already registered to a different kind of instrument, that instrument is
    /// returned unchanged, wrapped back into a fresh, unregistered counter of its own -- callers
    /// holding the wrong handle get a harmless standalone instrument rather than a panic or
    /// silent type coercion.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        match self.get_or_register_with(name, Box::new(|| Metric::Counter(Arc::new(Counter::new())))) {
            Metric::Counter(c) => c,
            _ => Arc::new(Counter::new()),
        }
    }

    /// Returns the int64 gauge registered under `name`, registering a new one if absent.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        match self.get_or_register_with(name, Box::new(|| Metric::Gauge(Arc::new(Gauge::new())))) {
            Metric::Gauge(g) => g,
            _ => Arc::new(Gauge::new()),
        }
    }

    /// Returns the float64 gauge registered under `name`, registering a new one if absent.
    pub fn gauge_float(&self, name: &str) -> Arc<GaugeFloat> {
        match self.get_or_register_with(name, Box::new(|| Metric::GaugeFloat(Arc::new(GaugeFloat::new())))) {
            Metric::GaugeFloat(g) => g,
            _ => Arc::new(GaugeFloat::new()),
        }
    }

    /// Registers a value-on-read functional gauge under `name`, returning the existing gauge of
    /// that name if one is already present.
    pub fn functional_gauge<G>(&self, name: &str, gauge: G) -> Arc<dyn FunctionalGauge>
    where
        G: FunctionalGauge,
    {
        match self.get_or_register_with(name, Box::new(move || Metric::FunctionalGauge(Arc::new(gauge)))) {
            Metric::FunctionalGauge(g) => g,
            _ => Arc::new(|| ()) as Arc<dyn FunctionalGauge>,
        }
    }

    /// Returns the histogram registered under `name`, registering a new one if absent.
    pub fn histogram(&self, name: &str) -> Arc<Histogram> {
        match self.get_or_register_with(name, Box::new(|| Metric::Histogram(Arc::new(Histogram::default())))) {
            Metric::Histogram(h) => h,
            _ => Arc::new(Histogram::default()),
        }
    }

    /// Returns the meter registered under `name`, registering a new one if absent.
    pub fn meter(&self, name: &str) -> Arc<Meter> {
        match self.get_or_register_with(name, Box::new(|| Metric::Meter(Arc::new(Meter::new())))) {
            Metric::Meter(m) => m,
            _ => Arc::new(Meter::new()),
        }
    }

    /// Returns the timer registered under `name`, registering a new one if absent.
    pub fn timer(&self, name: &str) -> Arc<Timer> {
        match self.get_or_register_with(name, Box::new(|| Metric::Timer(Arc::new(Timer::default())))) {
            Metric::Timer(t) => t,
            _ => Arc::new(Timer::default()),
        }
    }

    /// Returns the healthcheck registered under `name`, registering a new one if absent.
    pub fn healthcheck(&self, name: &str) -> Arc<Healthcheck> {
        match self.get_or_register_with(name, Box::new(|| Metric::Healthcheck(Arc::new(Healthcheck::new())))) {
            Metric::Healthcheck(h) => h,
            _ => Arc::new(Healthcheck::new()),
        }
    }
}

/// `GetOrRegisterX(name, registry)` family: idempotent get-or-create, falling back to the
/// process-wide [`MetricRegistry::default_registry`] when `registry` is `None` (the `NilRegistry`
/// case).
macro_rules! get_or_register_fns {
    ($($fn_name:ident => $method:ident -> $ret:ty),+ $(,)?) => {
        $(
            #[doc = "Idempotent get-or-create against `registry`, or the default registry if `None`."]
            pub fn $fn_name(name: &str, registry: Option<&MetricRegistry>) -> $ret {
                registry.unwrap_or_else(MetricRegistry::default_registry).$method(name)
            }
        )+
    };
}

get_or_register_fns! {
    get_or_register_counter => counter -> Arc<Counter>,
    get_or_register_gauge => gauge -> Arc<Gauge>,
    get_or_register_gauge_float => gauge_float -> Arc<GaugeFloat>,
    get_or_register_histogram => histogram -> Arc<Histogram>,
    get_or_register_meter => meter -> Arc<Meter>,
    get_or_register_timer => timer -> Arc<Timer>,
    get_or_register_healthcheck => healthcheck -> Arc<Healthcheck>,
}

/// `NewRegisteredX(name, registry)` family: construct, register, and return, failing if the name
/// is already taken. Falls back to the process-wide default registry when `registry` is `None`.
///
/// Constructs, registers, and returns a fresh counter, failing if `name` is already taken.
pub fn new_registered_counter(
    name: &str,
    registry: Option<&MetricRegistry>,
) -> Result<Arc<Counter>, RegistryError> {
    let registry = registry.unwrap_or_else(MetricRegistry::default_registry);
    let counter = Arc::new(Counter::new());
    registry.register(name, Metric::Counter(counter.clone()))?;
    Ok(counter)
}

/// Constructs, registers, and returns a fresh histogram, failing if `name` is already taken.
pub fn new_registered_histogram(
    name: &str,
    registry: Option<&MetricRegistry>,
) -> Result<Arc<Histogram>, RegistryError> {
    let registry = registry.unwrap_or_else(MetricRegistry::default_registry);
    let histogram = Arc::new(Histogram::default());
    registry.register(name, Metric::Histogram(histogram.clone()))?;
    Ok(histogram)
}

/// Constructs, registers, and returns a fresh meter, failing if `name` is already taken.
pub fn new_registered_meter(
    name: &str,
    registry: Option<&MetricRegistry>,
) -> Result<Arc<Meter>, RegistryError> {
    let registry = registry.unwrap_or_else(MetricRegistry::default_registry);
    let meter = Arc::new(Meter::new());
    registry.register(name, Metric::Meter(meter.clone()))?;
    Ok(meter)
}

/// Constructs, registers, and returns a fresh timer, failing if `name` is already taken.
pub fn new_registered_timer(
    name: &str,
    registry: Option<&MetricRegistry>,
) -> Result<Arc<Timer>, RegistryError> {
    let registry = registry.unwrap_or_else(MetricRegistry::default_registry);
    let timer = Arc::new(Timer::default());
    registry.register(name, Metric::Timer(timer.clone()))?;
    Ok(timer)
}

impl Registry for MetricRegistry {
    fn register(&self, name: &str, metric: Metric) -> Result<(), RegistryError> {
        let mut metrics = self.metrics.lock();
        if metrics.contains_key(name) {
            log::debug!("metric {:?} already registered, rejecting duplicate", name);
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        metrics.insert(name.to_string(), metric);
        Ok(())
    }

    fn get_or_register_with(&self, name: &str, factory: Box<dyn FnOnce() -> Metric + '_>) -> Metric {
        let mut metrics = self.metrics.lock();
        if let Some(existing) = metrics.get(name) {
            return existing.clone();
        }
        let metric = factory();
        metrics.insert(name.to_string(), metric.clone());
        metric
    }

    fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.lock().get(name).cloned()
    }

    fn unregister(&self, name: &str) -> Option<Metric> {
        let removed = self.metrics.lock().remove(name);
        if let Some(metric) = &removed {
            metric.stop();
        }
        removed
    }

    fn unregister_all(&self) {
        let mut metrics = self.metrics.lock();
        for metric in metrics.values() {
            metric.stop();
        }
        metrics.clear();
    }

    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric)) {
        let snapshot: Vec<(String, Metric)> = self
            .metrics
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, metric) in &snapshot {
            visitor(name, metric);
        }
    }

    fn get_all(&self) -> HashMap<String, MetricExport> {
        let mut out = HashMap::new();
        self.each(&mut |name, metric| {
            out.insert(name.to_string(), metric.export());
        });
        out
    }
}

/// A [`Registry`] decorator that transparently prefixes every name passed through it with a
/// fixed string before delegating to the wrapped registry.
pub struct PrefixedRegistry<R> {
    prefix: String,
    inner: R,
}

impl<R> PrefixedRegistry<R>
where
    R: Registry,
{
    /// Wraps `inner`, prefixing every name with `prefix`.
    pub fn new(prefix: impl Into<String>, inner: R) -> PrefixedRegistry<R> {
        PrefixedRegistry {
            prefix: prefix.into(),
            inner,
        }
    }

    fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl<R> Registry for PrefixedRegistry<R>
where
    R: Registry,
{
    fn register(&self, name: &str, metric: Metric) -> Result<(), RegistryError> {
        self.inner.register(&self.prefixed(name), metric)
    }

    fn get_or_register_with(&self, name: &str, factory: Box<dyn FnOnce() -> Metric + '_>) -> Metric {
        self.inner.get_or_register_with(&self.prefixed(name), factory)
    }

    fn get(&self, name: &str) -> Option<Metric> {
        self.inner.get(&self.prefixed(name))
    }

    fn unregister(&self, name: &str) -> Option<Metric> {
        self.inner.unregister(&self.prefixed(name))
    }

    fn unregister_all(&self) {
        self.inner.unregister_all();
    }

    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric)) {
        let prefix = &self.prefix;
        self.inner.each(&mut |name, metric| {
            match name.strip_prefix(prefix.as_str()) {
                Some(stripped) => visitor(stripped, metric),
                None => visitor(name, metric),
            }
        });
    }

    fn get_all(&self) -> HashMap<String, MetricExport> {
        let mut out = HashMap::new();
        self.each(&mut |name, metric| {
            out.insert(name.to_string(), metric.export());
        });
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_metric_wins() {
        let registry = MetricRegistry::new();

        let a = registry.counter("counter");
        let b = registry.counter("counter");
        a.inc(1);
        assert_eq!(b.count(), 1);

        let a = registry.histogram("histogram");
        let b = registry.histogram("histogram");
        a.update(0);
        assert_eq!(b.count(), 1);

        let a = registry.meter("meter");
        let b = registry.meter("meter");
        a.mark(1);
        assert_eq!(b.count(), 1);
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let registry = MetricRegistry::new();
        registry.register("c", Metric::Counter(Arc::new(Counter::new()))).unwrap();
        let err = registry
            .register("c", Metric::Counter(Arc::new(Counter::new())))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("c".to_string()));
    }

    #[test]
    fn unregister_removes_and_returns() {
        let registry = MetricRegistry::new();
        registry.counter("c");
        assert!(registry.get("c").is_some());

        let removed = registry.unregister("c");
        assert!(removed.is_some());
        assert!(registry.get("c").is_none());
        assert!(registry.unregister("c").is_none());
    }

    #[test]
    fn unregister_stops_meter() {
        let registry = MetricRegistry::new();
        let meter = registry.meter("m");
        registry.unregister("m");
        // the Arc handle is still independently usable, but its inner is marked stopped.
        meter.mark(1);
    }

    #[test]
    fn each_visits_consistent_snapshot() {
        let registry = MetricRegistry::new();
        registry.counter("a");
        registry.counter("b");

        let mut seen = vec![];
        registry.each(&mut |name, _| seen.push(name.to_string()));
        seen.sort();
        assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn get_all_exports_uniform_structures() {
        let registry = MetricRegistry::new();
        registry.counter("requests").inc(3);

        let all = registry.get_all();
        match &all["requests"] {
            MetricExport::Counter { count } => assert_eq!(*count, 3),
            _ => panic!("expected counter export"),
        }
    }

    #[test]
    fn prefixed_registry_prefixes_names() {
        let inner = MetricRegistry::new();
        let prefixed = PrefixedRegistry::new("app.", inner);

        prefixed.counter_through("requests").inc(1);
        assert!(prefixed_inner_has(&prefixed, "app.requests"));
    }

    trait TestExt {
        fn counter_through(&self, name: &str) -> Arc<Counter>;
    }

    impl<R: Registry> TestExt for PrefixedRegistry<R> {
        fn counter_through(&self, name: &str) -> Arc<Counter> {
            match self.get_or_register_with(name, Box::new(|| Metric::Counter(Arc::new(Counter::new())))) {
                Metric::Counter(c) => c,
                _ => unreachable!(),
            }
        }
    }

    fn prefixed_inner_has<R: Registry>(registry: &PrefixedRegistry<R>, full_name: &str) -> bool {
        registry.inner.get(full_name).is_some()
    }

    #[test]
    fn concurrent_get_or_register_returns_same_counter() {
        use std::thread;

        let registry = Arc::new(MetricRegistry::new());
        let mut handles = vec![];
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                registry.counter("c").inc(1);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.counter("c").count(), 16);
    }
}

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
//! In-process counters, gauges, histograms, meters and timers, bound together by a thread-safe
//! registry.
//!
//! The design of the crate is based fairly closely off of the [Dropwizard Metrics] library from
//! the Java ecosystem.
//!
//! # Examples
//!
//! ```
//! use tachymeter::{MetricExport, MetricRegistry, Registry};
//!
//! // A `MetricRegistry` stores metrics, indexed by name.
//! let registry = MetricRegistry::new();
//!
//! let yaks_shaved = registry.counter("yaks.shaved");
//! let _request_timer = registry.timer("server.requests");
//!
//! // do some work and record some values.
//! for yak in find_some_yaks() {
//!     shave_yak(yak);
//!     yaks_shaved.inc(1);
//! }
//!
//! // Grab a snapshot of the metrics currently registered and print their values.
//! for (name, metric) in registry.get_all() {
//!     match metric {
//!         MetricExport::Counter { count } => println!("{} is a counter with value {}", name, count),
//!         MetricExport::Timer { p99, .. } => println!("{} has a 99th percentile of {}ns", name, p99),
//!         _ => {}
//!     }
//! }
//!
//! # fn find_some_yaks() -> &'static [()] { &[] }
//! # fn shave_yak(_: &()) {}
//! ```
//!
//! [Dropwizard Metrics]: https://github.com/dropwizard/metrics
#![warn(missing_docs)]

pub use crate::clock::*;
pub use crate::counter::*;
pub use crate::error::*;
pub use crate::gauge::*;
pub use crate::healthcheck::*;
pub use crate::histogram::*;
pub use crate::meter::{Meter, MeterSnapshot};
pub use crate::registry::*;
pub use crate::sample::{ExpDecaySample, Sample, SampleSnapshot, UniformSample};
pub use crate::timer::*;

mod arbiter;
mod clock;
mod counter;
mod error;
mod ewma;
mod gauge;
mod healthcheck;
mod histogram;
mod meter;
mod registry;
mod sample;
mod timer;

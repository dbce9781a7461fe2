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
use thiserror::Error;

/// Errors produced by [`MetricRegistry`](crate::MetricRegistry) operations.
///
/// Absence of a name is not represented here: [`Registry::get`](crate::Registry::get) and
/// [`Registry::unregister`](crate::Registry::unregister) return `Option<Metric>` directly rather
/// than failing.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RegistryError {
    /// A metric with the given name is already registered.
    #[error("a metric named {0:?} is already registered")]
    DuplicateName(String),
}

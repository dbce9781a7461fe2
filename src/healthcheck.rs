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

//! A user-run predicate recording success or failure.

use parking_lot::Mutex;

/// A metric recording the outcome of a user-run check.
///
/// Unlike the other instruments, a healthcheck's value is set by the embedder calling
/// [`healthy`](Healthcheck::healthy) or [`unhealthy`](Healthcheck::unhealthy) directly, or by
/// supplying a checker closure invoked on each call to [`check`](Healthcheck::check).
pub struct Healthcheck {
    error: Mutex<Option<String>>,
    checker: Option<Box<dyn Fn(&Healthcheck) + Sync + Send>>,
}

impl Default for Healthcheck {
    #[inline]
    fn default() -> Healthcheck {
        Healthcheck::new()
    }
}

impl Healthcheck {
    /// Creates a new healthcheck with no checker. It reports healthy until explicitly marked
    /// otherwise.
    pub fn new() -> Healthcheck {
        Healthcheck {
            error: Mutex::new(None),
            checker: None,
        }
    }

    /// Creates a new healthcheck whose [`check`](Self::check) method invokes the given closure.
    ///
    /// The closure is expected to call [`healthy`](Self::healthy) or
    /// [`unhealthy`](Self::unhealthy) on the healthcheck it's passed to record the outcome.
    pub fn new_with<F>(checker: F) -> Healthcheck
    where
        F: Fn(&Healthcheck) + 'static + Sync + Send,
    {
        Healthcheck {
            error: Mutex::new(None),
            checker: Some(Box::new(checker)),
        }
    }

    /// Runs the stored checker closure, if any, after clearing any previously recorded error.
    pub fn check(&self) {
        self.healthy();
        if let Some(checker) = &self.checker {
            checker(self);
        }
    }

    /// Marks the healthcheck as healthy, clearing any previously recorded error.
    #[inline]
    pub fn healthy(&self) {
        *self.error.lock() = None;
    }

    /// Marks the healthcheck as unhealthy, recording the given message.
    #[inline]
    pub fn unhealthy(&self, message: impl Into<String>) {
        *self.error.lock() = Some(message.into());
    }

    /// Returns the most recently recorded error message, or `None` if healthy.
    #[inline]
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

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
//! A metric which computes (or is fed) an instantaneous value.

use parking_lot::RwLock;
use std::sync::Arc;

/// A generalized metric which reports an arbitrary, instantaneously-computed
/// value.
///
/// The teacher library (`witchcraft-metrics`) implements this as a trait
/// object-safe `Gauge` backed by any `Fn() -> R` closure; the Python original
/// instead allows monkey-patching `get_value`. This type replaces both with
/// an explicit value-producing function supplied at construction and
/// optionally replaced later, per `spec.md` §4.6 / §9 — setters and
/// producers coexist, with the producer taking precedence when both are set.
pub struct Gauge {
    value: RwLock<Option<f64>>,
    producer: RwLock<Option<Arc<dyn Fn() -> f64 + Sync + Send>>>,
}

impl Default for Gauge {
    fn default() -> Gauge {
        Gauge::new()
    }
}

impl Gauge {
    /// Creates a new gauge with no value and no producer.
    ///
    /// `get_value` returns `None` until `set` or `set_producer` is called.
    pub fn new() -> Gauge {
        Gauge {
            value: RwLock::new(None),
            producer: RwLock::new(None),
        }
    }

    /// Creates a new gauge whose value is computed by `producer` on every
    /// read.
    pub fn with_producer<F>(producer: F) -> Gauge
    where
        F: Fn() -> f64 + Sync + Send + 'static,
    {
        Gauge {
            value: RwLock::new(None),
            producer: RwLock::new(Some(Arc::new(producer))),
        }
    }

    /// Sets the value reported by the gauge's setter-backed slot.
    ///
    /// Has no effect on reads while a producer is installed.
    pub fn set(&self, value: f64) {
        *self.value.write() = Some(value);
    }

    /// Installs (or replaces) the value-producing function. Pass `None` to
    /// remove it and fall back to the setter-backed value.
    pub fn set_producer(&self, producer: Option<Arc<dyn Fn() -> f64 + Sync + Send>>) {
        *self.producer.write() = producer;
    }

    /// Returns the gauge's current value: the producer's result if one is
    /// installed, otherwise the last value passed to [`Gauge::set`], or
    /// `None` if neither has ever been set.
    pub fn get_value(&self) -> Option<f64> {
        if let Some(producer) = self.producer.read().as_ref() {
            Some(producer())
        } else {
            *self.value.read()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn absent_until_set() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get_value(), None);
    }

    #[test]
    fn setter_reports_last_value() {
        let gauge = Gauge::new();
        gauge.set(42.0);
        assert_eq!(gauge.get_value(), Some(42.0));
        gauge.set(7.0);
        assert_eq!(gauge.get_value(), Some(7.0));
    }

    #[test]
    fn producer_takes_precedence_over_setter() {
        let gauge = Gauge::new();
        gauge.set(1.0);
        gauge.set_producer(Some(Arc::new(|| 99.0)));
        assert_eq!(gauge.get_value(), Some(99.0));
    }

    #[test]
    fn producer_is_reevaluated_on_each_read() {
        let counter = Arc::new(AtomicI64::new(0));
        let c = counter.clone();
        let gauge = Gauge::with_producer(move || c.fetch_add(1, Ordering::Relaxed) as f64);

        assert_eq!(gauge.get_value(), Some(0.0));
        assert_eq!(gauge.get_value(), Some(1.0));
    }
}

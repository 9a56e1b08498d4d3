// Copyright 2024 Palantir Technologies, Inc.
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
//! Convenience free functions bound to the process-wide default registry.
//!
//! Grounded on `caliper.registry.Registry.default_registry` (the lazily
//! initialized singleton) combined with the teacher's `counter`/`meter`/etc.
//! accessor naming. Each function accepts an optional name; when omitted, a
//! process-unique name is generated so anonymous metrics never collide with
//! each other (though they can still collide with an explicitly-named
//! metric registered under the same generated name, which surfaces as the
//! usual `DuplicateName` error).

use crate::counter::Counter;
use crate::error::MetricsError;
use crate::gauge::Gauge;
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::registry::default_registry;
use crate::timer::Timer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static ANONYMOUS_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn anonymous_name(kind: &str) -> String {
    let n = ANONYMOUS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("anonymous_{kind}_{n}")
}

/// Returns the named counter from the default registry, creating it if
/// absent. Generates a unique name if `name` is `None`.
pub fn counter(name: Option<&str>) -> Result<Arc<Counter>, MetricsError> {
    let owned;
    let name = match name {
        Some(name) => name,
        None => {
            owned = anonymous_name("counter");
            &owned
        }
    };
    default_registry().counter(name)
}

/// Returns the named gauge from the default registry, creating it if
/// absent. Generates a unique name if `name` is `None`.
pub fn gauge(name: Option<&str>) -> Result<Arc<Gauge>, MetricsError> {
    let owned;
    let name = match name {
        Some(name) => name,
        None => {
            owned = anonymous_name("gauge");
            &owned
        }
    };
    default_registry().gauge(name)
}

/// Returns the named histogram from the default registry, creating it if
/// absent. Generates a unique name if `name` is `None`.
pub fn histogram(name: Option<&str>) -> Result<Arc<Histogram>, MetricsError> {
    let owned;
    let name = match name {
        Some(name) => name,
        None => {
            owned = anonymous_name("histogram");
            &owned
        }
    };
    default_registry().histogram(name)
}

/// Returns the named meter from the default registry, creating it if
/// absent. Generates a unique name if `name` is `None`.
pub fn meter(name: Option<&str>) -> Result<Arc<Meter>, MetricsError> {
    let owned;
    let name = match name {
        Some(name) => name,
        None => {
            owned = anonymous_name("meter");
            &owned
        }
    };
    default_registry().meter(name)
}

/// Returns the named timer from the default registry, creating it if
/// absent. Generates a unique name if `name` is `None`.
pub fn timer(name: Option<&str>) -> Result<Arc<Timer>, MetricsError> {
    let owned;
    let name = match name {
        Some(name) => name,
        None => {
            owned = anonymous_name("timer");
            &owned
        }
    };
    default_registry().timer(name)
}

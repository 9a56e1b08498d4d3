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
//! An in-process instrumentation library: counters, gauges, histograms,
//! timers and meters over bounded-memory reservoirs.
//!
//! The design is based closely on the [Dropwizard Metrics] library from the
//! Java ecosystem, by way of a Python port.
//!
//! # Examples
//!
//! ```
//! use caliper::MetricRegistry;
//! use std::time::Duration;
//!
//! // A `MetricRegistry` stores metrics, addressed by dotted name.
//! let registry = MetricRegistry::new();
//!
//! let requests = registry.counter("server.requests").unwrap();
//! let latency = registry.timer("server.latency").unwrap();
//!
//! requests.inc();
//! {
//!     let _timed = latency.time();
//!     // ... do some work ...
//! }
//!
//! println!("requests so far: {}", requests.count());
//! println!("p99 latency: {:?}", latency.snapshot().get_value(0.99));
//! ```
//!
//! [Dropwizard Metrics]: https://github.com/dropwizard/metrics
#![warn(missing_docs)]

pub use crate::clock::{Clock, SystemClock};
pub use crate::counter::Counter;
pub use crate::error::MetricsError;
pub use crate::ewma::Ewma;
pub use crate::facade::{counter, gauge, histogram, meter, timer};
pub use crate::gauge::Gauge;
pub use crate::histogram::Histogram;
pub use crate::meter::Meter;
pub use crate::registry::{default_registry, Metric, MetricRegistry, QueryResult};
pub use crate::reservoir::{
    ExponentiallyDecayingReservoir, Reservoir, ReservoirSnapshot, SlidingWindowReservoir,
    UniformReservoir, UnboundedReservoir,
};
pub use crate::rng::MetricsRng;
pub use crate::snapshot::{Snapshot, WeightedSnapshot};
pub use crate::timer::{Timer, TimerGuard};

mod clock;
mod counter;
mod error;
mod ewma;
mod facade;
mod gauge;
mod histogram;
mod meter;
mod registry;
mod reservoir;
mod rng;
mod snapshot;
mod timer;

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
//! The reservoir family: bounded samplers over an unbounded value stream.
//!
//! Mirrors the teacher's `Reservoir`/`Snapshot` trait split in
//! `witchcraft-metrics/src/reservoir/mod.rs`, generalized from `i64` samples
//! to `f64` (this crate's scalar `Value` type) and from a single
//! `exponential-decay-histogram`-backed snapshot type to the two concrete
//! snapshot shapes `spec.md` §4.2/§4.3 calls for.

pub mod exponentially_decaying;
pub mod sliding_window;
pub mod uniform;
pub mod unbounded;

pub use exponentially_decaying::ExponentiallyDecayingReservoir;
pub use sliding_window::SlidingWindowReservoir;
pub use uniform::UniformReservoir;
pub use unbounded::UnboundedReservoir;

use crate::error::MetricsError;
use crate::snapshot::{Snapshot, WeightedSnapshot};

/// A statistically representative subset of a set of values.
///
/// `len` reports the total number of values ever observed, independent of
/// how many samples are currently retained (`spec.md` §3, "Reservoir
/// state").
pub trait Reservoir: 'static + Sync + Send {
    /// Adds a value to the reservoir.
    fn update(&self, value: f64);

    /// Returns a snapshot of the values currently retained.
    fn snapshot(&self) -> ReservoirSnapshot;

    /// Returns the total number of values ever added to the reservoir.
    fn len(&self) -> u64;

    /// Returns `true` if no values have ever been added.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The snapshot produced by a [`Reservoir`].
///
/// Unweighted reservoirs (unbounded, sliding-window, uniform) produce a
/// [`Snapshot`]; the exponentially-decaying reservoir produces a
/// [`WeightedSnapshot`]. Both expose the same read surface, so callers that
/// only care about percentiles/mean/stddev don't need to match on the
/// reservoir's kind.
pub enum ReservoirSnapshot {
    /// An unweighted snapshot.
    Plain(Snapshot),
    /// A weighted snapshot.
    Weighted(WeightedSnapshot),
}

impl ReservoirSnapshot {
    /// Returns the value at the given quantile. See [`Snapshot::get_value`]
    /// and [`WeightedSnapshot::get_value`].
    pub fn get_value(&self, q: f64) -> Result<f64, MetricsError> {
        match self {
            ReservoirSnapshot::Plain(s) => s.get_value(q),
            ReservoirSnapshot::Weighted(s) => s.get_value(q),
        }
    }

    /// The arithmetic (or weighted) mean of the retained values.
    pub fn mean(&self) -> f64 {
        match self {
            ReservoirSnapshot::Plain(s) => s.mean(),
            ReservoirSnapshot::Weighted(s) => s.mean(),
        }
    }

    /// The standard deviation of the retained values.
    pub fn stddev(&self) -> f64 {
        match self {
            ReservoirSnapshot::Plain(s) => s.stddev(),
            ReservoirSnapshot::Weighted(s) => s.stddev(),
        }
    }

    /// The minimum retained value, or 0 if empty.
    pub fn min(&self) -> f64 {
        match self {
            ReservoirSnapshot::Plain(s) => s.min(),
            ReservoirSnapshot::Weighted(s) => s.min(),
        }
    }

    /// The maximum retained value, or 0 if empty.
    pub fn max(&self) -> f64 {
        match self {
            ReservoirSnapshot::Plain(s) => s.max(),
            ReservoirSnapshot::Weighted(s) => s.max(),
        }
    }

    /// The number of values retained in the snapshot (not the reservoir's
    /// all-time count; see [`Reservoir::len`]).
    pub fn len(&self) -> usize {
        match self {
            ReservoirSnapshot::Plain(s) => s.len(),
            ReservoirSnapshot::Weighted(s) => s.len(),
        }
    }

    /// Returns `true` if the snapshot retains no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Snapshot> for ReservoirSnapshot {
    fn from(s: Snapshot) -> Self {
        ReservoirSnapshot::Plain(s)
    }
}

impl From<WeightedSnapshot> for ReservoirSnapshot {
    fn from(s: WeightedSnapshot) -> Self {
        ReservoirSnapshot::Weighted(s)
    }
}

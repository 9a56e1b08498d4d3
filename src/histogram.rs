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
//! A metric tracking a statistical distribution of values.

use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir, ReservoirSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// A metric tracking a statistical distribution of values over a
/// [`Reservoir`].
///
/// Grounded on `witchcraft-metrics`' `Histogram`: a running count plus a
/// pluggable reservoir, defaulting to the exponentially-decaying one.
pub struct Histogram {
    count: AtomicU64,
    reservoir: Box<dyn Reservoir>,
}

impl Default for Histogram {
    fn default() -> Histogram {
        Histogram::new(ExponentiallyDecayingReservoir::new())
    }
}

impl Histogram {
    /// Creates a histogram backed by the default exponentially-decaying
    /// reservoir.
    pub fn new_default() -> Histogram {
        Histogram::default()
    }

    /// Creates a histogram backed by the given reservoir.
    pub fn new<R>(reservoir: R) -> Histogram
    where
        R: Reservoir,
    {
        Histogram {
            count: AtomicU64::new(0),
            reservoir: Box::new(reservoir),
        }
    }

    /// Adds a value to the histogram.
    pub fn update(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.reservoir.update(value);
    }

    /// The number of values ever added to the histogram.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// A snapshot of the statistical distribution of retained values.
    pub fn snapshot(&self) -> ReservoirSnapshot {
        self.reservoir.snapshot()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reservoir::UnboundedReservoir;

    #[test]
    fn counts_every_update_independent_of_reservoir_retention() {
        let histogram = Histogram::new(UnboundedReservoir::new());
        assert_eq!(histogram.count(), 0);

        histogram.update(15.0);
        assert_eq!(histogram.count(), 1);
        assert_eq!(histogram.snapshot().min(), 15.0);

        histogram.update(10.0);
        assert_eq!(histogram.count(), 2);
        assert_eq!(histogram.snapshot().min(), 10.0);
    }

    #[test]
    fn defaults_to_the_exponentially_decaying_reservoir() {
        let histogram = Histogram::default();
        histogram.update(1.0);
        histogram.update(2.0);
        assert_eq!(histogram.count(), 2);
        assert_eq!(histogram.snapshot().len(), 2);
    }
}

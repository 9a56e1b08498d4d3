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
//! A reservoir that retains every value ever added.

use crate::reservoir::{Reservoir, ReservoirSnapshot};
use crate::snapshot::Snapshot;
use parking_lot::Mutex;

/// A reservoir which retains every value ever added to it.
///
/// Grounded on `caliper.reservoir.Reservoir` (the Python original's
/// "store everything" base case).
#[derive(Default)]
pub struct UnboundedReservoir {
    values: Mutex<Vec<f64>>,
}

impl UnboundedReservoir {
    /// Creates a new, empty unbounded reservoir.
    pub fn new() -> Self {
        UnboundedReservoir::default()
    }
}

impl Reservoir for UnboundedReservoir {
    fn update(&self, value: f64) {
        self.values.lock().push(value);
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        Snapshot::new(self.values.lock().iter().copied()).into()
    }

    fn len(&self) -> u64 {
        self.values.lock().len() as u64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn retains_every_value() {
        let reservoir = UnboundedReservoir::new();
        for i in 0..100 {
            reservoir.update(i as f64);
        }

        assert_eq!(reservoir.len(), 100);
        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.min(), 0.0);
        assert_eq!(snapshot.max(), 99.0);
        assert_eq!(snapshot.len(), 100);
    }
}

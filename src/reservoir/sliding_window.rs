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
//! A reservoir that retains only the most recent `k` values.

use crate::reservoir::{Reservoir, ReservoirSnapshot};
use crate::snapshot::Snapshot;
use parking_lot::Mutex;

/// The default window size, matching `spec.md` §3.
pub const DEFAULT_SIZE: usize = 100;

struct State {
    buffer: Vec<f64>,
    count: u64,
}

/// A reservoir which retains the `size` most recently added values.
///
/// The first `size` updates append; every update after that overwrites
/// position `count mod size`, per `spec.md` §4.1's "Sliding-window
/// reservoir" contract. Grounded on `caliper.reservoir.SlidingWindowReservoir`.
pub struct SlidingWindowReservoir {
    size: usize,
    state: Mutex<State>,
}

impl SlidingWindowReservoir {
    /// Creates a reservoir retaining the default window size.
    pub fn new() -> Self {
        SlidingWindowReservoir::with_size(DEFAULT_SIZE)
    }

    /// Creates a reservoir retaining the `size` most recent values.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn with_size(size: usize) -> Self {
        assert!(size > 0, "sliding window reservoir size must be positive");
        SlidingWindowReservoir {
            size,
            state: Mutex::new(State {
                buffer: Vec::with_capacity(size),
                count: 0,
            }),
        }
    }
}

impl Default for SlidingWindowReservoir {
    fn default() -> Self {
        SlidingWindowReservoir::new()
    }
}

impl Reservoir for SlidingWindowReservoir {
    fn update(&self, value: f64) {
        let mut state = self.state.lock();
        if (state.count as usize) < self.size {
            state.buffer.push(value);
        } else {
            let index = (state.count as usize) % self.size;
            state.buffer[index] = value;
        }
        state.count += 1;
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        Snapshot::new(self.state.lock().buffer.iter().copied()).into()
    }

    fn len(&self) -> u64 {
        self.state.lock().count
    }
}

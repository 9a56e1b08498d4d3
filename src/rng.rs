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
//! Injectable randomness, mirroring [`crate::Clock`]'s test/production split.
//!
//! The uniform reservoir's Algorithm R and the exponentially-decaying
//! reservoir's forward-decay priorities both need two primitives: a draw on
//! the open interval `(0, 1)` and an inclusive-bounds integer draw. Both must
//! be overridable so sampling decisions are reproducible in tests (see
//! `caliper.reservoir`'s use of `unittest.mock.patch` on `random`/`randint`
//! in the original Python implementation).

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

pub(crate) static SYSTEM_RNG: Lazy<Arc<SystemRng>> = Lazy::new(|| Arc::new(SystemRng::new()));

/// A source of randomness for sampling reservoirs.
pub trait MetricsRng: 'static + Sync + Send {
    /// Draws uniformly from the open interval `(0, 1)`; never returns `0.0`.
    fn next_open01(&self) -> f64;

    /// Draws uniformly from the inclusive integer range `[0, inclusive_max]`.
    ///
    /// # Panics
    ///
    /// May panic if `inclusive_max` doesn't fit the generator's range type.
    fn next_index(&self, inclusive_max: u64) -> u64;
}

/// A [`MetricsRng`] backed by a thread-safe, process-seeded generator.
///
/// Using a `SmallRng` rather than `rand::thread_rng()` avoids the cost of
/// thread-local storage lookups on the hot sampling path, matching the
/// rationale in `exponential-decay-histogram`'s own reservoir implementation.
pub struct SystemRng {
    rng: Mutex<SmallRng>,
}

impl SystemRng {
    fn new() -> Self {
        SystemRng {
            rng: Mutex::new(SmallRng::from_rng(&mut rand::rng())),
        }
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        SystemRng::new()
    }
}

impl MetricsRng for SystemRng {
    fn next_open01(&self) -> f64 {
        let mut rng = self.rng.lock();
        loop {
            let v: f64 = rng.random();
            if v != 0.0 {
                return v;
            }
        }
    }

    fn next_index(&self, inclusive_max: u64) -> u64 {
        let mut rng = self.rng.lock();
        rng.random_range(0..=inclusive_max)
    }
}

/// Returns the process-wide default randomness source.
pub(crate) fn system_rng() -> Arc<dyn MetricsRng> {
    SYSTEM_RNG.clone()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::VecDeque;

    /// A scripted [`MetricsRng`] that replays a fixed sequence of draws,
    /// for deterministic reservoir tests.
    pub struct ScriptedRng {
        indices: Mutex<VecDeque<u64>>,
        opens: Mutex<VecDeque<f64>>,
    }

    impl ScriptedRng {
        pub fn new(indices: Vec<u64>, opens: Vec<f64>) -> Self {
            ScriptedRng {
                indices: Mutex::new(indices.into()),
                opens: Mutex::new(opens.into()),
            }
        }
    }

    impl MetricsRng for ScriptedRng {
        fn next_open01(&self) -> f64 {
            self.opens
                .lock()
                .pop_front()
                .expect("ScriptedRng ran out of open01 draws")
        }

        fn next_index(&self, _inclusive_max: u64) -> u64 {
            self.indices
                .lock()
                .pop_front()
                .expect("ScriptedRng ran out of index draws")
        }
    }
}

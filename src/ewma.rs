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
//! Exponentially-weighted moving average rate estimation.
//!
//! Grounded on `caliper.metric.EWMA` (the Python original): a discretely
//! ticked estimator, not a continuous one. Callers `update()` a count of
//! events between ticks and call `tick()` once per fixed interval (5 seconds
//! here, matching both the original and the teacher's `Meter`) to fold the
//! uncounted events into the decaying rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// The tick interval shared by all standard alphas, in seconds.
pub const TICK_INTERVAL_SECS: f64 = 5.0;

const SECONDS_PER_MINUTE: f64 = 60.0;

fn alpha_for(interval_secs: f64, minutes: f64) -> f64 {
    1.0 - (-interval_secs / (SECONDS_PER_MINUTE * minutes)).exp()
}

/// An exponentially-weighted moving average over discretely-ticked counts.
///
/// `alpha` controls the decay rate; `interval` is the expected spacing
/// between calls to `tick()`, in seconds. Events between ticks accumulate in
/// `uncounted` and are folded into `rate` on the next `tick()`.
pub struct Ewma {
    alpha: f64,
    interval: f64,
    uncounted: AtomicU64,
    initialized: AtomicBool,
    rate: Mutex<f64>,
}

impl Ewma {
    /// Creates an EWMA with the given decay constant and tick interval (in
    /// seconds).
    pub fn new(alpha: f64, interval_secs: f64) -> Ewma {
        Ewma {
            alpha,
            interval: interval_secs,
            uncounted: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            rate: Mutex::new(0.0),
        }
    }

    /// An EWMA with a decaying 1-minute average, ticked every 5 seconds.
    pub fn one_minute() -> Ewma {
        Ewma::new(alpha_for(TICK_INTERVAL_SECS, 1.0), TICK_INTERVAL_SECS)
    }

    /// An EWMA with a decaying 5-minute average, ticked every 5 seconds.
    pub fn five_minutes() -> Ewma {
        Ewma::new(alpha_for(TICK_INTERVAL_SECS, 5.0), TICK_INTERVAL_SECS)
    }

    /// An EWMA with a decaying 15-minute average, ticked every 5 seconds.
    pub fn fifteen_minutes() -> Ewma {
        Ewma::new(alpha_for(TICK_INTERVAL_SECS, 15.0), TICK_INTERVAL_SECS)
    }

    /// Records `n` events observed since the last tick.
    pub fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Folds the events accumulated since the last tick into the decaying
    /// rate, then resets the uncounted count to 0.
    ///
    /// The first call seeds `rate` directly from the instantaneous rate for
    /// this interval rather than decaying towards it, matching the
    /// original's `if not self._initialized` branch.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::AcqRel);
        let instant_rate = count as f64 / self.interval;

        let mut rate = self.rate.lock().unwrap();
        if self.initialized.swap(true, Ordering::AcqRel) {
            *rate += self.alpha * (instant_rate - *rate);
        } else {
            *rate = instant_rate;
        }
    }

    /// The current rate, in events per second.
    pub fn rate(&self) -> f64 {
        *self.rate.lock().unwrap()
    }

    /// Applies `ticks` additional ticks of decay towards a rate of zero,
    /// without touching `uncounted`.
    ///
    /// Equivalent to calling `tick()` `ticks` more times on an otherwise
    /// quiescent EWMA, but computed in closed form: each no-op tick
    /// multiplies the rate by `(1 - alpha)`, so `ticks` of them multiply it
    /// by `(1 - alpha).powi(ticks)`. Used by [`crate::meter::Meter`] to
    /// catch up after a gap of several tick intervals without looping.
    pub(crate) fn decay(&self, ticks: u64) {
        if ticks == 0 {
            return;
        }
        let mut rate = self.rate.lock().unwrap();
        match u32::try_from(ticks) {
            Ok(ticks) => *rate *= (1.0 - self.alpha).powi(ticks as i32),
            Err(_) => *rate = 0.0,
        }
    }
}

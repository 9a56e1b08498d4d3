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
//! A reservoir which exponentially weights in favor of recent values,
//! following the forward-decay model of Cormode, Shkapenyuk, Srivastava and
//! Xu.
//!
//! Grounded on two sources: `caliper.reservoir.ExponentiallyDecayingReservoir`
//! (the Python original this spec was distilled from, for the exact
//! algorithmic contract) and
//! `examples/other_examples/.../sfackler-exponential-decay-histogram` (the
//! crate the teacher, `witchcraft-metrics`, depends on for this exact
//! reservoir), for the idiomatic Rust storage shape: a `BTreeMap` keyed by
//! `NotNan<f64>` priority rather than a plain dict.

use crate::clock::{system_clock, Clock};
use crate::error::MetricsError;
use crate::reservoir::{Reservoir, ReservoirSnapshot};
use crate::rng::{system_rng, MetricsRng};
use crate::snapshot::WeightedSnapshot;
use ordered_float::NotNan;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The default reservoir size, matching `spec.md` §3.
pub const DEFAULT_SIZE: usize = 1028;
/// The default decay constant, matching `spec.md` §4.1.
pub const DEFAULT_ALPHA: f64 = 0.015;
/// The rescale threshold, matching `spec.md` §4.1.
pub const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

struct WeightedSample {
    value: f64,
    weight: f64,
}

struct State {
    values: BTreeMap<NotNan<f64>, WeightedSample>,
    landmark: Instant,
    next_rescale: Instant,
    count: u64,
}

/// A reservoir which exponentially weights in favor of recent values.
pub struct ExponentiallyDecayingReservoir {
    size: usize,
    alpha: f64,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn MetricsRng>,
    state: Mutex<State>,
}

/// A builder for [`ExponentiallyDecayingReservoir`], mirroring the teacher's
/// `ExponentiallyDecayingReservoir::builder()`.
pub struct Builder {
    size: usize,
    alpha: f64,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn MetricsRng>,
}

impl Builder {
    /// Sets the number of samples retained.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the decay constant.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the [`Clock`] used as the reservoir's time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the [`MetricsRng`] used to draw sampling priorities.
    pub fn rng(mut self, rng: Arc<dyn MetricsRng>) -> Self {
        self.rng = rng;
        self
    }

    /// Creates the reservoir.
    pub fn build(self) -> ExponentiallyDecayingReservoir {
        assert!(self.size > 0, "reservoir size must be positive");
        let now = self.clock.now();
        ExponentiallyDecayingReservoir {
            size: self.size,
            alpha: self.alpha,
            clock: self.clock,
            rng: self.rng,
            state: Mutex::new(State {
                values: BTreeMap::new(),
                landmark: now,
                next_rescale: now + RESCALE_THRESHOLD,
                count: 0,
            }),
        }
    }
}

impl ExponentiallyDecayingReservoir {
    /// Creates a new reservoir with the default size and alpha.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new builder, defaulted to the process-wide clock and
    /// randomness source.
    pub fn builder() -> Builder {
        Builder {
            size: DEFAULT_SIZE,
            alpha: DEFAULT_ALPHA,
            clock: system_clock(),
            rng: system_rng(),
        }
    }

    /// Adds `value` to the reservoir at the current time.
    ///
    /// # Panics
    ///
    /// Panics (via [`MetricsError::LandmarkViolation`]) if the clock has
    /// regressed to or before the reservoir's landmark. Use
    /// [`ExponentiallyDecayingReservoir::try_update_at`] to handle this
    /// without panicking.
    pub fn update_at(&self, time: Instant, value: f64) {
        self.try_update_at(time, value)
            .expect("observation time did not advance past the reservoir's landmark");
    }

    /// Adds `value` observed at `time`, returning `Err` instead of panicking
    /// if `time` does not strictly advance past the current landmark.
    pub fn try_update_at(&self, time: Instant, value: f64) -> Result<(), MetricsError> {
        let mut state = self.state.lock();

        if time <= state.landmark {
            return Err(MetricsError::LandmarkViolation);
        }

        self.rescale_if_needed(&mut state, time);

        let weight = Self::sample_weight(self.alpha, (time - state.landmark).as_secs_f64());

        let mut scale = self.rng.next_open01();
        while scale == 0.0 {
            scale = self.rng.next_open01();
        }
        let priority = NotNan::new(weight / scale).expect("priority must not be NaN");

        let sample = WeightedSample { value, weight };

        if state.values.len() < self.size {
            state.values.insert(priority, sample);
        } else {
            let first = *state
                .values
                .keys()
                .next()
                .expect("non-empty when at capacity");
            if first < priority && !state.values.contains_key(&priority) {
                state.values.insert(priority, sample);
                state.values.remove(&first);
            }
        }

        state.count += 1;
        Ok(())
    }

    fn sample_weight(alpha: f64, elapsed_secs: f64) -> f64 {
        (alpha * elapsed_secs).exp()
    }

    fn rescale_if_needed(&self, state: &mut State, now: Instant) {
        if now >= state.next_rescale {
            self.rescale(state, now);
        }
    }

    fn rescale(&self, state: &mut State, now: Instant) {
        state.next_rescale = now + RESCALE_THRESHOLD;

        let old_landmark = state.landmark;
        state.landmark = now;
        let scale = (-self.alpha * (now - old_landmark).as_secs_f64()).exp();

        state.values = state
            .values
            .iter()
            .map(|(k, v)| {
                let scaled_key = NotNan::new(k.into_inner() * scale).expect("scale preserves finiteness");
                (
                    scaled_key,
                    WeightedSample {
                        value: v.value,
                        weight: v.weight * scale,
                    },
                )
            })
            .collect();
    }
}

impl Default for ExponentiallyDecayingReservoir {
    fn default() -> Self {
        ExponentiallyDecayingReservoir::new()
    }
}

impl Reservoir for ExponentiallyDecayingReservoir {
    fn update(&self, value: f64) {
        self.update_at(self.clock.now(), value);
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        let state = self.state.lock();
        WeightedSnapshot::new(state.values.values().map(|s| (s.value, s.weight))).into()
    }

    fn len(&self) -> u64 {
        self.state.lock().count
    }
}

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
//! A metric tracking the duration and rate of timed events.

use crate::clock::{system_clock, Clock};
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir, ReservoirSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A metric tracking the duration and rate of events, in seconds.
///
/// Composes a [`Histogram`] of durations with a [`Meter`] of occurrences, the
/// way `witchcraft-metrics`' `Timer` composes its reservoir and its
/// `Meter`. The guard returned by [`Timer::time`] supports `abort()` and
/// success/failure recording policy, following
/// `caliper.metric.Timer.Context` (the Python original's context manager):
/// Rust has no `exc_type` to inspect, so "failure" is approximated as
/// "the guard is dropping during an unwinding panic"
/// (`std::thread::panicking`).
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    clock: Arc<dyn Clock>,
}

impl Default for Timer {
    fn default() -> Timer {
        Timer::new(ExponentiallyDecayingReservoir::new())
    }
}

impl Timer {
    /// Creates a timer backed by the given reservoir, using the process-wide
    /// clock.
    pub fn new<R>(reservoir: R) -> Timer
    where
        R: Reservoir,
    {
        Timer::with_clock(reservoir, system_clock())
    }

    /// Creates a timer backed by the given reservoir and clock, for
    /// deterministic testing.
    pub fn with_clock<R>(reservoir: R, clock: Arc<dyn Clock>) -> Timer
    where
        R: Reservoir,
    {
        Timer {
            histogram: Histogram::new(reservoir),
            meter: Meter::with_clock(clock.clone()),
            clock,
        }
    }

    /// Adds a timed event of the given `duration`.
    ///
    /// Non-positive durations are silently discarded, matching the Python
    /// original's `if duration > 0`.
    pub fn update(&self, duration: Duration) {
        let seconds = duration.as_secs_f64();
        if seconds > 0.0 {
            self.histogram.update(seconds);
            self.meter.mark(1);
        }
    }

    /// Returns a guard which records the elapsed time since its creation
    /// when dropped, recording on both success and (unwinding) failure.
    pub fn time(&self) -> TimerGuard<'_> {
        self.time_with(true, true)
    }

    /// Returns a guard configured with explicit success/failure recording
    /// policy. The guard's `abort()` method suppresses recording regardless
    /// of this policy.
    pub fn time_with(&self, update_on_success: bool, update_on_failure: bool) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: self.clock.now(),
            aborted: false,
            update_on_success,
            update_on_failure,
        }
    }

    /// The number of events reported to the timer.
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// The one-minute rolling average rate, in events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    /// The five-minute rolling average rate, in events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    /// The fifteen-minute rolling average rate, in events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    /// The mean rate of events since the timer's creation, in events per
    /// second.
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// A snapshot of the statistical distribution of durations, in seconds.
    pub fn snapshot(&self) -> ReservoirSnapshot {
        self.histogram.snapshot()
    }
}

/// A guard type returned by [`Timer::time`] which records the elapsed
/// duration to its timer when dropped.
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
    aborted: bool,
    update_on_success: bool,
    update_on_failure: bool,
}

impl TimerGuard<'_> {
    /// Suppresses recording of this timed region, regardless of how it ends.
    pub fn abort(&mut self) {
        self.aborted = true;
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if self.aborted {
            return;
        }

        let failing = std::thread::panicking();
        let should_record = (failing && self.update_on_failure) || (!failing && self.update_on_success);
        if should_record {
            self.timer.update(self.timer.clock.now() - self.start);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::test::TestClock;
    use crate::reservoir::UnboundedReservoir;
    use std::time::Duration;

    #[test]
    fn update_records_into_both_histogram_and_meter() {
        let timer = Timer::new(UnboundedReservoir::new());

        for _ in 0..15 {
            timer.update(Duration::from_secs(0));
        }
        for _ in 0..5 {
            timer.update(Duration::from_nanos(5));
        }

        assert_eq!(timer.count(), 5);
        assert_eq!(timer.snapshot().len(), 5);
    }

    #[test]
    fn guard_records_elapsed_time_on_drop() {
        let clock = Arc::new(TestClock::new());
        let timer = Timer::with_clock(UnboundedReservoir::new(), clock.clone());

        let guard = timer.time();
        clock.advance(Duration::from_millis(10));
        drop(guard);

        assert_eq!(timer.count(), 1);
        assert!(timer.snapshot().max() >= 0.009);
    }

    #[test]
    fn aborted_guard_records_nothing() {
        let clock = Arc::new(TestClock::new());
        let timer = Timer::with_clock(UnboundedReservoir::new(), clock.clone());

        let mut guard = timer.time();
        clock.advance(Duration::from_millis(10));
        guard.abort();
        drop(guard);

        assert_eq!(timer.count(), 0);
    }

    #[test]
    fn guard_configured_to_skip_success_records_nothing_on_normal_drop() {
        let clock = Arc::new(TestClock::new());
        let timer = Timer::with_clock(UnboundedReservoir::new(), clock.clone());

        let guard = timer.time_with(false, true);
        clock.advance(Duration::from_millis(10));
        drop(guard);

        assert_eq!(timer.count(), 0);
    }
}

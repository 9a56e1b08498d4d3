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
//! Immutable, sorted statistical views over a reservoir's contents.
//!
//! `Snapshot` and `WeightedSnapshot` are plain, independent structs rather
//! than the teacher's `dyn Snapshot` trait object (which borrows its
//! percentile arithmetic from the `exponential-decay-histogram` crate): the
//! spec's linear-interpolated percentile and weighted-prefix percentile are
//! different enough algorithms that two concrete types read more clearly
//! than one trait with two incompatible implementations. The teacher's
//! approach of hacking immutability onto a sequence primitive (the Python
//! original subclasses `tuple`) is replaced with a sorted `Vec<f64>` built
//! once at construction and never mutated again.

use crate::error::MetricsError;
use once_cell::sync::OnceCell;

fn validate_quantile(q: f64) -> Result<(), MetricsError> {
    if (0.0..=1.0).contains(&q) {
        Ok(())
    } else {
        Err(MetricsError::InvalidQuantile(q))
    }
}

/// An immutable, ascending-sorted snapshot of unweighted values.
pub struct Snapshot {
    values: Vec<f64>,
    mean: OnceCell<f64>,
    stddev: OnceCell<f64>,
}

impl Snapshot {
    /// Builds a snapshot from an iterable of values, sorting them ascending.
    pub fn new<I>(values: I) -> Snapshot
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values: Vec<f64> = values.into_iter().collect();
        values.sort_by(|a, b| a.partial_cmp(b).expect("NaN in snapshot values"));
        Snapshot {
            values,
            mean: OnceCell::new(),
            stddev: OnceCell::new(),
        }
    }

    /// The number of values in the snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the snapshot holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The minimum value in the snapshot, or 0 if empty.
    pub fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(0.0)
    }

    /// The maximum value in the snapshot, or 0 if empty.
    pub fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    /// Returns the linearly-interpolated value at quantile `q`.
    ///
    /// `q` must be in `[0, 1]`, else `MetricsError::InvalidQuantile`.
    pub fn get_value(&self, q: f64) -> Result<f64, MetricsError> {
        validate_quantile(q)?;

        let n = self.values.len();
        if n == 0 {
            return Ok(0.0);
        }

        let pos = q * (n + 1) as f64;
        let index = pos as usize;

        let value = if index == 0 {
            self.values[0]
        } else if index >= n {
            self.values[n - 1]
        } else {
            let lower = self.values[index - 1];
            let upper = self.values[index];
            lower + (pos - index as f64) * (upper - lower)
        };

        Ok(value)
    }

    /// The arithmetic mean, or 0 if empty. Memoized on first access.
    pub fn mean(&self) -> f64 {
        *self.mean.get_or_init(|| {
            if self.values.is_empty() {
                0.0
            } else {
                self.values.iter().sum::<f64>() / self.values.len() as f64
            }
        })
    }

    /// The sample standard deviation (divisor `n - 1`), or 0 if `n <= 1`.
    /// Memoized on first access.
    pub fn stddev(&self) -> f64 {
        *self.stddev.get_or_init(|| {
            let n = self.values.len();
            if n <= 1 {
                return 0.0;
            }
            let mean = self.mean();
            let sum_sq: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (n - 1) as f64).sqrt()
        })
    }
}

/// An immutable, value-sorted snapshot of `(value, weight)` pairs, as
/// produced by the exponentially-decaying reservoir.
pub struct WeightedSnapshot {
    values: Vec<f64>,
    norm_weights: Vec<f64>,
    /// Exclusive cumulative-weight prefix: `quantiles[i] = sum(norm_weights[..i])`.
    quantiles: Vec<f64>,
    mean: OnceCell<f64>,
    stddev: OnceCell<f64>,
}

impl WeightedSnapshot {
    /// Builds a weighted snapshot from an iterable of `(value, weight)`
    /// pairs, sorted ascending by `(value, weight)`.
    pub fn new<I>(pairs: I) -> WeightedSnapshot
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut pairs: Vec<(f64, f64)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .expect("NaN in snapshot values")
                .then(a.1.partial_cmp(&b.1).expect("NaN in snapshot weights"))
        });

        let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();

        let mut values = Vec::with_capacity(pairs.len());
        let mut norm_weights = Vec::with_capacity(pairs.len());
        for (v, w) in &pairs {
            values.push(*v);
            norm_weights.push(if total_weight == 0.0 { 0.0 } else { w / total_weight });
        }

        let mut quantiles = Vec::with_capacity(norm_weights.len());
        let mut acc = 0.0;
        for w in &norm_weights {
            quantiles.push(acc);
            acc += w;
        }

        WeightedSnapshot {
            values,
            norm_weights,
            quantiles,
            mean: OnceCell::new(),
            stddev: OnceCell::new(),
        }
    }

    /// The number of values in the snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the snapshot holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The minimum value in the snapshot, or 0 if empty.
    pub fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(0.0)
    }

    /// The maximum value in the snapshot, or 0 if empty.
    pub fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    /// Returns the weighted-percentile value at quantile `q`.
    ///
    /// `q` must be in `[0, 1]`, else `MetricsError::InvalidQuantile`.
    pub fn get_value(&self, q: f64) -> Result<f64, MetricsError> {
        validate_quantile(q)?;

        if self.values.is_empty() {
            return Ok(0.0);
        }

        let p = self
            .quantiles
            .iter()
            .position(|&acc| acc > q)
            .unwrap_or(self.values.len());

        let value = if p <= 1 {
            self.values[0]
        } else {
            self.values[p - 1]
        };

        Ok(value)
    }

    /// The weighted mean, or 0 if empty. Memoized on first access.
    pub fn mean(&self) -> f64 {
        *self.mean.get_or_init(|| {
            if self.values.is_empty() {
                0.0
            } else {
                self.values
                    .iter()
                    .zip(&self.norm_weights)
                    .map(|(v, w)| v * w)
                    .sum()
            }
        })
    }

    /// The weighted standard deviation, or 0 if `n <= 1`. Memoized on first
    /// access.
    pub fn stddev(&self) -> f64 {
        *self.stddev.get_or_init(|| {
            if self.values.len() <= 1 {
                return 0.0;
            }
            let mean = self.mean();
            let variance: f64 = self
                .values
                .iter()
                .zip(&self.norm_weights)
                .map(|(v, w)| w * (v - mean).powi(2))
                .sum();
            variance.sqrt()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn sample() -> Snapshot {
        Snapshot::new([5.0, 1.0, 2.0, 3.0, 4.0])
    }

    #[test]
    fn percentiles() {
        let snap = sample();
        assert_eq!(snap.get_value(0.01).unwrap(), 1.0);
        assert_eq!(snap.get_value(1.0).unwrap(), 5.0);
        assert_approx_eq!(snap.get_value(0.42).unwrap(), 2.52);
        assert_approx_eq!(snap.get_value(0.75).unwrap(), 4.5);
        assert_eq!(snap.get_value(0.95).unwrap(), 5.0);
        assert_eq!(snap.get_value(0.999).unwrap(), 5.0);
    }

    #[test]
    fn mean_and_stddev() {
        let snap = sample();
        assert_eq!(snap.mean(), 3.0);
        assert_approx_eq!(snap.stddev(), 1.5811, 1e-4);
    }

    #[test]
    fn empty_snapshot_has_zero_mean_and_stddev() {
        let snap = Snapshot::new([]);
        assert_eq!(snap.mean(), 0.0);
        assert_eq!(snap.stddev(), 0.0);
    }

    #[test]
    fn singleton_snapshot_has_zero_stddev() {
        let snap = Snapshot::new([1.0]);
        assert_eq!(snap.stddev(), 0.0);
    }

    #[test]
    fn quantile_out_of_range_is_an_error() {
        let snap = sample();
        assert!(matches!(
            snap.get_value(-0.01),
            Err(MetricsError::InvalidQuantile(_))
        ));
        assert!(matches!(
            snap.get_value(1.01),
            Err(MetricsError::InvalidQuantile(_))
        ));
    }

    fn weighted_sample() -> WeightedSnapshot {
        WeightedSnapshot::new([(5.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 2.0), (4.0, 2.0)])
    }

    #[test]
    fn weighted_percentiles() {
        let snap = weighted_sample();
        assert_eq!(snap.get_value(0.01).unwrap(), 1.0);
        assert_eq!(snap.get_value(1.0).unwrap(), 5.0);
        assert_eq!(snap.get_value(0.75).unwrap(), 4.0);
        assert_eq!(snap.get_value(0.95).unwrap(), 5.0);
        assert_eq!(snap.get_value(0.999).unwrap(), 5.0);
    }

    #[test]
    fn weighted_mean_and_stddev() {
        let snap = weighted_sample();
        assert_approx_eq!(snap.mean(), 2.7);
        assert_approx_eq!(snap.stddev(), 1.2689, 1e-4);
    }

    #[test]
    fn weighted_empty_is_zero() {
        let snap = WeightedSnapshot::new([]);
        assert_eq!(snap.mean(), 0.0);
        assert_eq!(snap.stddev(), 0.0);
    }

    #[test]
    fn weighted_singleton_has_zero_stddev() {
        let snap = WeightedSnapshot::new([(1.0, 1.0)]);
        assert_eq!(snap.stddev(), 0.0);
    }
}

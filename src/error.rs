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
//! Typed errors returned synchronously at the point they are detected.
//!
//! The library never logs or retries; every fallible operation returns one of
//! these variants for the caller to handle.

use thiserror::Error;

/// The errors this crate's public API can return.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    /// A dotted metric or registry name was empty or otherwise malformed.
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),

    /// A single `.`-separated segment of a name violated the label grammar
    /// `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid label {label:?} in name {name:?}")]
    InvalidLabel {
        /// The offending segment.
        label: String,
        /// The full name the segment came from.
        name: String,
    },

    /// A name was registered where a metric (or interior subtree) of a
    /// different shape already exists.
    #[error("duplicate metric name: {0:?}")]
    DuplicateName(String),

    /// A quantile argument fell outside `[0, 1]`.
    #[error("invalid quantile {0}: must be in [0, 1]")]
    InvalidQuantile(f64),

    /// An observation was added to an exponentially-decaying reservoir at or
    /// before its current landmark, indicating a clock regression.
    #[error("observation time did not advance past the reservoir's landmark")]
    LandmarkViolation,
}

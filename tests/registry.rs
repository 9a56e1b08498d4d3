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

//! Integration tests over the public registry surface, standing in for the
//! teacher's `first_metric_wins` / `metrics_returns_snapshot` /
//! `tagged_distinct_from_untagged` registry tests, reshaped for a
//! dotted-name tree with no tag dimension.

use caliper::{Metric, MetricRegistry, MetricsError, QueryResult};
use std::time::Duration;

#[test]
fn first_request_wins_across_every_metric_kind() {
    let registry = MetricRegistry::new();

    let a = registry.counter("counter").unwrap();
    let b = registry.counter("counter").unwrap();
    a.inc();
    assert_eq!(b.count(), 1);

    let a = registry.gauge("gauge").unwrap();
    let b = registry.gauge("gauge").unwrap();
    a.set(7.0);
    assert_eq!(b.get_value(), Some(7.0));

    let a = registry.histogram("histogram").unwrap();
    let b = registry.histogram("histogram").unwrap();
    a.update(1.0);
    assert_eq!(b.count(), 1);

    let a = registry.meter("meter").unwrap();
    let b = registry.meter("meter").unwrap();
    a.mark(1);
    assert_eq!(b.count(), 1);

    let a = registry.timer("timer").unwrap();
    let b = registry.timer("timer").unwrap();
    a.update(Duration::from_secs(1));
    assert_eq!(b.count(), 1);
}

#[test]
fn nested_names_build_an_addressable_subtree() {
    let registry = MetricRegistry::new();

    registry.counter("server.http.requests").unwrap();
    registry.counter("server.http.errors").unwrap();
    registry.counter("server.db.queries").unwrap();

    match registry.query("server").unwrap() {
        Some(QueryResult::Subtree(mut labels)) => {
            labels.sort();
            assert_eq!(labels, vec!["db".to_string(), "http".to_string()]);
        }
        _ => panic!("expected an interior subtree at `server`"),
    }

    match registry.query("server.http").unwrap() {
        Some(QueryResult::Subtree(mut labels)) => {
            labels.sort();
            assert_eq!(labels, vec!["errors".to_string(), "requests".to_string()]);
        }
        _ => panic!("expected an interior subtree at `server.http`"),
    }
}

#[test]
fn re_registering_an_existing_name_is_rejected() {
    let registry = MetricRegistry::new();
    registry
        .register("requests", Metric::Counter(Default::default()))
        .unwrap();

    let err = registry
        .register("requests", Metric::Counter(Default::default()))
        .unwrap_err();
    assert!(matches!(err, MetricsError::DuplicateName(_)));
}

#[test]
fn malformed_names_are_rejected_before_touching_the_tree() {
    let registry = MetricRegistry::new();
    let err = registry.counter("not a label").unwrap_err();
    assert!(matches!(err, MetricsError::InvalidLabel { .. }));
}

#[test]
fn unknown_names_query_to_none() {
    let registry = MetricRegistry::new();
    assert!(registry.query("never.registered").unwrap().is_none());
}

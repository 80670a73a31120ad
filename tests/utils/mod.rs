// Shared fixtures for integration tests
//
// Deterministic samples: normal scores (Blom plotting positions) pass
// Shapiro-Wilk, squared exponential quantiles fail it.
#![allow(dead_code)]

use serde_json::{Map, Value};
use statmine::stats::distributions::norm_ppf;
use statmine::{Behavior, Group};
use std::fs;
use std::path::{Path, PathBuf};

/// Expected normal order statistics, shifted and scaled
pub fn normal_scores(n: usize, mean: f64, sd: f64) -> Vec<f64> {
    (1..=n)
        .map(|i| mean + sd * norm_ppf((i as f64 - 0.375) / (n as f64 + 0.25)))
        .collect()
}

/// Strongly right-skewed sample
pub fn skewed(n: usize, offset: f64, scale: f64) -> Vec<f64> {
    (1..=n)
        .map(|i| {
            let e = -(1.0 - (i as f64 - 0.5) / n as f64).ln();
            offset + scale * e * e
        })
        .collect()
}

/// Build a group from (behavior, [(parameter, values)]) in order
pub fn group(name: &str, behaviors: Vec<(String, Vec<(String, Vec<f64>)>)>) -> Group {
    behaviors
        .into_iter()
        .fold(Group::new(name), |group, (behavior, parameters)| {
            let behavior = parameters
                .into_iter()
                .fold(Behavior::new(behavior), |b, (p, values)| {
                    b.with_parameter(p, values)
                });
            group.with_behavior(behavior)
        })
}

/// Write a group as `<dir>/<name>.json` in the input format
pub fn write_group_json(
    dir: &Path,
    name: &str,
    behaviors: &[(&str, Vec<(&str, Vec<f64>)>)],
) -> PathBuf {
    let mut root = Map::new();
    for (behavior, parameters) in behaviors {
        let mut params = Map::new();
        for (parameter, values) in parameters {
            params.insert(
                parameter.to_string(),
                Value::Array(values.iter().map(|v| Value::from(*v)).collect()),
            );
        }
        root.insert(behavior.to_string(), Value::Object(params));
    }

    let path = dir.join(format!("{}.json", name));
    fs::write(&path, serde_json::to_string_pretty(&Value::Object(root)).unwrap()).unwrap();
    path
}

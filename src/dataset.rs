//! Grouped experimental datasets
//!
//! A [`Group`] holds behaviors, a [`Behavior`] holds named parameters, and each
//! parameter holds a [`Sample`] of observations that may contain missing
//! entries. Insertion order is preserved everywhere because it drives the
//! order of sheets and rows in the output.

use crate::error::{AnalysisError, Result};
use anyhow::{bail, Context};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Observations for one parameter, missing entries kept until analysis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    values: Vec<Option<f64>>,
}

impl Sample {
    /// Create a sample from raw entries (`None` = missing)
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    /// Number of entries including missing ones
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing entries (`None` or NaN)
    pub fn missing_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| !matches!(v, Some(x) if !x.is_nan()))
            .count()
    }

    /// Observed values with missing entries dropped, order kept
    pub fn observed(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| v.filter(|x| !x.is_nan()))
            .collect()
    }
}

impl From<Vec<f64>> for Sample {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }
}

/// A named category of measurement holding one sample per parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub name: String,
    parameters: Vec<(String, Sample)>,
}

impl Behavior {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter (builder style)
    pub fn with_parameter(mut self, name: impl Into<String>, sample: impl Into<Sample>) -> Self {
        self.insert(name, sample);
        self
    }

    /// Add or replace a parameter, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, sample: impl Into<Sample>) {
        let name = name.into();
        let sample = sample.into();
        match self.parameters.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = sample,
            None => self.parameters.push((name, sample)),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Sample> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Parameter names in insertion order
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(n, _)| n.as_str())
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Sample)> {
        self.parameters.iter().map(|(n, s)| (n.as_str(), s))
    }
}

/// One experimental condition: an ordered collection of behaviors
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    behaviors: Vec<Behavior>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviors: Vec::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.push_behavior(behavior);
        self
    }

    /// Add or replace a behavior, keeping the original position on replace
    pub fn push_behavior(&mut self, behavior: Behavior) {
        match self.behaviors.iter_mut().find(|b| b.name == behavior.name) {
            Some(slot) => *slot = behavior,
            None => self.behaviors.push(behavior),
        }
    }

    pub fn behavior(&self, name: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.name == name)
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// Look up a sample, reporting which key is missing on failure
    pub fn sample(&self, behavior: &str, parameter: &str) -> Result<&Sample> {
        let found = self
            .behavior(behavior)
            .ok_or_else(|| AnalysisError::SchemaMismatch {
                group: self.name.clone(),
                what: format!("behavior '{}'", behavior),
            })?;

        found
            .parameter(parameter)
            .ok_or_else(|| AnalysisError::SchemaMismatch {
                group: self.name.clone(),
                what: format!("parameter '{}' in behavior '{}'", parameter, behavior),
            })
    }

    /// Parse a group from JSON: `{ behavior: { parameter: [number | null, ...] } }`
    ///
    /// Key order in the document is kept.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self> {
        let name = name.into();
        let root: Value = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidInput(format!("group '{}': {}", name, e)))?;

        let Value::Object(behaviors) = root else {
            return Err(AnalysisError::InvalidInput(format!(
                "group '{}': top level must be an object of behaviors",
                name
            )));
        };

        let mut group = Group::new(name.clone());
        for (behavior_name, parameters) in behaviors {
            let Value::Object(parameters) = parameters else {
                return Err(AnalysisError::InvalidInput(format!(
                    "group '{}': behavior '{}' must be an object of parameters",
                    name, behavior_name
                )));
            };

            let mut behavior = Behavior::new(behavior_name.clone());
            for (parameter_name, values) in parameters {
                let sample = parse_sample(&values).map_err(|reason| {
                    AnalysisError::InvalidInput(format!(
                        "group '{}': {}/{}: {}",
                        name, behavior_name, parameter_name, reason
                    ))
                })?;
                behavior.insert(parameter_name, sample);
            }
            group.push_behavior(behavior);
        }

        Ok(group)
    }

    /// Load a group from a JSON file, named after the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            bail!("Group data file not found: {}", path_ref.display());
        }

        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read group file {}", path_ref.display()))?;

        let name = path_ref
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_ref.display().to_string());

        Group::from_json_str(name, &contents)
            .with_context(|| format!("Invalid group JSON in {}", path_ref.display()))
    }
}

fn parse_sample(value: &Value) -> std::result::Result<Sample, String> {
    let Value::Array(entries) = value else {
        return Err("expected an array of numbers".to_string());
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("number {} is not representable as f64", n)),
            other => Err(format!("unexpected entry {}", other)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Sample::new)
}

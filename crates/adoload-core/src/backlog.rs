//! Strongly-typed model of the backlog document: a strict three-level
//! Feature → User Story → Task tree. Parsed once up front; a document that
//! does not match this shape is a single fatal error rather than a series
//! of partial lookups later in the run.

use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// FieldSource
// ---------------------------------------------------------------------------

/// Lookup seam between a backlog node and the template resolver: resolves a
/// `yaml_key` to a value, covering both the typed fields and any extra keys
/// carried alongside them.
pub trait FieldSource {
    fn field(&self, key: &str) -> Option<serde_yaml::Value>;
}

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Backlog {
    #[serde(default)]
    pub features: Vec<FeatureNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureNode {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(default)]
    pub user_stories: Vec<StoryNode>,
    /// Any additional keys, addressable from templates via `yaml_key`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryNode {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Acceptance_Criteria", default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskNode {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Activity")]
    pub activity: Option<String>,
    #[serde(rename = "Remaining_Work")]
    pub remaining_work: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Backlog {
    /// Load and parse the backlog document. Missing file, unparsable YAML,
    /// or a shape mismatch are all fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LoaderError::BacklogNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let backlog: Backlog = serde_yaml::from_str(&data)?;
        Ok(backlog)
    }
}

impl FieldSource for FeatureNode {
    fn field(&self, key: &str) -> Option<serde_yaml::Value> {
        match key {
            "Title" => Some(serde_yaml::Value::String(self.title.clone())),
            "Description" => Some(serde_yaml::Value::String(self.description.clone())),
            _ => self.extra.get(key).cloned(),
        }
    }
}

impl FieldSource for StoryNode {
    fn field(&self, key: &str) -> Option<serde_yaml::Value> {
        match key {
            "Title" => Some(serde_yaml::Value::String(self.title.clone())),
            "Description" => Some(serde_yaml::Value::String(self.description.clone())),
            "Acceptance_Criteria" => {
                Some(serde_yaml::Value::String(self.acceptance_criteria.clone()))
            }
            _ => self.extra.get(key).cloned(),
        }
    }
}

impl FieldSource for TaskNode {
    fn field(&self, key: &str) -> Option<serde_yaml::Value> {
        match key {
            "Title" => Some(serde_yaml::Value::String(self.title.clone())),
            "Description" => Some(serde_yaml::Value::String(self.description.clone())),
            "Activity" => self
                .activity
                .as_ref()
                .map(|a| serde_yaml::Value::String(a.clone())),
            "Remaining_Work" => self.remaining_work.map(serde_yaml::Value::from),
            _ => self.extra.get(key).cloned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

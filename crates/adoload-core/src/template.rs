//! Template resolver: a declarative per-type schema mapping YAML keys to
//! Azure DevOps field paths, with type coercion and required/default
//! handling. Loaded once before processing starts and read-only afterwards.

use crate::backlog::FieldSource;
use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Schema types
// ---------------------------------------------------------------------------

/// Declared value type of a template field. Anything not in this list is
/// treated as passthrough: the raw YAML value is forwarded unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(from = "String")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Passthrough,
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            _ => Self::Passthrough,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub azure_field_path: Option<String>,
    /// Key to read from the backlog node; defaults to `name`.
    #[serde(default)]
    pub yaml_key: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeTemplate {
    #[serde(default)]
    fields: Vec<FieldRule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Templates {
    #[serde(default)]
    work_item_types: HashMap<String, TypeTemplate>,
}

// ---------------------------------------------------------------------------
// ResolvedFields
// ---------------------------------------------------------------------------

/// Insertion-ordered mapping of Azure field path → JSON value. Inserting an
/// existing path replaces the value in place, keeping the original position:
/// last write wins, in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFields {
    entries: Vec<(String, serde_json::Value)>,
}

impl ResolvedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: serde_json::Value) {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, v)) => *v = value,
            None => self.entries.push((path, value)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&serde_json::Value> {
        self.entries.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` on top of self: same last-write-wins rule as `insert`.
    pub fn extend(&mut self, other: ResolvedFields) {
        for (path, value) in other.entries {
            self.insert(path, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and resolution
// ---------------------------------------------------------------------------

impl Templates {
    /// Load template definitions. A missing file is a warning and yields
    /// empty templates (the run continues with built-in fields only); a
    /// file that is not valid YAML in the expected shape is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "template file not found — using default field mappings only");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let templates: Templates =
            serde_yaml::from_str(&data).map_err(|source| LoaderError::InvalidTemplate {
                path: path.to_path_buf(),
                source,
            })?;
        for (name, template) in &templates.work_item_types {
            info!(
                work_item_type = %name,
                fields = template.fields.len(),
                "loaded work item template"
            );
        }
        Ok(templates)
    }

    /// Resolve the template for `work_item_type` (case-insensitive) against
    /// a backlog node. No matching template yields an empty result — running
    /// without a template file is supported. A rule whose value fails strict
    /// coercion is skipped with a warning; the remaining rules still apply.
    pub fn resolve(&self, work_item_type: &str, source: &dyn FieldSource) -> ResolvedFields {
        let mut resolved = ResolvedFields::new();

        let Some(template) = self
            .work_item_types
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(work_item_type))
            .map(|(_, t)| t)
        else {
            return resolved;
        };

        for rule in &template.fields {
            let (Some(name), Some(path)) = (rule.name.as_deref(), rule.azure_field_path.as_deref())
            else {
                warn!(work_item_type, "skipping template rule without name or azure_field_path");
                continue;
            };
            let yaml_key = rule.yaml_key.as_deref().unwrap_or(name);

            let mut value = source.field(yaml_key);

            if value.is_none() && rule.required {
                if let Some(default) = &rule.default {
                    info!(field = name, default = ?default, "using default value for required field");
                    value = Some(default.clone());
                } else {
                    warn!(field = name, yaml_key, "required field not found in work item data");
                    continue;
                }
            }

            let Some(raw) = value else {
                // Optional and absent: omit the path entirely.
                continue;
            };

            match coerce(&raw, rule.field_type) {
                Some(converted) => {
                    info!(yaml_key, azure_field_path = path, value = %converted, "mapped field");
                    resolved.insert(path, converted);
                }
                None => {
                    warn!(
                        field = name,
                        declared_type = ?rule.field_type,
                        "type conversion failed — skipping field"
                    );
                }
            }
        }

        resolved
    }
}

/// Strict conversion of a YAML value to the declared type. Returns `None`
/// when the value cannot be represented in that type.
fn coerce(value: &serde_yaml::Value, field_type: FieldType) -> Option<serde_json::Value> {
    use serde_yaml::Value as Yaml;

    match field_type {
        FieldType::Integer => match value {
            Yaml::Number(n) => n.as_i64().map(serde_json::Value::from),
            Yaml::String(s) => s.trim().parse::<i64>().ok().map(serde_json::Value::from),
            _ => None,
        },
        FieldType::Float => match value {
            Yaml::Number(n) => n.as_f64().map(serde_json::Value::from),
            Yaml::String(s) => s.trim().parse::<f64>().ok().map(serde_json::Value::from),
            _ => None,
        },
        FieldType::Boolean => match value {
            Yaml::Bool(b) => Some(serde_json::Value::from(*b)),
            Yaml::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(serde_json::Value::from(true)),
                "false" => Some(serde_json::Value::from(false)),
                _ => None,
            },
            _ => None,
        },
        FieldType::String => match value {
            Yaml::String(s) => Some(serde_json::Value::from(s.clone())),
            Yaml::Bool(b) => Some(serde_json::Value::from(b.to_string())),
            Yaml::Number(n) => Some(serde_json::Value::from(n.to_string())),
            _ => None,
        },
        FieldType::Passthrough => serde_json::to_value(value).ok(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

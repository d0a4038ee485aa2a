//! Run configuration, loaded from a `parameters.yaml` document. The raw
//! [`Parameters`] shape mirrors the file; [`Settings`] is the validated,
//! fully-resolved form the rest of the run uses.

use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Placeholder value shipped in the sample parameters file; treated the
/// same as an unset token.
const TOKEN_PLACEHOLDER: &str = "your_pat_token_here";

pub const PAT_ENV: &str = "AZURE_DEVOPS_PAT";
pub const BACKLOG_PATH_ENV: &str = "YAML_FILE_PATH";
pub const TEMPLATE_PATH_ENV: &str = "TEMPLATE_FILE_PATH";

// ---------------------------------------------------------------------------
// Raw parameters document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Parameters {
    #[serde(default)]
    pub azure_devops: AzureDevOpsParams,
    #[serde(default)]
    pub file_paths: FilePathParams,
    #[serde(default)]
    pub environment_variables: EnvParams,
    #[serde(default)]
    pub formatting: FormattingParams,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AzureDevOpsParams {
    pub organization_url: Option<String>,
    pub project: Option<String>,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub personal_access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FilePathParams {
    pub yaml_file_path: Option<PathBuf>,
    pub template_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvParams {
    #[serde(default)]
    pub use_env_for_pat: bool,
    #[serde(default)]
    pub use_env_for_yaml_path: bool,
    #[serde(default)]
    pub use_env_for_template_path: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FormattingParams {
    #[serde(default)]
    pub enable_markdown: bool,
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Settings {
    pub organization_url: String,
    pub project: String,
    pub area_path: String,
    pub iteration_path: String,
    pub token: String,
    pub backlog_path: PathBuf,
    pub template_path: Option<PathBuf>,
    pub enable_markdown: bool,
}

impl Parameters {
    /// Load the raw parameters document. Missing, empty, or unparsable
    /// files are fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LoaderError::ParametersNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Err(LoaderError::ParametersEmpty(path.to_path_buf()));
        }
        let parameters: Parameters = serde_yaml::from_str(&data)?;
        Ok(parameters)
    }

    /// Validate and resolve against process environment variables, with
    /// relative paths anchored at `base_dir` (the parameters file's
    /// directory).
    pub fn resolve(self, base_dir: &Path) -> Result<Settings> {
        self.resolve_with(base_dir, |name| std::env::var(name).ok())
    }

    fn resolve_with(
        self,
        base_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings> {
        let token = resolve_token(
            self.azure_devops.personal_access_token.as_deref(),
            self.environment_variables.use_env_for_pat,
            env(PAT_ENV),
        )?;

        let mut backlog_path = self.file_paths.yaml_file_path;
        if self.environment_variables.use_env_for_yaml_path {
            if let Some(p) = env(BACKLOG_PATH_ENV) {
                info!(path = %p, "using backlog path from {BACKLOG_PATH_ENV}");
                backlog_path = Some(PathBuf::from(p));
            }
        }

        let mut template_path = self.file_paths.template_file_path;
        if self.environment_variables.use_env_for_template_path {
            if let Some(p) = env(TEMPLATE_PATH_ENV) {
                info!(path = %p, "using template path from {TEMPLATE_PATH_ENV}");
                template_path = Some(PathBuf::from(p));
            }
        }

        let mut missing = Vec::new();
        let mut require = |name: &str, value: &Option<String>| {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                missing.push(name.to_string());
            }
        };
        require("organization_url", &self.azure_devops.organization_url);
        require("project", &self.azure_devops.project);
        require("area_path", &self.azure_devops.area_path);
        require("iteration_path", &self.azure_devops.iteration_path);
        if backlog_path.is_none() {
            missing.push("yaml_file_path".to_string());
        }
        if !missing.is_empty() {
            return Err(LoaderError::MissingParameters(missing));
        }

        let backlog_path = anchor(base_dir, backlog_path.unwrap_or_default());
        let template_path = template_path.map(|p| anchor(base_dir, p));

        Ok(Settings {
            organization_url: self
                .azure_devops
                .organization_url
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            project: self.azure_devops.project.unwrap_or_default(),
            area_path: self.azure_devops.area_path.unwrap_or_default(),
            iteration_path: self.azure_devops.iteration_path.unwrap_or_default(),
            token,
            backlog_path,
            template_path,
            enable_markdown: self.formatting.enable_markdown,
        })
    }
}

/// The environment variable wins when `use_env_for_pat` is set or the
/// configured value is empty/the sample placeholder.
fn resolve_token(
    configured: Option<&str>,
    use_env: bool,
    env_value: Option<String>,
) -> Result<String> {
    let configured = configured
        .filter(|t| !t.trim().is_empty() && *t != TOKEN_PLACEHOLDER)
        .map(str::to_string);

    if use_env || configured.is_none() {
        if let Some(token) = env_value.filter(|t| !t.trim().is_empty()) {
            info!("using personal access token from {PAT_ENV}");
            return Ok(token);
        }
    }

    configured.ok_or(LoaderError::MissingToken)
}

fn anchor(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Token rendering for startup logs: everything but the last four
/// characters masked.
pub fn masked_token(token: &str) -> String {
    if token.len() <= 4 {
        return "*".repeat(token.len());
    }
    let visible = &token[token.len() - 4..];
    format!("{}{}", "*".repeat(token.len() - 4), visible)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors — anything here aborts the whole run. Per-node failures
/// (a create call, a link, a single field conversion) are logged and
/// isolated by the loader instead of surfacing through this type.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("parameters file not found: {0}")]
    ParametersNotFound(PathBuf),

    #[error("parameters file is empty: {0}")]
    ParametersEmpty(PathBuf),

    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("personal access token not set: configure azure_devops.personal_access_token or the AZURE_DEVOPS_PAT environment variable")]
    MissingToken,

    #[error("backlog file not found: {0}")]
    BacklogNotFound(PathBuf),

    #[error("invalid template file '{path}': {source}")]
    InvalidTemplate {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("no features found in backlog")]
    NoFeatures,

    #[error("not authorized to access project '{project}' in '{organization_url}': check that the token has Work Items (Read & Write) scope")]
    Unauthorized {
        organization_url: String,
        project: String,
    },

    #[error("Azure DevOps request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

//! Core engine for loading a hierarchical YAML backlog (Feature → User
//! Story → Task) into Azure DevOps: template-driven field mapping, patch
//! document assembly, and best-effort hierarchical creation with
//! parent-child linking.

pub mod backlog;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod loader;
pub mod patch;
pub mod template;

pub use error::{LoaderError, Result};

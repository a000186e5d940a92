//! Infrastructure layer: report jobs, data-source adapters, artifacts, config.

pub mod artifact;
pub mod config;
pub mod jobs;
pub mod sources;

pub use artifact::{Artifact, ArtifactError, ReportMaterializer};
pub use config::{AppConfig, ConfigError, DatabaseConfig};

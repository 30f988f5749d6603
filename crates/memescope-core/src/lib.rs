//! Shared data model and configuration for the memescope pipeline.

pub mod app_config;
pub mod config;
pub mod stages;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, SearchDepth};
pub use config::{load_app_config, load_app_config_from_env};
pub use stages::{load_pipeline_settings, PipelineSettings, StageSettings};
pub use types::{
    CrawlRecord, Dimension, InsightSet, Intent, MemeRecord, Plan, PlanOrigin, RawCollection,
    SearchHit, TimeRange,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stage settings file {path}: {source}")]
    StagesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stage settings file: {0}")]
    StagesFileParse(#[from] serde_yaml::Error),

    #[error("stage settings validation failed: {0}")]
    Validation(String),
}

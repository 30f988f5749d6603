use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Remote-call and extraction problems never surface here; stages absorb
/// them into fallbacks. What remains is the filesystem and artifact encoding.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} is not valid JSON: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("completion client setup failed: {0}")]
    Llm(#[from] memescope_llm::LlmError),

    #[error("source client setup failed: {0}")]
    Source(#[from] memescope_sources::SourceError),
}

//! The five pipeline stages.
//!
//! Each stage is stateless across invocations and receives its collaborators
//! at construction. Stages hand each other artifact paths, never in-memory
//! state, so any stage can be rerun against a previous run's files.

mod analyzer;
mod collector;
mod extractor;
mod planner;
mod writer;

use std::future::Future;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

pub use analyzer::{summarize_memes, Analyzer};
pub use collector::{Collector, CollectorOptions};
pub use extractor::{fallback_memes, Extractor};
pub use planner::{fallback_plan, Planner};
pub use writer::Writer;

/// One step of the pipeline.
pub trait Stage {
    type Input;
    type Output;

    fn name(&self) -> &'static str;

    fn run(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send;
}

/// Reads the upstream artifact at `path`, degrading to `T::default()` when it
/// is absent or unreadable as JSON.
///
/// Only I/O failures other than not-found are returned.
pub(crate) async fn load_upstream<T: DeserializeOwned + Default>(
    store: &ArtifactStore,
    stage: &'static str,
    path: &Path,
) -> Result<T, PipelineError> {
    match store.read_json::<T>(path).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            tracing::error!(stage, path = %path.display(), "upstream artifact missing; continuing with empty input");
            Ok(T::default())
        }
        Err(PipelineError::Decode { source, .. }) => {
            tracing::error!(stage, path = %path.display(), error = %source, "upstream artifact unreadable; continuing with empty input");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// The first `max` characters of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

//! Stage agents, artifact storage and the orchestrator that runs them.

pub mod agents;
pub mod artifacts;
pub mod error;
pub mod orchestrator;

pub use agents::{
    fallback_memes, fallback_plan, summarize_memes, Analyzer, Collector, CollectorOptions,
    Extractor, Planner, Stage, Writer,
};
pub use artifacts::ArtifactStore;
pub use error::PipelineError;
pub use orchestrator::{LiveOrchestrator, Orchestrator, RunSummary};

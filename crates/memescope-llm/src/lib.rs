//! Chat-completion client with a fixed retry budget, plus tolerant JSON
//! extraction for model output that may be wrapped in prose or fences.

pub mod client;
pub mod error;
pub mod extract;
pub mod message;

mod retry;

pub use client::{ClientSettings, Completion, CompletionClient};
pub use error::{ExtractionError, LlmError};
pub use extract::{extract_as, extract_json, Shape};
pub use message::{ChatMessage, GenerationParams, Role};

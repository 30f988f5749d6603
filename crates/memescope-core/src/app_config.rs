use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How much effort the web-search service spends per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Quick,
    Advanced,
}

impl SearchDepth {
    /// Value expected by the search API's `search_depth` field.
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            SearchDepth::Quick => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchDepth::Quick => write!(f, "quick"),
            SearchDepth::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_request_timeout_secs: u64,
    pub llm_max_attempts: u32,
    pub llm_backoff_step_secs: u64,
    pub search_api_key: Option<String>,
    pub search_base_url: String,
    pub search_timeout_secs: u64,
    pub search_max_results: u32,
    pub search_depth: SearchDepth,
    pub search_delay_ms: u64,
    pub browser_enabled: bool,
    pub browser_timeout_secs: u64,
    pub browser_delay_ms: u64,
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub log_level: String,
    pub stages_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_request_timeout_secs", &self.llm_request_timeout_secs)
            .field("llm_max_attempts", &self.llm_max_attempts)
            .field("llm_backoff_step_secs", &self.llm_backoff_step_secs)
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("search_base_url", &self.search_base_url)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("search_max_results", &self.search_max_results)
            .field("search_depth", &self.search_depth)
            .field("search_delay_ms", &self.search_delay_ms)
            .field("browser_enabled", &self.browser_enabled)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("browser_delay_ms", &self.browser_delay_ms)
            .field("user_agent", &self.user_agent)
            .field("data_dir", &self.data_dir)
            .field("reports_dir", &self.reports_dir)
            .field("log_level", &self.log_level)
            .field("stages_path", &self.stages_path)
            .finish()
    }
}

use std::path::PathBuf;

use crate::app_config::{AppConfig, SearchDepth};
use crate::ConfigError;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional. Credentials that are absent or blank become
/// `None`, which disables the matching remote service for the whole run.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let llm_api_key = optional("DEEPSEEK_API_KEY");
    let llm_base_url = or_default("MEMESCOPE_LLM_BASE_URL", "https://api.deepseek.com");
    let llm_request_timeout_secs = parse_u64("MEMESCOPE_LLM_TIMEOUT_SECS", "300")?;
    let llm_max_attempts = parse_u32("MEMESCOPE_LLM_MAX_ATTEMPTS", "3")?;
    if llm_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MEMESCOPE_LLM_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let llm_backoff_step_secs = parse_u64("MEMESCOPE_LLM_BACKOFF_STEP_SECS", "2")?;

    let search_api_key = optional("TAVILY_API_KEY");
    let search_base_url = or_default("MEMESCOPE_SEARCH_BASE_URL", "https://api.tavily.com");
    let search_timeout_secs = parse_u64("MEMESCOPE_SEARCH_TIMEOUT_SECS", "30")?;
    let search_max_results = parse_u32("MEMESCOPE_SEARCH_MAX_RESULTS", "10")?;
    let search_depth = parse_search_depth(&or_default("MEMESCOPE_SEARCH_DEPTH", "advanced"))?;
    let search_delay_ms = parse_u64("MEMESCOPE_SEARCH_DELAY_MS", "1000")?;

    let browser_enabled = parse_bool(
        "MEMESCOPE_BROWSER_ENABLED",
        &or_default("MEMESCOPE_BROWSER_ENABLED", "false"),
    )?;
    let browser_timeout_secs = parse_u64("MEMESCOPE_BROWSER_TIMEOUT_SECS", "60")?;
    let browser_delay_ms = parse_u64("MEMESCOPE_BROWSER_DELAY_MS", "2000")?;
    let user_agent = or_default("MEMESCOPE_USER_AGENT", DEFAULT_USER_AGENT);

    let data_dir = PathBuf::from(or_default("MEMESCOPE_DATA_DIR", "./data"));
    let reports_dir = PathBuf::from(or_default("MEMESCOPE_REPORTS_DIR", "./reports"));
    let log_level = or_default("MEMESCOPE_LOG_LEVEL", "info");
    let stages_path = optional("MEMESCOPE_STAGES_PATH").map(PathBuf::from);

    Ok(AppConfig {
        llm_api_key,
        llm_base_url,
        llm_request_timeout_secs,
        llm_max_attempts,
        llm_backoff_step_secs,
        search_api_key,
        search_base_url,
        search_timeout_secs,
        search_max_results,
        search_depth,
        search_delay_ms,
        browser_enabled,
        browser_timeout_secs,
        browser_delay_ms,
        user_agent,
        data_dir,
        reports_dir,
        log_level,
        stages_path,
    })
}

fn parse_search_depth(s: &str) -> Result<SearchDepth, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "quick" | "basic" => Ok(SearchDepth::Quick),
        "advanced" | "deep" => Ok(SearchDepth::Advanced),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MEMESCOPE_SEARCH_DEPTH".to_string(),
            reason: format!("unknown depth '{other}'; expected quick or advanced"),
        }),
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

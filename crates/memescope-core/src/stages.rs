//! Per-stage generation settings for the completion-backed stages.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_MODEL: &str = "deepseek-chat";

/// Model and sampling parameters for one stage's completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl StageSettings {
    fn with(temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature,
            max_tokens,
        }
    }
}

/// Settings for every stage that talks to the completion service.
///
/// The collector has no entry: it never calls the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub planner: StageSettings,
    pub extractor: StageSettings,
    pub analyzer: StageSettings,
    pub writer: StageSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            planner: StageSettings::with(0.3, 2000),
            extractor: StageSettings::with(0.1, 4000),
            analyzer: StageSettings::with(0.7, 8000),
            writer: StageSettings::with(0.7, 4000),
        }
    }
}

/// Partial stage override as it appears in the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageOverride {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StagesFile {
    planner: Option<StageOverride>,
    extractor: Option<StageOverride>,
    analyzer: Option<StageOverride>,
    writer: Option<StageOverride>,
}

/// Load stage settings, applying the YAML overrides at `path` (if any) on
/// top of [`PipelineSettings::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_pipeline_settings(path: Option<&Path>) -> Result<PipelineSettings, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineSettings::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StagesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_pipeline_settings(&content)
}

fn parse_pipeline_settings(content: &str) -> Result<PipelineSettings, ConfigError> {
    // An empty YAML document deserializes as unit, not as a map.
    let file: StagesFile = if content.trim().is_empty() {
        StagesFile::default()
    } else {
        serde_yaml::from_str(content)?
    };

    let mut settings = PipelineSettings::default();
    apply_override(&mut settings.planner, file.planner);
    apply_override(&mut settings.extractor, file.extractor);
    apply_override(&mut settings.analyzer, file.analyzer);
    apply_override(&mut settings.writer, file.writer);

    validate_stage("planner", &settings.planner)?;
    validate_stage("extractor", &settings.extractor)?;
    validate_stage("analyzer", &settings.analyzer)?;
    validate_stage("writer", &settings.writer)?;

    Ok(settings)
}

fn apply_override(target: &mut StageSettings, source: Option<StageOverride>) {
    let Some(source) = source else {
        return;
    };
    if let Some(model) = source.model {
        target.model = model;
    }
    if let Some(temperature) = source.temperature {
        target.temperature = temperature;
    }
    if let Some(max_tokens) = source.max_tokens {
        target.max_tokens = max_tokens;
    }
}

fn validate_stage(stage: &str, settings: &StageSettings) -> Result<(), ConfigError> {
    if settings.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "stage '{stage}' has an empty model name"
        )));
    }
    if !(0.0..=2.0).contains(&settings.temperature) {
        return Err(ConfigError::Validation(format!(
            "stage '{stage}' has temperature {}; must be within [0, 2]",
            settings.temperature
        )));
    }
    if settings.max_tokens == 0 {
        return Err(ConfigError::Validation(format!(
            "stage '{stage}' has max_tokens 0; must be positive"
        )));
    }
    Ok(())
}

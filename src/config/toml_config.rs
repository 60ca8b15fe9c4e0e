use crate::core::steps::{StepDefinition, StepSchema};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub service: ServiceConfig,
    pub categorization: CategorizationConfig,
    pub matching: MatchingConfig,
    pub voice: VoiceConfig,
    /// Overrides the built-in step flow when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDefinition>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizationConfig {
    pub min_description_chars: usize,
    pub include_attributes: bool,
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            min_description_chars: 15,
            include_attributes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub top_k: usize,
    pub placeholder_requirement: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            placeholder_requirement: "materials".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    pub partial_interval_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            partial_interval_ms: 250,
        }
    }
}

impl IntakeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IntakeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| IntakeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntakeError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn voice_interval(&self) -> Duration {
        Duration::from_millis(self.voice.partial_interval_ms)
    }
}

impl ConfigProvider for IntakeConfig {
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_seconds)
    }

    fn min_description_chars(&self) -> usize {
        self.categorization.min_description_chars
    }

    fn top_k(&self) -> usize {
        self.matching.top_k
    }

    fn placeholder_requirement(&self) -> &str {
        &self.matching.placeholder_requirement
    }

    fn step_schema(&self) -> Result<StepSchema> {
        match &self.steps {
            Some(steps) => StepSchema::new(steps.clone()),
            None => Ok(StepSchema::reference()),
        }
    }
}

impl Validate for IntakeConfig {
    fn validate(&self) -> Result<()> {
        validate_url("service.base_url", &self.service.base_url)?;
        validate_range("service.timeout_seconds", self.service.timeout_seconds, 1, 300)?;
        validate_range(
            "categorization.min_description_chars",
            self.categorization.min_description_chars,
            1,
            500,
        )?;
        validate_range("matching.top_k", self.matching.top_k, 1, 50)?;
        validate_non_empty_string(
            "matching.placeholder_requirement",
            &self.matching.placeholder_requirement,
        )?;
        if self.voice.enabled {
            validate_range("voice.partial_interval_ms", self.voice.partial_interval_ms, 1, 5_000)?;
        }
        self.step_schema().map(|_| ())
    }
}

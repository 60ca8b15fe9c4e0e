use crate::config::toml_config::IntakeConfig;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{validate_language_tag, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "msme-intake")]
#[command(about = "Guided MSME onboarding: categorize products and find matching network partners")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override service.base_url")]
    pub base_url: Option<String>,

    #[arg(long)]
    pub company: Option<String>,

    #[arg(long = "product", help = "Product description (repeatable)")]
    pub products: Vec<String>,

    #[arg(long, help = "What the business needs to source")]
    pub requirement: Option<String>,

    #[arg(long, help = "State or region for vendor matching")]
    pub region: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long, default_value = "en")]
    pub language: String,

    #[arg(long, help = "Requirement document to upload for extraction")]
    pub document: Option<PathBuf>,

    #[arg(long, help = "Transcript to dictate into the product description")]
    pub dictate: Option<String>,

    #[arg(long, help = "Submit the application at the end of the flow")]
    pub submit: bool,

    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(1..=5),
        help = "After submitting, record acceptance of the chosen partner with this rating (1-5)"
    )]
    pub rate_vendor: Option<u8>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    /// File (or built-in defaults) with command-line overrides applied, validated.
    pub fn load_config(&self) -> Result<IntakeConfig> {
        let mut config = match &self.config {
            Some(path) if !path.exists() => {
                return Err(IntakeError::MissingConfigError {
                    field: path.display().to_string(),
                })
            }
            Some(path) => IntakeConfig::from_file(path)?,
            None => IntakeConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.service.base_url = base_url.clone();
        }
        if self.dictate.is_some() {
            config.voice.enabled = true;
        }

        validate_language_tag("--language", &self.language)?;
        config.validate()?;
        Ok(config)
    }
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::IntakeConfig;

pub use adapters::{HttpCollaborators, ScriptedSpeechBackend, UnavailableSpeechBackend};
pub use core::{Applied, IntakeWizard};
pub use domain::ports::{Collaborators, ConfigProvider};
pub use utils::error::{IntakeError, Result};

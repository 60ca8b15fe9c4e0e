use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Unsupported capability: {capability}")]
    UnsupportedCapability { capability: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Voice capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("Categorization unavailable: {reason}")]
    CategorizationUnavailable { reason: String },

    #[error("Vendor matching unavailable: {reason}")]
    MatchingUnavailable { reason: String },

    #[error("Document extraction unavailable: {reason}")]
    ExtractionUnavailable { reason: String },

    #[error("Application submission unavailable: {reason}")]
    SubmissionUnavailable { reason: String },

    #[error("Vendor feedback unavailable: {reason}")]
    FeedbackUnavailable { reason: String },

    #[error("Application status unavailable: {reason}")]
    StatusUnavailable { reason: String },

    #[error("Request skipped: {reason}")]
    ValidationSkipped { reason: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Capability,
    Programming,
    Capture,
    Remote,
    Precondition,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IntakeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IntakeError::UnsupportedCapability { .. } => ErrorCategory::Capability,
            IntakeError::InvalidState { .. } | IntakeError::InvalidInput { .. } => {
                ErrorCategory::Programming
            }
            IntakeError::CaptureFailed { .. } => ErrorCategory::Capture,
            IntakeError::CategorizationUnavailable { .. }
            | IntakeError::MatchingUnavailable { .. }
            | IntakeError::ExtractionUnavailable { .. }
            | IntakeError::SubmissionUnavailable { .. }
            | IntakeError::FeedbackUnavailable { .. }
            | IntakeError::StatusUnavailable { .. }
            | IntakeError::ApiError(_) => ErrorCategory::Remote,
            IntakeError::ValidationSkipped { .. } => ErrorCategory::Precondition,
            IntakeError::ConfigError { .. }
            | IntakeError::MissingConfigError { .. }
            | IntakeError::InvalidConfigValueError { .. }
            | IntakeError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            IntakeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Precondition => ErrorSeverity::Low,
            ErrorCategory::Capture | ErrorCategory::Remote => ErrorSeverity::Medium,
            ErrorCategory::Capability | ErrorCategory::Programming => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Remote and capture failures leave prior state intact, so the user can simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Remote | ErrorCategory::Capture
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IntakeError::UnsupportedCapability { .. } => {
                "Voice input is not available in this environment".to_string()
            }
            IntakeError::InvalidState { message } => format!("Action not allowed right now: {}", message),
            IntakeError::InvalidInput { field, reason } => format!("Please check the {}: {}", field, reason),
            IntakeError::CaptureFailed { .. } => "Voice capture stopped unexpectedly".to_string(),
            IntakeError::CategorizationUnavailable { .. } => {
                "Product categorization is temporarily unavailable".to_string()
            }
            IntakeError::MatchingUnavailable { .. } => {
                "Vendor recommendations are temporarily unavailable".to_string()
            }
            IntakeError::ExtractionUnavailable { .. } => {
                "The document could not be read automatically".to_string()
            }
            IntakeError::SubmissionUnavailable { .. } => {
                "The application could not be submitted".to_string()
            }
            IntakeError::FeedbackUnavailable { .. } => "Your feedback could not be recorded".to_string(),
            IntakeError::StatusUnavailable { .. } => {
                "The application status could not be retrieved".to_string()
            }
            IntakeError::ValidationSkipped { reason } => reason.clone(),
            IntakeError::ApiError(_) => "Could not reach the intake service".to_string(),
            IntakeError::IoError(e) => format!("File access failed: {}", e),
            other => format!("Configuration problem: {}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            IntakeError::UnsupportedCapability { .. } => "Type the answer instead of dictating it",
            IntakeError::InvalidState { .. } => "Stop the current dictation before starting a new one",
            IntakeError::InvalidInput { .. } => "Correct the value and try again",
            IntakeError::CaptureFailed { .. } => "Check microphone permissions and start dictation again",
            IntakeError::CategorizationUnavailable { .. } => "Edit the product description to retry",
            IntakeError::MatchingUnavailable { .. } => "Use search to request recommendations again",
            IntakeError::ExtractionUnavailable { .. } => "Type the requirement manually or upload another file",
            IntakeError::SubmissionUnavailable { .. }
            | IntakeError::FeedbackUnavailable { .. }
            | IntakeError::StatusUnavailable { .. }
            | IntakeError::ApiError(_) => {
                "Check the service URL and network connectivity, then retry"
            }
            IntakeError::ValidationSkipped { .. } => "Add more detail to the description",
            IntakeError::IoError(_) => "Check that the file exists and is readable",
            _ => "Review the configuration file and command-line flags",
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

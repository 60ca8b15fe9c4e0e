use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub native: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo { code: "hi", name: "Hindi", native: "हिन्दी" },
    LanguageInfo { code: "en", name: "English", native: "English" },
    LanguageInfo { code: "bn", name: "Bengali", native: "বাংলা" },
    LanguageInfo { code: "te", name: "Telugu", native: "తెలుగు" },
    LanguageInfo { code: "mr", name: "Marathi", native: "मराठी" },
    LanguageInfo { code: "ta", name: "Tamil", native: "தமிழ்" },
    LanguageInfo { code: "gu", name: "Gujarati", native: "ગુજરાતી" },
    LanguageInfo { code: "ur", name: "Urdu", native: "اردو" },
    LanguageInfo { code: "kn", name: "Kannada", native: "ಕನ್ನಡ" },
    LanguageInfo { code: "ml", name: "Malayalam", native: "മലയാളം" },
    LanguageInfo { code: "or", name: "Odia", native: "ଓଡ଼ିଆ" },
    LanguageInfo { code: "pa", name: "Punjabi", native: "ਪੰਜਾਬੀ" },
    LanguageInfo { code: "as", name: "Assamese", native: "অসমীয়া" },
];

/// Two-letter language code chosen at the language step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_lowercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_LANGUAGES.iter().any(|l| l.code == self.0)
    }

    pub fn info(&self) -> Option<&'static LanguageInfo> {
        SUPPORTED_LANGUAGES.iter().find(|l| l.code == self.0)
    }

    /// BCP-47 tag handed to speech recognizers, e.g. `hi` -> `hi-IN`.
    pub fn speech_tag(&self) -> String {
        if self.0.contains('-') {
            self.0.clone()
        } else {
            format!("{}-IN", self.0)
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writable text fields of the intake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeField {
    CompanyName,
    OwnerName,
    Phone,
    Email,
    /// The most recent entry of the product list.
    ProductDescription,
    StateRegion,
    City,
    RequirementText,
}

impl IntakeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeField::CompanyName => "company_name",
            IntakeField::OwnerName => "owner_name",
            IntakeField::Phone => "phone",
            IntakeField::Email => "email",
            IntakeField::ProductDescription => "product_description",
            IntakeField::StateRegion => "state_region",
            IntakeField::City => "city",
            IntakeField::RequirementText => "requirement_text",
        }
    }
}

impl fmt::Display for IntakeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub company_name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: String,
    pub language: Locale,
    pub products: Vec<String>,
    pub state_region: String,
    pub city: String,
    pub requirement_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationResult {
    /// Taxonomy path, most general first; one to three entries.
    pub levels: Vec<String>,
    pub confidence: f64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorLocation {
    pub region: String,
    pub address: String,
    pub city: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub main_reasons: Vec<String>,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCandidate {
    pub identity: String,
    pub display_name: String,
    pub description: String,
    pub location: VendorLocation,
    pub rating: Option<f64>,
    pub contact_phone: Option<String>,
    pub match_score: Option<f64>,
    pub explanation: MatchExplanation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate: VendorCandidate,
}

impl RankedCandidate {
    pub fn is_top_pick(&self) -> bool {
        self.rank == 1
    }

    /// One-line explanation shown next to the candidate.
    pub fn justification(&self) -> String {
        let rating = match self.candidate.rating {
            Some(r) => format!("rated {:.1}/5", r),
            None => "unrated".to_string(),
        };
        let mut line = format!("#{} {} ({})", self.rank, self.candidate.display_name, rating);
        if !self.candidate.explanation.main_reasons.is_empty() {
            line.push_str(": ");
            line.push_str(&self.candidate.explanation.main_reasons.join("; "));
        }
        line
    }
}

/// Input of a vendor matching call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchQuery {
    pub requirement: String,
    pub region: String,
    pub product_descriptions: Vec<String>,
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPurpose {
    Requirement,
    General,
}

impl DocumentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentPurpose::Requirement => "requirement",
            DocumentPurpose::General => "general",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Filename without directories and without its last extension.
pub fn file_stem(filename: &str) -> String {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    pub requirement: Option<String>,
    pub text: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl ExtractedDocument {
    /// Requirement string, or the raw extracted text when none was recognised.
    pub fn requirement_text(&self) -> Option<&str> {
        [self.requirement.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Boundary result of every collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome<T> {
    Ok(T),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeSnapshot {
    pub record: IntakeRecord,
    pub categories: Vec<String>,
    pub selected_vendor: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub application_id: String,
    pub status: String,
}

/// Whether the applicant took a recommended vendor, fed back to the matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorFeedback {
    pub mse_id: String,
    pub snp_id: String,
    pub accepted: bool,
    /// Satisfaction from 1 to 5.
    pub rating: Option<u8>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReceipt {
    pub feedback_id: String,
    pub message: String,
}

/// Stored application as reported by the status lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationStatus {
    pub application_id: String,
    pub status: String,
    pub selected_vendor: Option<String>,
    pub documents: Vec<String>,
    pub created_at: Option<String>,
}

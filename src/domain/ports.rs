use crate::core::steps::StepSchema;
use crate::domain::events::{SessionId, VoiceSink};
use crate::domain::model::{
    ApplicationStatus, CategorizationResult, Document, DocumentPurpose, ExtractedDocument,
    FeedbackReceipt, IntakeSnapshot, Locale, MatchQuery, RemoteOutcome, SubmissionReceipt,
    VendorCandidate, VendorFeedback,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn request_timeout(&self) -> Duration;
    fn min_description_chars(&self) -> usize;
    fn top_k(&self) -> usize;
    fn placeholder_requirement(&self) -> &str;
    fn step_schema(&self) -> Result<StepSchema>;
}

#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(
        &self,
        description: &str,
        locale: &Locale,
    ) -> RemoteOutcome<CategorizationResult>;
}

#[async_trait]
pub trait VendorMatcher: Send + Sync {
    async fn recommend(&self, query: &MatchQuery) -> RemoteOutcome<Vec<VendorCandidate>>;

    /// Report whether a recommendation was taken up.
    async fn feedback(&self, _feedback: &VendorFeedback) -> RemoteOutcome<FeedbackReceipt> {
        RemoteOutcome::Failed("vendor feedback is not supported by this matcher".to_string())
    }
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        document: &Document,
        purpose: DocumentPurpose,
    ) -> RemoteOutcome<ExtractedDocument>;
}

#[async_trait]
pub trait ApplicationSubmitter: Send + Sync {
    async fn submit(&self, snapshot: &IntakeSnapshot) -> RemoteOutcome<SubmissionReceipt>;

    async fn status(&self, _application_id: &str) -> RemoteOutcome<ApplicationStatus> {
        RemoteOutcome::Failed("status lookup is not supported by this submitter".to_string())
    }
}

/// Continuous speech-to-text source. Knows nothing about form fields.
pub trait SpeechBackend: Send {
    fn is_available(&self) -> bool;

    /// Begin streaming transcript events for `session` into `sink`.
    fn begin(
        &mut self,
        session: SessionId,
        locale: &Locale,
        sink: VoiceSink,
    ) -> std::result::Result<(), String>;

    /// Ask the session to wind down; buffered text must still arrive as a final event.
    fn finish(&mut self, session: SessionId);
}

#[derive(Clone)]
pub struct Collaborators {
    pub categorizer: Arc<dyn Categorizer>,
    pub matcher: Arc<dyn VendorMatcher>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub submitter: Arc<dyn ApplicationSubmitter>,
}

impl Collaborators {
    /// Use one service object for every collaborator role.
    pub fn from_shared<T>(service: Arc<T>) -> Self
    where
        T: Categorizer + VendorMatcher + DocumentExtractor + ApplicationSubmitter + 'static,
    {
        Self {
            categorizer: service.clone(),
            matcher: service.clone(),
            extractor: service.clone(),
            submitter: service,
        }
    }
}

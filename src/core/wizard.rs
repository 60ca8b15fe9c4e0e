//! The intake wizard: one owner for the form, the step flow, dictation and
//! every outstanding collaborator call.
//!
//! All state changes happen on the caller's task through `&mut self`.
//! Collaborator calls run on spawned tasks and come back as [`WizardEvent`]s,
//! which the caller feeds into [`IntakeWizard::apply`] (directly or through
//! [`IntakeWizard::next_event`] / [`IntakeWizard::settle`]).

use crate::core::form_store::{FieldSlot, FieldSource, FormStore};
use crate::core::requesters::{
    CategorizationRequester, DocumentExtractionRequester, ExtractionReport, MatchingRequester,
};
use crate::core::sequencing::RequestLedger;
use crate::core::steps::{StepController, StepDefinition, StepEffect, TransitionOutcome};
use crate::core::voice::{VoiceCaptureAdapter, VoiceUpdate};
use crate::domain::events::{PendingRequest, SessionId, WizardEvent};
use crate::domain::model::{
    ApplicationStatus, CategorizationResult, Document, DocumentPurpose, FeedbackReceipt,
    IntakeField, IntakeSnapshot, Locale, RankedCandidate, RemoteOutcome, SubmissionReceipt,
    VendorFeedback,
};
use crate::domain::ports::{
    ApplicationSubmitter, Collaborators, ConfigProvider, SpeechBackend, VendorMatcher,
};
use crate::utils::error::{IntakeError, Result};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// What applying one event changed.
#[derive(Debug)]
pub enum Applied {
    Categorization,
    Recommendations,
    Extraction(ExtractionReport),
    Voice(VoiceUpdate),
    /// Stale or unknown completion; nothing changed.
    Discarded,
    /// Fresh failure, recorded as a notice.
    Failed,
}

pub struct IntakeWizard {
    form: FormStore,
    steps: StepController,
    voice: VoiceCaptureAdapter,
    ledger: RequestLedger,
    categorizer: CategorizationRequester,
    matcher: MatchingRequester,
    extractor: DocumentExtractionRequester,
    submitter: Arc<dyn ApplicationSubmitter>,
    feedback: Arc<dyn VendorMatcher>,
    timeout: Duration,
    categorization: Option<CategorizationResult>,
    recommendations: Option<Vec<RankedCandidate>>,
    selected_vendor: Option<String>,
    submission: Option<SubmissionReceipt>,
    notices: Vec<IntakeError>,
    events: UnboundedReceiver<WizardEvent>,
    in_flight: usize,
}

impl IntakeWizard {
    pub fn new<C: ConfigProvider + ?Sized>(
        config: &C,
        collaborators: Collaborators,
        speech: Option<Box<dyn SpeechBackend>>,
    ) -> Result<Self> {
        let schema = config.step_schema()?;
        let timeout = config.request_timeout();
        let (tx, rx) = mpsc::unbounded_channel();

        tracing::info!(
            steps = schema.len(),
            timeout_ms = timeout.as_millis() as u64,
            voice = speech.as_ref().map(|s| s.is_available()).unwrap_or(false),
            "intake wizard ready"
        );

        Ok(Self {
            form: FormStore::new(),
            steps: StepController::new(schema),
            voice: VoiceCaptureAdapter::new(speech, tx.clone()),
            ledger: RequestLedger::new(),
            categorizer: CategorizationRequester::new(
                collaborators.categorizer,
                tx.clone(),
                timeout,
                config.min_description_chars(),
            ),
            feedback: collaborators.matcher.clone(),
            matcher: MatchingRequester::new(
                collaborators.matcher,
                tx.clone(),
                timeout,
                config.top_k(),
                config.placeholder_requirement(),
            ),
            extractor: DocumentExtractionRequester::new(collaborators.extractor, tx, timeout),
            submitter: collaborators.submitter,
            timeout,
            categorization: None,
            recommendations: None,
            selected_vendor: None,
            submission: None,
            notices: Vec::new(),
            events: rx,
            in_flight: 0,
        })
    }

    pub fn form(&self) -> &FormStore {
        &self.form
    }

    pub fn current_step(&self) -> usize {
        self.steps.current()
    }

    pub fn current_step_definition(&self) -> &StepDefinition {
        self.steps.current_step()
    }

    pub fn is_terminal(&self) -> bool {
        self.steps.is_terminal()
    }

    pub fn voice(&self) -> &VoiceCaptureAdapter {
        &self.voice
    }

    pub fn categorization(&self) -> Option<&CategorizationResult> {
        self.categorization.as_ref()
    }

    pub fn recommendations(&self) -> Option<&[RankedCandidate]> {
        self.recommendations.as_deref()
    }

    pub fn top_pick(&self) -> Option<&RankedCandidate> {
        self.recommendations
            .as_ref()
            .and_then(|list| list.iter().find(|r| r.is_top_pick()))
    }

    pub fn selected_vendor(&self) -> Option<&str> {
        self.selected_vendor.as_deref()
    }

    /// Collaborator calls whose completion has not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Drain user-facing notices collected since the last call.
    pub fn take_notices(&mut self) -> Vec<IntakeError> {
        std::mem::take(&mut self.notices)
    }

    /// Move forward and run any effect attached to leaving the step.
    pub fn advance(&mut self) -> TransitionOutcome {
        let outcome = self.steps.advance(&self.form);
        for effect in &outcome.effects {
            match effect {
                StepEffect::RequestMatch { from_step } => {
                    // the form is read here, after every write the user has made
                    self.matcher.request(&mut self.ledger, &self.form, *from_step);
                    self.in_flight += 1;
                }
            }
        }
        outcome
    }

    pub fn retreat(&mut self) -> TransitionOutcome {
        self.steps.retreat()
    }

    /// Typed input. Product edits also ask for a fresh categorization.
    pub fn set_field(&mut self, field: IntakeField, value: impl Into<String>) -> bool {
        let changed = self.form.set(field, value, FieldSource::User);
        if changed && field == IntakeField::ProductDescription {
            let slot = self.form.resolve(field);
            self.categorize_product(slot);
        }
        changed
    }

    pub fn set_language(&mut self, locale: Locale) -> bool {
        if !locale.is_supported() {
            tracing::warn!(locale = %locale, "language outside the supported list selected");
        }
        self.form.set_language(locale)
    }

    pub fn add_product(&mut self) {
        self.form.add_product();
    }

    fn categorize_product(&mut self, slot: FieldSlot) -> Option<PendingRequest> {
        let description = self.form.read(slot).to_string();
        let locale = self.form.record().language.clone();
        match self
            .categorizer
            .request(&mut self.ledger, &description, &locale, self.steps.current())
        {
            Ok(request) => {
                self.in_flight += 1;
                Some(request)
            }
            Err(skipped) => {
                tracing::debug!(reason = %skipped, "categorization not requested");
                None
            }
        }
    }

    /// Start dictation into the field the current step binds.
    pub fn start_dictation(&mut self) -> Result<SessionId> {
        let step = self.steps.current_step();
        let field = step.voice_field.ok_or_else(|| IntakeError::InvalidState {
            message: format!("step '{}' has no field to dictate into", step.name),
        })?;
        let target = self.form.resolve(field);
        let locale = self.form.record().language.clone();
        self.voice.start(target, &locale)
    }

    pub fn stop_dictation(&mut self) -> Option<SessionId> {
        self.voice.stop()
    }

    /// Manual search from whatever the form holds right now.
    pub fn search(&mut self) -> PendingRequest {
        let request = self
            .matcher
            .request(&mut self.ledger, &self.form, self.steps.current());
        self.in_flight += 1;
        request
    }

    pub fn clear_recommendations(&mut self) {
        self.recommendations = None;
        self.selected_vendor = None;
    }

    pub fn upload_document(&mut self, document: Document, purpose: DocumentPurpose) -> PendingRequest {
        let request = self
            .extractor
            .request(&mut self.ledger, document, purpose, self.steps.current());
        self.in_flight += 1;
        request
    }

    /// Pick a vendor from the displayed recommendations.
    pub fn select_vendor(&mut self, identity: &str) -> Result<()> {
        let known = self
            .recommendations
            .as_ref()
            .map(|list| list.iter().any(|r| r.candidate.identity == identity))
            .unwrap_or(false);
        if !known {
            return Err(IntakeError::InvalidState {
                message: format!("vendor '{}' is not among the current recommendations", identity),
            });
        }
        self.selected_vendor = Some(identity.to_string());
        Ok(())
    }

    /// Explicit selection, or the top pick when nothing was chosen.
    pub fn chosen_vendor(&self) -> Option<&str> {
        self.selected_vendor
            .as_deref()
            .or_else(|| self.top_pick().map(|r| r.candidate.identity.as_str()))
    }

    pub fn snapshot(&self) -> IntakeSnapshot {
        IntakeSnapshot {
            record: self.form.record().clone(),
            categories: self
                .categorization
                .as_ref()
                .map(|c| c.levels.clone())
                .unwrap_or_default(),
            selected_vendor: self.chosen_vendor().map(str::to_string),
            captured_at: Utc::now(),
        }
    }

    /// Hand the finished record to the submitter. Only allowed on the last step.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt> {
        if !self.steps.is_terminal() {
            return Err(IntakeError::InvalidState {
                message: format!(
                    "cannot submit from step '{}'",
                    self.steps.current_step().name
                ),
            });
        }

        let snapshot = self.snapshot();
        tracing::info!(
            company = %snapshot.record.company_name,
            vendor = snapshot.selected_vendor.as_deref().unwrap_or("none"),
            "submitting application"
        );

        match within(self.timeout, self.submitter.submit(&snapshot)).await {
            RemoteOutcome::Ok(receipt) => {
                tracing::info!(application_id = %receipt.application_id, status = %receipt.status, "application submitted");
                self.submission = Some(receipt.clone());
                Ok(receipt)
            }
            RemoteOutcome::Failed(reason) => {
                tracing::error!(%reason, "application submission failed");
                Err(IntakeError::SubmissionUnavailable { reason })
            }
        }
    }

    /// Receipt of the last successful submission.
    pub fn submission(&self) -> Option<&SubmissionReceipt> {
        self.submission.as_ref()
    }

    /// Tell the matcher whether the chosen vendor was taken up. Needs a
    /// submitted application, whose id identifies the applicant.
    pub async fn send_vendor_feedback(
        &self,
        accepted: bool,
        rating: Option<u8>,
        comments: Option<String>,
    ) -> Result<FeedbackReceipt> {
        if let Some(rating) = rating.filter(|r| !(1..=5).contains(r)) {
            return Err(IntakeError::InvalidInput {
                field: "rating".to_string(),
                reason: format!("{} is outside 1-5", rating),
            });
        }
        let receipt = self.submission.as_ref().ok_or_else(|| IntakeError::InvalidState {
            message: "vendor feedback needs a submitted application".to_string(),
        })?;
        let vendor = self.chosen_vendor().ok_or_else(|| IntakeError::InvalidState {
            message: "no vendor has been recommended or selected".to_string(),
        })?;

        let feedback = VendorFeedback {
            mse_id: receipt.application_id.clone(),
            snp_id: vendor.to_string(),
            accepted,
            rating,
            comments,
        };
        match within(self.timeout, self.feedback.feedback(&feedback)).await {
            RemoteOutcome::Ok(done) => {
                tracing::info!(feedback_id = %done.feedback_id, vendor = %feedback.snp_id, accepted, "vendor feedback recorded");
                Ok(done)
            }
            RemoteOutcome::Failed(reason) => {
                tracing::warn!(%reason, "vendor feedback not recorded");
                Err(IntakeError::FeedbackUnavailable { reason })
            }
        }
    }

    /// Current state of the submitted application.
    pub async fn application_status(&self) -> Result<ApplicationStatus> {
        let receipt = self.submission.as_ref().ok_or_else(|| IntakeError::InvalidState {
            message: "no application has been submitted".to_string(),
        })?;
        match within(self.timeout, self.submitter.status(&receipt.application_id)).await {
            RemoteOutcome::Ok(status) => Ok(status),
            RemoteOutcome::Failed(reason) => {
                tracing::warn!(application_id = %receipt.application_id, %reason, "status lookup failed");
                Err(IntakeError::StatusUnavailable { reason })
            }
        }
    }

    /// Fold one delivered event into the wizard state.
    pub fn apply(&mut self, event: WizardEvent) -> Applied {
        match event {
            WizardEvent::Categorized(done) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match self
                    .categorizer
                    .apply(&mut self.ledger, done, &mut self.categorization)
                {
                    Ok(true) => Applied::Categorization,
                    Ok(false) => Applied::Discarded,
                    Err(err) => self.notice(err),
                }
            }
            WizardEvent::Matched(done) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match self
                    .matcher
                    .apply(&mut self.ledger, done, &mut self.recommendations)
                {
                    Ok(true) => {
                        self.drop_stale_selection();
                        Applied::Recommendations
                    }
                    Ok(false) => Applied::Discarded,
                    Err(err) => self.notice(err),
                }
            }
            WizardEvent::Extracted(done) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let mut report = self.extractor.apply(&mut self.ledger, done, &mut self.form);
                if report.discarded {
                    return Applied::Discarded;
                }
                if let Some(failure) = report.failure.take() {
                    self.notices.push(failure);
                }
                Applied::Extraction(report)
            }
            WizardEvent::Voice(event) => {
                let update = self.voice.handle(event, &mut self.form);
                match &update {
                    VoiceUpdate::Transcribed {
                        slot: slot @ FieldSlot::Product(_),
                        is_final: true,
                        ..
                    } => {
                        let slot = *slot;
                        self.categorize_product(slot);
                    }
                    VoiceUpdate::Failed { reason, .. } => {
                        self.notices.push(IntakeError::CaptureFailed {
                            reason: reason.clone(),
                        });
                    }
                    _ => {}
                }
                Applied::Voice(update)
            }
        }
    }

    fn notice(&mut self, err: IntakeError) -> Applied {
        self.notices.push(err);
        Applied::Failed
    }

    fn drop_stale_selection(&mut self) {
        if let Some(selected) = &self.selected_vendor {
            let still_listed = self
                .recommendations
                .as_ref()
                .map(|list| list.iter().any(|r| &r.candidate.identity == selected))
                .unwrap_or(false);
            if !still_listed {
                tracing::debug!(vendor = %selected, "selected vendor no longer recommended");
                self.selected_vendor = None;
            }
        }
    }

    /// Wait for the next delivered event and apply it.
    pub async fn next_event(&mut self) -> Option<Applied> {
        let event = self.events.recv().await?;
        Some(self.apply(event))
    }

    /// Apply everything already queued without waiting.
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Process events until no call is outstanding and dictation is idle.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 || self.voice.is_busy() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        self.drain_ready();
    }
}

async fn within<T>(timeout: Duration, call: impl Future<Output = RemoteOutcome<T>>) -> RemoteOutcome<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => RemoteOutcome::Failed(format!("timed out after {:?}", timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::steps::StepSchema;
    use crate::domain::model::{
        ExtractedDocument, MatchExplanation, MatchQuery, VendorCandidate, VendorLocation,
    };
    use crate::domain::ports::{Categorizer, DocumentExtractor, VendorMatcher};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct Settings;

    impl ConfigProvider for Settings {
        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
        fn min_description_chars(&self) -> usize {
            15
        }
        fn top_k(&self) -> usize {
            3
        }
        fn placeholder_requirement(&self) -> &str {
            "materials"
        }
        fn step_schema(&self) -> Result<StepSchema> {
            Ok(StepSchema::reference())
        }
    }

    #[derive(Default)]
    struct FakeService {
        queries: Mutex<Vec<MatchQuery>>,
        descriptions: Mutex<Vec<String>>,
        submitted: Mutex<Vec<IntakeSnapshot>>,
    }

    #[async_trait]
    impl Categorizer for FakeService {
        async fn categorize(&self, description: &str, _locale: &Locale) -> RemoteOutcome<CategorizationResult> {
            self.descriptions.lock().unwrap().push(description.to_string());
            RemoteOutcome::Ok(CategorizationResult {
                levels: vec!["Toys".to_string(), "Wooden Toys".to_string()],
                confidence: 0.8,
                attributes: BTreeMap::new(),
            })
        }
    }

    #[async_trait]
    impl VendorMatcher for FakeService {
        async fn recommend(&self, query: &MatchQuery) -> RemoteOutcome<Vec<VendorCandidate>> {
            self.queries.lock().unwrap().push(query.clone());
            RemoteOutcome::Ok(vec![
                vendor("low", 2.0),
                vendor("high", 4.5),
            ])
        }
    }

    #[async_trait]
    impl DocumentExtractor for FakeService {
        async fn extract(&self, _document: &Document, _purpose: DocumentPurpose) -> RemoteOutcome<ExtractedDocument> {
            RemoteOutcome::Failed("HTTP 503".to_string())
        }
    }

    #[async_trait]
    impl ApplicationSubmitter for FakeService {
        async fn submit(&self, snapshot: &IntakeSnapshot) -> RemoteOutcome<SubmissionReceipt> {
            self.submitted.lock().unwrap().push(snapshot.clone());
            RemoteOutcome::Ok(SubmissionReceipt {
                application_id: "APP-1".to_string(),
                status: "received".to_string(),
            })
        }
    }

    fn vendor(id: &str, rating: f64) -> VendorCandidate {
        VendorCandidate {
            identity: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            location: VendorLocation::default(),
            rating: Some(rating),
            contact_phone: None,
            match_score: None,
            explanation: MatchExplanation::default(),
        }
    }

    fn wizard() -> (IntakeWizard, Arc<FakeService>) {
        let service = Arc::new(FakeService::default());
        let wizard = IntakeWizard::new(&Settings, Collaborators::from_shared(service.clone()), None)
            .unwrap();
        (wizard, service)
    }

    #[tokio::test]
    async fn leaving_product_mapping_requests_one_match() {
        let (mut wizard, service) = wizard();
        wizard.advance();
        wizard.advance();
        wizard.set_field(IntakeField::StateRegion, "Gujarat");
        wizard.set_field(IntakeField::RequirementText, "wooden toys for children");

        let outcome = wizard.advance();
        assert_eq!(outcome.to, 3);
        wizard.settle().await;

        let queries = service.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].requirement, "wooden toys for children");
        assert_eq!(queries[0].region, "Gujarat");
        assert_eq!(wizard.top_pick().unwrap().candidate.identity, "high");
    }

    #[tokio::test]
    async fn navigation_without_exit_effect_sends_nothing() {
        let (mut wizard, service) = wizard();
        wizard.advance();
        wizard.retreat();
        wizard.advance();
        wizard.settle().await;
        assert!(service.queries.lock().unwrap().is_empty());
        assert_eq!(wizard.in_flight(), 0);
    }

    #[tokio::test]
    async fn product_edit_triggers_categorization_only_when_long_enough() {
        let (mut wizard, service) = wizard();
        wizard.set_field(IntakeField::ProductDescription, "toys");
        wizard.set_field(IntakeField::ProductDescription, "hand painted wooden toys");
        wizard.settle().await;

        assert_eq!(
            *service.descriptions.lock().unwrap(),
            vec!["hand painted wooden toys".to_string()]
        );
        assert_eq!(wizard.categorization().unwrap().levels[1], "Wooden Toys");
    }

    #[tokio::test]
    async fn dictation_needs_a_bound_field() {
        let (mut wizard, _) = wizard();
        let err = wizard.start_dictation().unwrap_err();
        assert!(matches!(err, IntakeError::InvalidState { .. }));

        wizard.advance();
        let err = wizard.start_dictation().unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedCapability { .. }));
    }

    #[tokio::test]
    async fn failed_extraction_becomes_notice_and_fallback() {
        let (mut wizard, _) = wizard();
        wizard.upload_document(
            Document::new("specs_v2.pdf", "application/pdf", b"%PDF".to_vec()),
            DocumentPurpose::Requirement,
        );
        wizard.settle().await;

        assert_eq!(wizard.form().get(IntakeField::RequirementText), "specs_v2");
        let notices = wizard.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], IntakeError::ExtractionUnavailable { .. }));
        assert!(wizard.take_notices().is_empty());
    }

    #[tokio::test]
    async fn submit_only_from_last_step() {
        let (mut wizard, service) = wizard();
        assert!(matches!(
            wizard.submit().await.unwrap_err(),
            IntakeError::InvalidState { .. }
        ));

        wizard.set_field(IntakeField::CompanyName, "Raj Handicrafts");
        for _ in 0..4 {
            wizard.advance();
        }
        wizard.settle().await;
        assert!(wizard.is_terminal());

        let receipt = wizard.submit().await.unwrap();
        assert_eq!(receipt.application_id, "APP-1");
        let submitted = service.submitted.lock().unwrap();
        assert_eq!(submitted[0].record.company_name, "Raj Handicrafts");
        assert_eq!(submitted[0].selected_vendor.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn vendor_feedback_requires_submission_and_valid_rating() {
        let (mut wizard, _) = wizard();
        let err = wizard.send_vendor_feedback(true, Some(7), None).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidInput { .. }));
        let err = wizard.send_vendor_feedback(true, Some(5), None).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidState { .. }));
        assert!(matches!(
            wizard.application_status().await.unwrap_err(),
            IntakeError::InvalidState { .. }
        ));

        while !wizard.is_terminal() {
            wizard.advance();
        }
        wizard.settle().await;
        wizard.submit().await.unwrap();
        assert_eq!(wizard.submission().map(|r| r.application_id.as_str()), Some("APP-1"));

        // the fake matcher keeps the default, unsupported feedback hook
        let err = wizard.send_vendor_feedback(true, Some(5), None).await.unwrap_err();
        assert!(matches!(err, IntakeError::FeedbackUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn selecting_unknown_vendor_is_rejected() {
        let (mut wizard, _) = wizard();
        wizard.search();
        wizard.settle().await;

        assert!(wizard.select_vendor("nobody").is_err());
        wizard.select_vendor("low").unwrap();
        assert_eq!(wizard.chosen_vendor(), Some("low"));

        wizard.clear_recommendations();
        assert!(wizard.recommendations().is_none());
        assert_eq!(wizard.chosen_vendor(), None);
    }
}

use super::{dispatch, reconcile, Reconciled};
use crate::core::form_store::{FieldSource, FormStore};
use crate::core::sequencing::RequestLedger;
use crate::domain::events::{ExtractionCompletion, PendingRequest, Purpose, WizardEvent};
use crate::domain::model::{file_stem, Document, DocumentPurpose, IntakeField};
use crate::domain::ports::DocumentExtractor;
use crate::utils::error::IntakeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Extracted key that may fill a still-empty form field.
const GENERAL_FIELD_MAP: &[(&str, IntakeField)] = &[
    ("legal_name", IntakeField::CompanyName),
    ("owner_name", IntakeField::OwnerName),
    ("phone", IntakeField::Phone),
    ("email", IntakeField::Email),
    ("state", IntakeField::StateRegion),
    ("city", IntakeField::City),
];

#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub discarded: bool,
    pub updated: Vec<IntakeField>,
    pub failure: Option<IntakeError>,
}

pub struct DocumentExtractionRequester {
    extractor: Arc<dyn DocumentExtractor>,
    events: UnboundedSender<WizardEvent>,
    timeout: Duration,
}

impl DocumentExtractionRequester {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        events: UnboundedSender<WizardEvent>,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            events,
            timeout,
        }
    }

    pub fn request(
        &self,
        ledger: &mut RequestLedger,
        document: Document,
        purpose: DocumentPurpose,
        step: usize,
    ) -> PendingRequest {
        let request = ledger.issue(Purpose::Extract, step);
        tracing::info!(
            seq = request.sequence,
            filename = %document.filename,
            purpose = purpose.as_str(),
            bytes = document.bytes.len(),
            "uploading document for extraction"
        );

        let extractor = self.extractor.clone();
        let filename = document.filename.clone();
        dispatch(
            &self.events,
            self.timeout,
            request,
            async move { extractor.extract(&document, purpose).await },
            move |completion| {
                WizardEvent::Extracted(ExtractionCompletion {
                    completion,
                    filename,
                    purpose,
                })
            },
        );
        request
    }

    /// Write extraction results into the form.
    ///
    /// A requirement upload that yields no usable text falls back to the file's
    /// stem, so `specs_v2.pdf` becomes the requirement `specs_v2`.
    pub fn apply(
        &self,
        ledger: &mut RequestLedger,
        done: ExtractionCompletion,
        form: &mut FormStore,
    ) -> ExtractionReport {
        let ExtractionCompletion {
            completion,
            filename,
            purpose,
        } = done;
        let seq = completion.request.sequence;
        let fallback = file_stem(&filename);
        let mut report = ExtractionReport::default();

        match (reconcile(ledger, completion), purpose) {
            (Reconciled::Discarded, _) => {
                report.discarded = true;
            }
            (Reconciled::Fresh(extracted), DocumentPurpose::Requirement) => {
                match extracted.requirement_text() {
                    Some(text) => {
                        form.set(IntakeField::RequirementText, text, FieldSource::Document);
                    }
                    None => {
                        tracing::info!(seq, %filename, "no requirement text extracted, using filename");
                        form.set(IntakeField::RequirementText, fallback, FieldSource::DocumentFallback);
                    }
                }
                report.updated.push(IntakeField::RequirementText);
            }
            (Reconciled::Fresh(extracted), DocumentPurpose::General) => {
                for (key, field) in GENERAL_FIELD_MAP {
                    if let Some(value) = extracted.fields.get(*key) {
                        if form.fill_if_empty(*field, value, FieldSource::Document) {
                            report.updated.push(*field);
                        }
                    }
                }
                tracing::info!(seq, %filename, filled = report.updated.len(), "document fields applied");
            }
            (Reconciled::FreshFailure(reason), DocumentPurpose::Requirement) => {
                tracing::warn!(seq, %filename, %reason, "extraction failed, using filename as requirement");
                form.set(IntakeField::RequirementText, fallback, FieldSource::DocumentFallback);
                report.updated.push(IntakeField::RequirementText);
                report.failure = Some(IntakeError::ExtractionUnavailable { reason });
            }
            (Reconciled::FreshFailure(reason), DocumentPurpose::General) => {
                tracing::warn!(seq, %filename, %reason, "extraction failed");
                report.failure = Some(IntakeError::ExtractionUnavailable { reason });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::Completion;
    use crate::domain::model::{ExtractedDocument, RemoteOutcome};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tokio::sync::mpsc;

    struct NoopExtractor;

    #[async_trait]
    impl DocumentExtractor for NoopExtractor {
        async fn extract(
            &self,
            _document: &Document,
            _purpose: DocumentPurpose,
        ) -> RemoteOutcome<ExtractedDocument> {
            RemoteOutcome::Failed("not used".to_string())
        }
    }

    fn requester() -> DocumentExtractionRequester {
        let (tx, _rx) = mpsc::unbounded_channel();
        DocumentExtractionRequester::new(Arc::new(NoopExtractor), tx, Duration::from_secs(5))
    }

    fn done(
        ledger: &mut RequestLedger,
        filename: &str,
        purpose: DocumentPurpose,
        outcome: RemoteOutcome<ExtractedDocument>,
    ) -> ExtractionCompletion {
        ExtractionCompletion {
            completion: Completion {
                request: ledger.issue(Purpose::Extract, 3),
                outcome,
            },
            filename: filename.to_string(),
            purpose,
        }
    }

    #[test]
    fn requirement_failure_falls_back_to_filename_stem() {
        let mut ledger = RequestLedger::new();
        let mut form = FormStore::new();
        let completion = done(
            &mut ledger,
            "specs_v2.pdf",
            DocumentPurpose::Requirement,
            RemoteOutcome::Failed("HTTP 500".to_string()),
        );

        let report = requester().apply(&mut ledger, completion, &mut form);
        assert!(matches!(report.failure, Some(IntakeError::ExtractionUnavailable { .. })));
        assert_eq!(form.get(IntakeField::RequirementText), "specs_v2");
        assert_eq!(form.requirement_source(), Some(FieldSource::DocumentFallback));
    }

    #[test]
    fn requirement_success_uses_extracted_text() {
        let mut ledger = RequestLedger::new();
        let mut form = FormStore::new();
        let extracted = ExtractedDocument {
            requirement: Some("500 kg of teak planks".to_string()),
            ..Default::default()
        };
        let completion = done(&mut ledger, "order.pdf", DocumentPurpose::Requirement, RemoteOutcome::Ok(extracted));

        let report = requester().apply(&mut ledger, completion, &mut form);
        assert!(report.failure.is_none());
        assert_eq!(form.get(IntakeField::RequirementText), "500 kg of teak planks");
        assert_eq!(form.requirement_source(), Some(FieldSource::Document));
    }

    #[test]
    fn empty_extraction_still_uses_fallback() {
        let mut ledger = RequestLedger::new();
        let mut form = FormStore::new();
        let completion = done(
            &mut ledger,
            "tender-2024.docx",
            DocumentPurpose::Requirement,
            RemoteOutcome::Ok(ExtractedDocument::default()),
        );

        let report = requester().apply(&mut ledger, completion, &mut form);
        assert!(report.failure.is_none());
        assert_eq!(form.get(IntakeField::RequirementText), "tender-2024");
    }

    #[test]
    fn general_document_fills_only_blank_fields() {
        let mut ledger = RequestLedger::new();
        let mut form = FormStore::new();
        form.set(IntakeField::City, "Surat", FieldSource::User);

        let mut fields = BTreeMap::new();
        fields.insert("legal_name".to_string(), "Raj Handicrafts".to_string());
        fields.insert("city".to_string(), "Ahmedabad".to_string());
        fields.insert("gst_number".to_string(), "29ABCDE1234F1Z5".to_string());
        let extracted = ExtractedDocument {
            fields,
            ..Default::default()
        };
        let completion = done(&mut ledger, "gst.pdf", DocumentPurpose::General, RemoteOutcome::Ok(extracted));

        let report = requester().apply(&mut ledger, completion, &mut form);
        assert_eq!(report.updated, vec![IntakeField::CompanyName]);
        assert_eq!(form.get(IntakeField::CompanyName), "Raj Handicrafts");
        assert_eq!(form.get(IntakeField::City), "Surat");
        assert_eq!(form.get(IntakeField::RequirementText), "");
    }

    #[test]
    fn stale_extraction_is_discarded() {
        let mut ledger = RequestLedger::new();
        let mut form = FormStore::new();
        let older = done(&mut ledger, "old.pdf", DocumentPurpose::Requirement, RemoteOutcome::Failed("x".into()));
        let newer = done(
            &mut ledger,
            "new.pdf",
            DocumentPurpose::Requirement,
            RemoteOutcome::Ok(ExtractedDocument {
                requirement: Some("fresh".to_string()),
                ..Default::default()
            }),
        );

        requester().apply(&mut ledger, newer, &mut form);
        let report = requester().apply(&mut ledger, older, &mut form);
        assert!(report.discarded);
        assert_eq!(form.get(IntakeField::RequirementText), "fresh");
    }
}

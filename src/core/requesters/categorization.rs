use super::{dispatch, reconcile, Reconciled};
use crate::core::sequencing::RequestLedger;
use crate::domain::events::{Completion, PendingRequest, Purpose, WizardEvent};
use crate::domain::model::{CategorizationResult, Locale};
use crate::domain::ports::Categorizer;
use crate::utils::error::{IntakeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_MIN_DESCRIPTION_CHARS: usize = 15;

pub struct CategorizationRequester {
    categorizer: Arc<dyn Categorizer>,
    events: UnboundedSender<WizardEvent>,
    timeout: Duration,
    min_chars: usize,
}

impl CategorizationRequester {
    pub fn new(
        categorizer: Arc<dyn Categorizer>,
        events: UnboundedSender<WizardEvent>,
        timeout: Duration,
        min_chars: usize,
    ) -> Self {
        Self {
            categorizer,
            events,
            timeout,
            min_chars,
        }
    }

    /// Descriptions must be strictly longer than the threshold to be sent.
    pub fn qualifies(&self, description: &str) -> bool {
        description.trim().chars().count() > self.min_chars
    }

    /// Issue a categorization call, or report `ValidationSkipped` for short input.
    pub fn request(
        &self,
        ledger: &mut RequestLedger,
        description: &str,
        locale: &Locale,
        step: usize,
    ) -> Result<PendingRequest> {
        if !self.qualifies(description) {
            return Err(IntakeError::ValidationSkipped {
                reason: format!(
                    "product description needs more than {} characters before it can be categorized",
                    self.min_chars
                ),
            });
        }

        let request = ledger.issue(Purpose::Categorize, step);
        let categorizer = self.categorizer.clone();
        let description = description.trim().to_string();
        let locale = locale.clone();
        dispatch(
            &self.events,
            self.timeout,
            request,
            async move { categorizer.categorize(&description, &locale).await },
            WizardEvent::Categorized,
        );
        Ok(request)
    }

    /// Replace `current` wholesale with a fresh result. Failures keep it as is.
    pub fn apply(
        &self,
        ledger: &mut RequestLedger,
        completion: Completion<CategorizationResult>,
        current: &mut Option<CategorizationResult>,
    ) -> Result<bool> {
        let seq = completion.request.sequence;
        match reconcile(ledger, completion) {
            Reconciled::Fresh(result) => {
                tracing::info!(
                    seq,
                    levels = %result.levels.join(" > "),
                    confidence = result.confidence,
                    "categorization applied"
                );
                *current = Some(result);
                Ok(true)
            }
            Reconciled::FreshFailure(reason) => {
                tracing::warn!(seq, %reason, "categorization failed, keeping previous result");
                Err(IntakeError::CategorizationUnavailable { reason })
            }
            Reconciled::Discarded => Ok(false),
        }
    }
}

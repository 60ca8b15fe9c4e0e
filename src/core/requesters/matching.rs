use super::{dispatch, reconcile, Reconciled};
use crate::core::form_store::FormStore;
use crate::core::ranker::RecommendationRanker;
use crate::core::sequencing::RequestLedger;
use crate::domain::events::{Completion, PendingRequest, Purpose, WizardEvent};
use crate::domain::model::{MatchQuery, RankedCandidate, VendorCandidate};
use crate::domain::ports::VendorMatcher;
use crate::utils::error::{IntakeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_PLACEHOLDER_REQUIREMENT: &str = "materials";
pub const DEFAULT_TOP_K: usize = 3;

pub struct MatchingRequester {
    matcher: Arc<dyn VendorMatcher>,
    events: UnboundedSender<WizardEvent>,
    timeout: Duration,
    top_k: usize,
    placeholder: String,
    ranker: RecommendationRanker,
}

impl MatchingRequester {
    pub fn new(
        matcher: Arc<dyn VendorMatcher>,
        events: UnboundedSender<WizardEvent>,
        timeout: Duration,
        top_k: usize,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            matcher,
            events,
            timeout,
            top_k,
            placeholder: placeholder.into(),
            ranker: RecommendationRanker::new(),
        }
    }

    /// Requirement text, then the latest product, then the placeholder.
    pub fn build_query(&self, form: &FormStore) -> MatchQuery {
        let record = form.record();
        let requirement = Some(record.requirement_text.trim())
            .filter(|r| !r.is_empty())
            .or_else(|| form.latest_product())
            .unwrap_or(self.placeholder.as_str())
            .to_string();

        MatchQuery {
            requirement,
            region: record.state_region.trim().to_string(),
            product_descriptions: form.product_descriptions(),
            top_k: self.top_k,
        }
    }

    /// Read the form now and send one matching request.
    pub fn request(&self, ledger: &mut RequestLedger, form: &FormStore, step: usize) -> PendingRequest {
        let query = self.build_query(form);
        let request = ledger.issue(Purpose::Match, step);
        tracing::info!(
            seq = request.sequence,
            requirement = %query.requirement,
            region = %query.region,
            "requesting vendor recommendations"
        );

        let matcher = self.matcher.clone();
        dispatch(
            &self.events,
            self.timeout,
            request,
            async move { matcher.recommend(&query).await },
            WizardEvent::Matched,
        );
        request
    }

    /// Rank fresh candidates into `displayed`. A failure leaves the old list on screen.
    pub fn apply(
        &self,
        ledger: &mut RequestLedger,
        completion: Completion<Vec<VendorCandidate>>,
        displayed: &mut Option<Vec<RankedCandidate>>,
    ) -> Result<bool> {
        let seq = completion.request.sequence;
        match reconcile(ledger, completion) {
            Reconciled::Fresh(candidates) => {
                let ranked = self.ranker.rank(candidates);
                tracing::info!(seq, candidates = ranked.len(), "vendor recommendations applied");
                *displayed = Some(ranked);
                Ok(true)
            }
            Reconciled::FreshFailure(reason) => {
                tracing::warn!(seq, %reason, "vendor matching failed, keeping displayed list");
                Err(IntakeError::MatchingUnavailable { reason })
            }
            Reconciled::Discarded => Ok(false),
        }
    }
}

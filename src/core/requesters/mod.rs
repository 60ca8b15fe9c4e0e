//! Async wrappers around the remote collaborators.
//!
//! Each requester issues a sequenced [`PendingRequest`], runs the call on a
//! spawned task bounded by a timeout, and posts the [`Completion`] back onto
//! the wizard's event channel. Applying a completion goes through the
//! [`RequestLedger`] so that only the latest issued response for a purpose
//! ever lands.

pub mod categorization;
pub mod extraction;
pub mod matching;

use crate::core::sequencing::{ApplyDecision, RequestLedger};
use crate::domain::events::{Completion, PendingRequest, WizardEvent};
use crate::domain::model::RemoteOutcome;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub use categorization::CategorizationRequester;
pub use extraction::{DocumentExtractionRequester, ExtractionReport};
pub use matching::MatchingRequester;

/// Result of checking a completion against the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled<T> {
    Fresh(T),
    FreshFailure(String),
    Discarded,
}

pub(crate) fn reconcile<T>(ledger: &mut RequestLedger, completion: Completion<T>) -> Reconciled<T> {
    match ledger.settle(&completion.request) {
        ApplyDecision::Apply => match completion.outcome {
            RemoteOutcome::Ok(payload) => Reconciled::Fresh(payload),
            RemoteOutcome::Failed(reason) => Reconciled::FreshFailure(reason),
        },
        ApplyDecision::Stale { .. } | ApplyDecision::Unknown => Reconciled::Discarded,
    }
}

/// Run `call` on the runtime and deliver its outcome as an event.
pub(crate) fn dispatch<T, F, W>(
    events: &UnboundedSender<WizardEvent>,
    timeout: Duration,
    request: PendingRequest,
    call: F,
    wrap: W,
) where
    T: Send + 'static,
    F: Future<Output = RemoteOutcome<T>> + Send + 'static,
    W: FnOnce(Completion<T>) -> WizardEvent + Send + 'static,
{
    let tx = events.clone();
    tokio::spawn(async move {
        // the call runs in its own task so a panicking collaborator still
        // produces a completion
        let mut call = tokio::spawn(call);
        let outcome = match tokio::time::timeout(timeout, &mut call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                tracing::error!(
                    purpose = %request.purpose,
                    seq = request.sequence,
                    "❌ collaborator task failed: {}",
                    join_err
                );
                RemoteOutcome::Failed(format!("collaborator task failed: {}", join_err))
            }
            Err(_) => {
                call.abort();
                tracing::warn!(
                    purpose = %request.purpose,
                    seq = request.sequence,
                    "collaborator call timed out after {:?}",
                    timeout
                );
                RemoteOutcome::Failed(format!("timed out after {:?}", timeout))
            }
        };
        if tx.send(wrap(Completion { request, outcome })).is_err() {
            tracing::debug!(
                purpose = %request.purpose,
                seq = request.sequence,
                "wizard gone, completion dropped"
            );
        }
    });
}

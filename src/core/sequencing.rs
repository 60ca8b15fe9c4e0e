use crate::domain::events::{PendingRequest, Purpose};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyDecision {
    Apply,
    /// An equal or newer request of the same purpose already settled.
    Stale { settled: u64 },
    /// Sequence number was never issued by this ledger.
    Unknown,
}

#[derive(Debug, Default)]
struct Lane {
    last_issued: u64,
    settled: u64,
    pending: BTreeMap<u64, PendingRequest>,
}

/// Per-purpose sequence numbers. Only the latest issued response may land.
#[derive(Debug, Default)]
pub struct RequestLedger {
    lanes: BTreeMap<Purpose, Lane>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, purpose: Purpose, issued_at_step: usize) -> PendingRequest {
        let lane = self.lanes.entry(purpose).or_default();
        lane.last_issued += 1;
        let request = PendingRequest {
            purpose,
            sequence: lane.last_issued,
            issued_at_step,
        };
        lane.pending.insert(request.sequence, request);
        tracing::debug!(%purpose, seq = request.sequence, step = issued_at_step, "request issued");
        request
    }

    /// Decide whether a response may be applied. Settling a number retires every
    /// older pending request of the same purpose.
    pub fn settle(&mut self, request: &PendingRequest) -> ApplyDecision {
        let lane = self.lanes.entry(request.purpose).or_default();
        if request.sequence == 0 || request.sequence > lane.last_issued {
            return ApplyDecision::Unknown;
        }
        if request.sequence <= lane.settled {
            tracing::debug!(
                purpose = %request.purpose,
                seq = request.sequence,
                settled = lane.settled,
                "stale response discarded"
            );
            return ApplyDecision::Stale {
                settled: lane.settled,
            };
        }
        lane.settled = request.sequence;
        lane.pending.retain(|seq, _| *seq > request.sequence);
        ApplyDecision::Apply
    }

    pub fn settled(&self, purpose: Purpose) -> u64 {
        self.lanes.get(&purpose).map(|l| l.settled).unwrap_or(0)
    }

    pub fn pending(&self, purpose: Purpose) -> Vec<PendingRequest> {
        self.lanes
            .get(&purpose)
            .map(|l| l.pending.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_pending(&self) -> bool {
        self.lanes.values().any(|l| !l.pending.is_empty())
    }
}

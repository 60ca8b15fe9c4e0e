use crate::domain::model::{RankedCandidate, VendorCandidate};
use std::cmp::Ordering;

/// Orders vendor candidates by rating, highest first.
///
/// Missing ratings sort as 0 but stay `None` in the output. Equal ratings keep
/// their input order, and ranks are positional (1..=n, no shared ranks).
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationRanker;

impl RecommendationRanker {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(&self, candidates: Vec<VendorCandidate>) -> Vec<RankedCandidate> {
        let mut ordered = candidates;
        // slice::sort_by is stable
        ordered.sort_by(|a, b| sort_key(b).partial_cmp(&sort_key(a)).unwrap_or(Ordering::Equal));

        ordered
            .into_iter()
            .enumerate()
            .map(|(idx, candidate)| RankedCandidate {
                rank: idx + 1,
                candidate,
            })
            .collect()
    }
}

fn sort_key(candidate: &VendorCandidate) -> f64 {
    match candidate.rating {
        Some(r) if r.is_finite() => r,
        _ => 0.0,
    }
}

//! Majority aggregation of normalized provider ratings

use crate::models::{NormalizedRating, ProviderResult, Verdict};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Provisional outcome of the provider vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Provisional {
    pub verdict: Verdict,
    /// Winning bucket behind `verdict`
    pub winner: NormalizedRating,
    /// Size of the winning bucket
    pub count: usize,
    /// Number of sources voted on
    pub total: usize,
    pub confidence: f32,
    pub needs_fallback: bool,
}

impl Provisional {
    /// Outcome for zero sources
    pub fn empty() -> Self {
        Self {
            verdict: Verdict::Unknown,
            winner: NormalizedRating::Unknown,
            count: 0,
            total: 0,
            confidence: 0.0,
            needs_fallback: true,
        }
    }
}

/// Bucket sizes in precedence order (false/misleading, true, unknown)
pub fn tally(sources: &[ProviderResult]) -> IndexMap<NormalizedRating, usize> {
    let mut votes: IndexMap<NormalizedRating, usize> = NormalizedRating::PRECEDENCE
        .iter()
        .map(|rating| (*rating, 0))
        .collect();
    for source in sources {
        *votes.entry(source.bucket()).or_insert(0) += 1;
    }
    votes
}

/// Combine normalized ratings into a provisional verdict.
///
/// The largest bucket wins; equal buckets resolve false/misleading, then
/// true, then unknown. Confidence is the plain winning fraction and every
/// source counts once regardless of its similarity score. Fallback is
/// requested when the winner is unknown or lacks a strict majority, so an
/// even split at exactly 0.5 still asks for a second opinion.
pub fn aggregate(sources: &[ProviderResult]) -> Provisional {
    let total = sources.len();
    if total == 0 {
        return Provisional::empty();
    }

    let votes = tally(sources);

    // PRECEDENCE order plus strict `>` keeps the earlier bucket on ties
    let (winner, count) = votes
        .iter()
        .fold((NormalizedRating::FalseOrMisleading, 0usize), |best, (rating, count)| {
            if *count > best.1 {
                (*rating, *count)
            } else {
                best
            }
        });

    let confidence = count as f32 / total as f32;
    let strict_majority = count * 2 > total;
    let needs_fallback = winner == NormalizedRating::Unknown || !strict_majority;

    Provisional {
        verdict: Verdict::from(winner),
        winner,
        count,
        total,
        confidence,
        needs_fallback,
    }
}

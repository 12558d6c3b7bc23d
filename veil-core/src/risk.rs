//! Signal-to-score aggregation
//!
//! Folds a vendor's signals into a 0-100 risk score plus up to three
//! human-readable reasons. Each signal is weighted by category and recency,
//! dampened individually, then summed and clamped.

use serde::{Deserialize, Serialize};

use crate::{now_epoch_secs, Signal, MAX_REASONS, MAX_RISK_SCORE};

/// Result of aggregating a signal set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk score (0 - 100)
    pub score: u8,
    /// Reasons in signal input order, at most three
    pub reasons: Vec<String>,
}

/// Aggregate signals against the current wall clock
pub fn aggregate(signals: &[Signal]) -> RiskAssessment {
    aggregate_at(signals, now_epoch_secs())
}

/// Aggregate signals against an explicit instant (seconds since epoch).
///
/// Pure: the same signals in the same order and the same `now` always give
/// the same assessment. Reasons keep the first three signals in input order,
/// not the three most severe.
pub fn aggregate_at(signals: &[Signal], now: f64) -> RiskAssessment {
    let total: u32 = signals.iter().map(|s| s.contribution(now)).sum();
    let score = total.min(u32::from(MAX_RISK_SCORE)) as u8;

    let reasons = signals
        .iter()
        .take(MAX_REASONS)
        .map(Signal::reason)
        .collect();

    RiskAssessment { score, reasons }
}

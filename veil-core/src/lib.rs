//! Veil Core - Signal types and vendor risk model
//!
//! This crate provides the foundational primitives:
//! - Security signals observed about a vendor (leaks, CVEs, cert churn, ...)
//! - Vendors whose risk score is derived from their signals
//! - The signal-to-score aggregation engine
//! - An in-memory vendor registry

pub mod signals;
pub mod risk;
pub mod vendor;
pub mod registry;

pub use signals::*;
pub use risk::*;
pub use vendor::*;
pub use registry::*;

/// Upper bound of a signal's severity score
pub const MAX_SEVERITY: u8 = 100;

/// Upper bound of an aggregated risk score
pub const MAX_RISK_SCORE: u8 = 100;

/// Maximum number of reasons attached to a risk score
pub const MAX_REASONS: usize = 3;

/// Signals younger than this (seconds) get the recency boost
pub const RECENCY_WINDOW_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Industry tag for vendors that do not declare one
pub const DEFAULT_INDUSTRY: &str = "unknown";

/// Current wall clock as fractional seconds since the Unix epoch
pub fn now_epoch_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

//! Security signals observed about a vendor
//!
//! A signal is a single security-relevant observation:
//! - A category tag (github, cve, cert, dns, breach, ...)
//! - A severity between 0 and 100
//! - Free-form evidence in `metadata`
//! - The time it was detected
//!
//! Signals are immutable once built and are only read by the aggregator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{MAX_SEVERITY, RECENCY_WINDOW_SECS};

/// Errors from building or decoding a signal
#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("severity {0} is outside 0..=100")]
    SeverityOutOfRange(i64),

    #[error("signal type must not be empty")]
    EmptyType,
}

/// Weight applied to a signal category.
///
/// Credential and breach signals outrank CVE/cert events, which outrank
/// everything else.
pub fn type_weight(signal_type: &str) -> f64 {
    match signal_type {
        "github" | "breach" => 1.5,
        "cve" | "cert" => 1.2,
        _ => 1.0,
    }
}

/// A security signal about a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalRecord")]
pub struct Signal {
    /// Category tag
    pub signal_type: String,

    /// Severity (0 - 100)
    pub severity_score: u8,

    /// Free-form evidence, `detail` is used for reasons
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Detection time in seconds since the Unix epoch
    pub detected_at: f64,
}

/// Unvalidated wire shape of a signal
#[derive(Debug, Deserialize)]
struct SignalRecord {
    signal_type: String,
    severity_score: i64,
    #[serde(default)]
    metadata: Map<String, Value>,
    detected_at: f64,
}

impl TryFrom<SignalRecord> for Signal {
    type Error = SignalError;

    fn try_from(record: SignalRecord) -> Result<Self, Self::Error> {
        let mut builder = Signal::builder(&record.signal_type)
            .severity(record.severity_score)
            .detected_at(record.detected_at);
        builder.metadata = record.metadata;
        builder.build()
    }
}

impl Signal {
    /// Create a new signal builder
    pub fn builder(signal_type: &str) -> SignalBuilder {
        SignalBuilder::new(signal_type)
    }

    /// Evidence text from `metadata.detail`, empty when absent.
    ///
    /// Scalars render the way the scoring service always printed them:
    /// `null` as `None` and booleans as `True`/`False`.
    pub fn detail(&self) -> String {
        match self.metadata.get("detail") {
            None => String::new(),
            Some(Value::Null) => "None".to_string(),
            Some(Value::Bool(true)) => "True".to_string(),
            Some(Value::Bool(false)) => "False".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Category weight of this signal
    pub fn weight(&self) -> f64 {
        type_weight(&self.signal_type)
    }

    /// 1.2 for signals detected within the recency window, 1.0 otherwise
    pub fn recency_multiplier(&self, now: f64) -> f64 {
        if now - self.detected_at < RECENCY_WINDOW_SECS {
            1.2
        } else {
            1.0
        }
    }

    /// Points this signal adds to a risk score.
    ///
    /// Capped at 100 before the division by 4, so one signal contributes at
    /// most 25.
    pub fn contribution(&self, now: f64) -> u32 {
        let weighted = f64::from(self.severity_score) * self.weight() * self.recency_multiplier(now);
        weighted.min(100.0).floor() as u32 / 4
    }

    /// Human-readable reason line, e.g. `[github] API key exposure (sev 70)`
    pub fn reason(&self) -> String {
        format!(
            "[{}] {} (sev {})",
            self.signal_type,
            self.detail(),
            self.severity_score
        )
    }
}

/// Builder for signals
pub struct SignalBuilder {
    signal_type: String,
    severity: i64,
    metadata: Map<String, Value>,
    detected_at: f64,
}

impl SignalBuilder {
    pub fn new(signal_type: &str) -> Self {
        Self {
            signal_type: signal_type.to_string(),
            severity: 0,
            metadata: Map::new(),
            detected_at: crate::now_epoch_secs(),
        }
    }

    pub fn severity(mut self, severity: i64) -> Self {
        self.severity = severity;
        self
    }

    pub fn detail(self, detail: &str) -> Self {
        self.metadata("detail", Value::String(detail.to_string()))
    }

    pub fn metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn detected_at(mut self, detected_at: f64) -> Self {
        self.detected_at = detected_at;
        self
    }

    pub fn build(self) -> Result<Signal, SignalError> {
        if self.signal_type.is_empty() {
            return Err(SignalError::EmptyType);
        }
        if !(0..=i64::from(MAX_SEVERITY)).contains(&self.severity) {
            return Err(SignalError::SeverityOutOfRange(self.severity));
        }

        Ok(Signal {
            signal_type: self.signal_type,
            severity_score: self.severity as u8,
            metadata: self.metadata,
            detected_at: self.detected_at,
        })
    }
}

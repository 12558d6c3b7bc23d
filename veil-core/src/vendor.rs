//! Vendors and their derived risk
//!
//! A vendor owns its signals. `risk_score` and `reasons` are never set by
//! hand: every change to the signal set re-runs the aggregator, so a vendor
//! handed out by this crate is always consistent with its signals.

use serde::{Deserialize, Serialize};

use crate::{aggregate_at, now_epoch_secs, RiskAssessment, Signal, DEFAULT_INDUSTRY};

/// A third-party vendor under assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VendorRecord")]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub industry_tag: String,
    risk_score: u8,
    reasons: Vec<String>,
    signals: Vec<Signal>,
}

/// Input shape of a vendor; derived fields are not accepted
#[derive(Debug, Clone, Deserialize)]
pub struct VendorRecord {
    pub id: String,
    pub name: String,
    pub domain: String,
    #[serde(default = "default_industry")]
    pub industry_tag: String,
    #[serde(default)]
    pub signals: Vec<Signal>,
}

fn default_industry() -> String {
    DEFAULT_INDUSTRY.to_string()
}

impl From<VendorRecord> for Vendor {
    fn from(record: VendorRecord) -> Self {
        Vendor::new(&record.id, &record.name, &record.domain)
            .with_industry(&record.industry_tag)
            .with_signals(record.signals)
    }
}

impl Vendor {
    /// Create a vendor with no signals (score 0, no reasons)
    pub fn new(id: &str, name: &str, domain: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            domain: domain.to_string(),
            industry_tag: default_industry(),
            risk_score: 0,
            reasons: Vec::new(),
            signals: Vec::new(),
        }
    }

    pub fn with_industry(mut self, industry_tag: &str) -> Self {
        self.industry_tag = industry_tag.to_string();
        self
    }

    pub fn with_signals(mut self, signals: Vec<Signal>) -> Self {
        self.set_signals(signals);
        self
    }

    /// Replace the signal set and rescore
    pub fn set_signals(&mut self, signals: Vec<Signal>) {
        self.signals = signals;
        self.rescore_at(now_epoch_secs());
    }

    /// Append a signal and rescore
    pub fn push_signal(&mut self, signal: Signal) {
        self.signals.push(signal);
        self.rescore_at(now_epoch_secs());
    }

    /// Recompute score and reasons against an explicit instant
    pub fn rescore_at(&mut self, now: f64) -> RiskAssessment {
        let assessment = aggregate_at(&self.signals, now);
        self.risk_score = assessment.score;
        self.reasons = assessment.reasons.clone();
        assessment
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Snapshot of the current score and reasons
    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment {
            score: self.risk_score,
            reasons: self.reasons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(signal_type: &str, severity: i64, detail: &str) -> Signal {
        Signal::builder(signal_type)
            .severity(severity)
            .detail(detail)
            .detected_at(now_epoch_secs() - 3600.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_vendor_is_unscored() {
        let vendor = Vendor::new("v1", "Acme Corp", "acme.example");
        assert_eq!(vendor.industry_tag, "unknown");
        assert_eq!(vendor.risk_score(), 0);
        assert!(vendor.reasons().is_empty());
        assert!(vendor.signals().is_empty());
    }

    #[test]
    fn test_signals_drive_score() {
        let mut vendor = Vendor::new("v1", "Acme Corp", "acme.example")
            .with_industry("saas")
            .with_signals(vec![recent("github", 70, "API key exposure")]);
        assert_eq!(vendor.risk_score(), 25);
        assert_eq!(vendor.reasons(), ["[github] API key exposure (sev 70)"]);

        vendor.push_signal(recent("cert", 40, "cert churn"));
        assert_eq!(vendor.risk_score(), 39);
        assert_eq!(vendor.reasons().len(), 2);

        vendor.set_signals(Vec::new());
        assert_eq!(vendor.assessment(), RiskAssessment::default());
    }

    #[test]
    fn test_rescore_against_later_instant() {
        let mut vendor = Vendor::new("v2", "Globex", "globex.example")
            .with_signals(vec![recent("cve", 65, "OpenSSL CVE")]);
        assert_eq!(vendor.risk_score(), 23);

        // Thirty days on, the recency boost is gone: 65 * 1.2 = 78 -> 19
        let later = now_epoch_secs() + 30.0 * 86_400.0;
        let assessment = vendor.rescore_at(later);
        assert_eq!(assessment.score, 19);
        assert_eq!(vendor.risk_score(), 19);
    }

    #[test]
    fn test_deserialize_ignores_derived_fields() {
        let json = r#"{
            "id": "v3",
            "name": "Initech",
            "domain": "initech.example",
            "risk_score": 99,
            "reasons": ["forged"],
            "signals": [
                {"signal_type": "dns", "severity_score": 30,
                 "metadata": {"detail": "subdomain churn"}, "detected_at": 0}
            ]
        }"#;
        let vendor: Vendor = serde_json::from_str(json).unwrap();
        assert_eq!(vendor.industry_tag, "unknown");
        assert_eq!(vendor.risk_score(), 7);
        assert_eq!(vendor.reasons(), ["[dns] subdomain churn (sev 30)"]);
    }

    #[test]
    fn test_serialize_exposes_derived_fields() {
        let vendor = Vendor::new("v1", "Acme Corp", "acme.example")
            .with_signals(vec![recent("breach", 50, "credential dump")]);
        let value = serde_json::to_value(&vendor).unwrap();
        assert_eq!(value["risk_score"], 22);
        assert_eq!(value["reasons"][0], "[breach] credential dump (sev 50)");
        assert_eq!(value["signals"].as_array().unwrap().len(), 1);
    }
}

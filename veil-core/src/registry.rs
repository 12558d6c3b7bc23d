//! Vendor Registry - in-memory collection of scored vendors
//!
//! Built once at startup from vendor records and shared read-only
//! afterwards. Vendors are looked up by id and listed in insertion order.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::{Vendor, VendorRecord};

/// Errors from loading vendor records
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read vendor file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid vendor data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate vendor id: {0}")]
    DuplicateId(String),
}

/// The in-memory vendor collection
#[derive(Debug, Clone, Default)]
pub struct VendorRegistry {
    vendors: Vec<Vendor>,
    /// Position of each id in `vendors`
    index: HashMap<String, usize>,
}

impl VendorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from records, scoring each vendor
    pub fn from_records(records: Vec<VendorRecord>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for record in records {
            registry.insert(Vendor::from(record))?;
        }
        Ok(registry)
    }

    /// Parse a JSON array of vendor records
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let records: Vec<VendorRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Load a JSON array of vendor records from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_json_str(&content)?;
        info!(
            "Loaded {} vendors from {}",
            registry.len(),
            path.as_ref().display()
        );
        Ok(registry)
    }

    /// Add a vendor; ids must be unique
    pub fn insert(&mut self, vendor: Vendor) -> Result<(), RegistryError> {
        if self.index.contains_key(&vendor.id) {
            return Err(RegistryError::DuplicateId(vendor.id));
        }
        debug!(vendor = %vendor.id, score = vendor.risk_score(), "Registered vendor");
        self.index.insert(vendor.id.clone(), self.vendors.len());
        self.vendors.push(vendor);
        Ok(())
    }

    /// Get a vendor by id
    pub fn get(&self, id: &str) -> Option<&Vendor> {
        self.index.get(id).and_then(|&i| self.vendors.get(i))
    }

    /// All vendors in the order they were added
    pub fn list(&self) -> Vec<&Vendor> {
        self.vendors.iter().collect()
    }

    /// Recompute every vendor's score against an explicit instant
    pub fn rescore_at(&mut self, now: f64) {
        for vendor in &mut self.vendors {
            vendor.rescore_at(now);
        }
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let signal_count = self.vendors.iter().map(|v| v.signals().len()).sum();
        let total_risk: u32 = self
            .vendors
            .iter()
            .map(|v| u32::from(v.risk_score()))
            .sum();
        let avg_risk = if self.vendors.is_empty() {
            0.0
        } else {
            f64::from(total_risk) / self.vendors.len() as f64
        };
        let riskiest = self
            .vendors
            .iter()
            .max_by_key(|v| v.risk_score())
            .map(|v| v.id.clone());

        RegistryStats {
            vendor_count: self.vendors.len(),
            signal_count,
            avg_risk,
            riskiest,
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegistryStats {
    pub vendor_count: usize,
    pub signal_count: usize,
    pub avg_risk: f64,
    pub riskiest: Option<String>,
}

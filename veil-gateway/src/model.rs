//! Model tiers, selection policy and cost estimation

use serde::{Deserialize, Serialize};

/// Short questions up to this many characters may use the cheap tier
pub const CHEAP_QUERY_MAX_CHARS: usize = 80;

/// Cost/quality class of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Cheap,
    Full,
}

/// Pick a tier for a query.
///
/// Short interrogative queries (at most 80 characters and containing `?`)
/// are assumed simple and go to the cheap tier; everything else goes full.
pub fn select_tier(query: &str) -> ModelTier {
    if query.chars().count() <= CHEAP_QUERY_MAX_CHARS && query.contains('?') {
        ModelTier::Cheap
    } else {
        ModelTier::Full
    }
}

/// Estimated USD price per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Pricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of `total_tokens`, priced at the mean of input and output rates
    /// and rounded to six decimals. Input and output tokens are not
    /// separated, so this is an approximation.
    pub fn estimate_cost(&self, total_tokens: u32) -> f64 {
        let blended = (self.input_per_million + self.output_per_million) / 2.0;
        let cost = f64::from(total_tokens) * blended / 1_000_000.0;
        (cost * 1_000_000.0).round() / 1_000_000.0
    }
}

/// A model identifier and its price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub pricing: Pricing,
}

impl ModelSpec {
    pub fn new(id: &str, pricing: Pricing) -> Self {
        Self {
            id: id.to_string(),
            pricing,
        }
    }
}

/// The two models the gateway chooses between
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub cheap: ModelSpec,
    pub full: ModelSpec,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            cheap: ModelSpec::new("gpt-4o-mini", Pricing::new(0.15, 0.60)),
            full: ModelSpec::new("gpt-4o", Pricing::new(2.50, 10.00)),
        }
    }
}

impl ModelCatalog {
    /// Catalog with custom model ids and the default prices
    pub fn with_ids(cheap: &str, full: &str) -> Self {
        let defaults = Self::default();
        Self {
            cheap: ModelSpec::new(cheap, defaults.cheap.pricing),
            full: ModelSpec::new(full, defaults.full.pricing),
        }
    }

    pub fn spec(&self, tier: ModelTier) -> &ModelSpec {
        match tier {
            ModelTier::Cheap => &self.cheap,
            ModelTier::Full => &self.full,
        }
    }

    /// Model id to request for a query
    pub fn select(&self, query: &str) -> &ModelSpec {
        self.spec(select_tier(query))
    }

    /// Tier of a model id reported by the provider.
    ///
    /// Providers often answer with a dated variant (`gpt-4o-mini-2024-07-18`),
    /// so ids are matched by prefix. The cheap id is checked first because
    /// the full id is commonly a prefix of it.
    pub fn tier_of(&self, model_id: &str) -> Option<ModelTier> {
        if model_id.starts_with(&self.cheap.id) {
            Some(ModelTier::Cheap)
        } else if model_id.starts_with(&self.full.id) {
            Some(ModelTier::Full)
        } else {
            None
        }
    }

    /// Cost of a completion, priced by the model that actually answered
    /// and falling back to the requested tier for unknown ids
    pub fn estimate_cost(&self, model_used: &str, requested: ModelTier, total_tokens: u32) -> f64 {
        let tier = self.tier_of(model_used).unwrap_or(requested);
        self.spec(tier).pricing.estimate_cost(total_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_question_is_cheap() {
        assert_eq!(select_tier("is this bad?"), ModelTier::Cheap);
        let eighty = format!("{}?", "a".repeat(79));
        assert_eq!(select_tier(&eighty), ModelTier::Cheap);
    }

    #[test]
    fn test_long_or_declarative_is_full() {
        let statement = "b".repeat(100);
        assert_eq!(select_tier(&statement), ModelTier::Full);
        let long_question = format!("{}?", "a".repeat(80));
        assert_eq!(select_tier(&long_question), ModelTier::Full);
        assert_eq!(select_tier("summarize acme"), ModelTier::Full);
    }

    #[test]
    fn test_tier_counts_characters_not_bytes() {
        // 40 two-byte characters plus '?' is 81 bytes but 41 characters
        let query = format!("{}?", "é".repeat(40));
        assert_eq!(select_tier(&query), ModelTier::Cheap);
    }

    #[test]
    fn test_cost_estimate() {
        let catalog = ModelCatalog::default();
        // 1000 * 0.375 / 1e6
        assert_eq!(catalog.cheap.pricing.estimate_cost(1000), 0.000375);
        // 1000 * 6.25 / 1e6
        assert_eq!(catalog.full.pricing.estimate_cost(1000), 0.00625);
        assert_eq!(catalog.full.pricing.estimate_cost(0), 0.0);
        // 7 * 0.375 / 1e6 = 2.625e-6, rounded to 6 decimals
        assert_eq!(catalog.cheap.pricing.estimate_cost(7), 0.000003);
    }

    #[test]
    fn test_cost_uses_answering_model() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.tier_of("gpt-4o-mini-2024-07-18"), Some(ModelTier::Cheap));
        assert_eq!(catalog.tier_of("gpt-4o-2024-08-06"), Some(ModelTier::Full));
        assert_eq!(catalog.tier_of("llama3"), None);

        let cost = catalog.estimate_cost("gpt-4o-mini-2024-07-18", ModelTier::Full, 1000);
        assert_eq!(cost, 0.000375);
        let fallback = catalog.estimate_cost("llama3", ModelTier::Full, 1000);
        assert_eq!(fallback, 0.00625);
    }

    #[test]
    fn test_custom_ids() {
        let catalog = ModelCatalog::with_ids("small", "large");
        assert_eq!(catalog.select("ok?").id, "small");
        assert_eq!(catalog.select("write a report").id, "large");
        assert_eq!(catalog.full.pricing, Pricing::new(2.50, 10.00));
    }
}

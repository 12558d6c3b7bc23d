//! Query Gateway
//!
//! Answers analyst queries through a TTL cache in front of the language
//! model:
//! 1. Fingerprint the query and look it up in the cache store
//! 2. On a miss, validate, pick a model tier and call the backend
//! 3. Estimate the cost, store the answer and return it
//!
//! Cache trouble never fails a query; it only costs an upstream call.
//! Concurrent misses for the same query may each reach the backend, and the
//! last write to the store wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    fingerprint, select_tier, CacheEntry, CompletionRequest, GatewayError, ModelCatalog, Persona,
    SharedBackend, SharedCacheStore, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    MAX_QUERY_CHARS,
};

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Lifetime of a cached answer
    pub cache_ttl: Duration,
    /// Cheap and full models with their prices
    pub models: ModelCatalog,
    /// Output token bound per completion
    pub max_output_tokens: u32,
    /// Bound on one backend call
    pub upstream_timeout: Duration,
    /// Bound on one cache store round trip
    pub cache_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            models: ModelCatalog::default(),
            max_output_tokens: DEFAULT_MAX_TOKENS,
            upstream_timeout: Duration::from_secs(60),
            cache_timeout: Duration::from_secs(2),
        }
    }
}

/// An answer to an analyst query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub model_used: String,
    pub tokens_used: u32,
    pub was_cached: bool,
}

/// Gateway counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub upstream_calls: u64,
    pub upstream_failures: u64,
    /// Estimated spend of all upstream calls so far
    pub spend_usd: f64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    upstream_calls: AtomicU64,
    upstream_failures: AtomicU64,
    spend_micro_usd: AtomicU64,
}

/// Reject empty queries and queries over [`MAX_QUERY_CHARS`] characters
pub fn validate_query(query: &str) -> Result<(), GatewayError> {
    let chars = query.chars().count();
    if chars == 0 {
        return Err(GatewayError::InvalidInput("Message is empty".to_string()));
    }
    if chars > MAX_QUERY_CHARS {
        return Err(GatewayError::InvalidInput(format!(
            "Message too long ({} characters, limit {})",
            chars, MAX_QUERY_CHARS
        )));
    }
    Ok(())
}

/// The cached LLM gateway
pub struct QueryGateway {
    backend: SharedBackend,
    cache: SharedCacheStore,
    persona: Persona,
    config: GatewayConfig,
    counters: Counters,
}

impl QueryGateway {
    pub fn new(
        backend: SharedBackend,
        cache: SharedCacheStore,
        persona: Persona,
        config: GatewayConfig,
    ) -> Self {
        info!(
            backend = backend.name(),
            cache = cache.name(),
            persona = %persona.persona.id,
            "Query gateway ready"
        );
        Self {
            backend,
            cache,
            persona,
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Answer a query, from cache when possible
    pub async fn answer(&self, query: &str) -> Result<Answer, GatewayError> {
        let key = fingerprint(query);

        if let Some(entry) = self.lookup(&key).await {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, model = %entry.model, "Cache hit");
            return Ok(Answer {
                text: entry.content,
                model_used: entry.model,
                tokens_used: entry.tokens,
                was_cached: true,
            });
        }
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);

        validate_query(query)?;

        let tier = select_tier(query);
        let model = &self.config.models.spec(tier).id;
        debug!(key = %key, ?tier, model = %model, "Cache miss, calling upstream");

        let request = CompletionRequest {
            system: self.persona.system_prompt().to_string(),
            user: query.to_string(),
            model: model.clone(),
            max_tokens: self.config.max_output_tokens,
            temperature: DEFAULT_TEMPERATURE,
        };

        self.counters.upstream_calls.fetch_add(1, Ordering::Relaxed);
        let completion = match timeout(self.config.upstream_timeout, self.backend.complete(&request)).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(e)) => {
                self.counters.upstream_failures.fetch_add(1, Ordering::Relaxed);
                warn!(model = %request.model, "Upstream call failed: {}", e);
                return Err(GatewayError::UpstreamFailure(e.to_string()));
            }
            Err(_) => {
                self.counters.upstream_failures.fetch_add(1, Ordering::Relaxed);
                warn!(model = %request.model, "Upstream call timed out");
                return Err(GatewayError::UpstreamFailure(format!(
                    "Upstream call timed out after {:?}",
                    self.config.upstream_timeout
                )));
            }
        };

        let cost_usd = self
            .config
            .models
            .estimate_cost(&completion.model, tier, completion.total_tokens);
        self.counters
            .spend_micro_usd
            .fetch_add((cost_usd * 1_000_000.0).round() as u64, Ordering::Relaxed);

        info!(
            model = %completion.model,
            tokens = completion.total_tokens,
            cost_usd,
            "Upstream answer"
        );

        let entry = CacheEntry {
            content: completion.content,
            model: completion.model,
            tokens: completion.total_tokens,
            cost_usd,
        };
        self.store(&key, &entry).await;

        Ok(Answer {
            text: entry.content,
            model_used: entry.model,
            tokens_used: entry.tokens,
            was_cached: false,
        })
    }

    /// Snapshot of the gateway counters
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            upstream_calls: self.counters.upstream_calls.load(Ordering::Relaxed),
            upstream_failures: self.counters.upstream_failures.load(Ordering::Relaxed),
            spend_usd: self.counters.spend_micro_usd.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let raw = match timeout(self.config.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                warn!(cache = self.cache.name(), "Cache read failed, treating as miss: {}", e);
                return None;
            }
            Err(_) => {
                warn!(cache = self.cache.name(), "Cache read timed out, treating as miss");
                return None;
            }
        };

        match CacheEntry::from_json(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %key, "Ignoring undecodable cache entry: {}", e);
                None
            }
        }
    }

    async fn store(&self, key: &str, entry: &CacheEntry) {
        let value = match entry.to_json() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode cache entry: {}", e);
                return;
            }
        };

        match timeout(
            self.config.cache_timeout,
            self.cache.set_with_ttl(key, value, self.config.cache_ttl),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(cache = self.cache.name(), "Cache write failed: {}", e),
            Err(_) => warn!(cache = self.cache.name(), "Cache write timed out"),
        }
    }
}

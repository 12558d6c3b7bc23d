//! Veil Gateway
//!
//! Cost-controlled proxy between analysts and a language model:
//! - **Fingerprint**: stable cache key for a query
//! - **Cache**: TTL cache stores (in-memory, optional Redis)
//! - **Model**: cheap/full tier selection and cost estimation
//! - **Backend**: language model client abstraction (OpenAI-compatible)
//! - **Persona**: analyst system prompt, loaded from TOML
//! - **Gateway**: the lookup -> call -> store pipeline

pub mod backend;
pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod model;
pub mod persona;
#[cfg(feature = "cache-redis")]
pub mod redis_store;

pub use backend::*;
pub use cache::*;
pub use error::*;
pub use fingerprint::*;
pub use gateway::*;
pub use model::*;
pub use persona::*;
#[cfg(feature = "cache-redis")]
pub use redis_store::*;

/// Longest query (in characters) the gateway forwards upstream
pub const MAX_QUERY_CHARS: usize = 4000;

/// Default cache entry lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default output token bound for a completion
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Sampling temperature of every completion; not configurable
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

//! Veil CLI
//!
//! Security-analyst assistant gateway: cached LLM answers and vendor risk
//! scoring.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use veil_core::{aggregate, Signal, VendorRegistry};
use veil_gateway::{
    create_backend, GatewayConfig, MemoryCacheStore, ModelCatalog, OpenAIBackendConfig, Persona,
    QueryGateway, SharedCacheStore,
};
use veil_server::{AppState, ServerConfig};

#[derive(Parser)]
#[command(name = "veil")]
#[command(author, version, about = "Veil: security-analyst assistant gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

/// Language model and cache settings shared by `serve` and `ask`
#[derive(Args)]
struct GatewayArgs {
    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible base URL (OpenRouter, local servers, ...)
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Model for short questions
    #[arg(long, env = "OPENAI_MODEL_MINI", default_value = "gpt-4o-mini")]
    cheap_model: String,

    /// Model for everything else
    #[arg(long, env = "OPENAI_MODEL_FULL", default_value = "gpt-4o")]
    full_model: String,

    /// Output token bound per answer
    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value = "500")]
    max_tokens: u32,

    /// Cache entry lifetime in seconds
    #[arg(long, env = "GPT_CACHE_TTL_SECONDS", default_value = "3600")]
    cache_ttl: u64,

    /// Upstream call timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECONDS", default_value = "60")]
    timeout: u64,

    /// Redis cache URL (requires the cache-redis feature)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Persona TOML file overriding the built-in analyst persona
    #[arg(long)]
    persona: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[command(flatten)]
        gateway: GatewayArgs,

        /// Listen address
        #[arg(long, env = "VEIL_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Browser origin allowed by CORS
        #[arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:3000")]
        cors_origin: String,

        /// JSON file of vendor records to serve
        #[arg(long, env = "VEIL_VENDORS")]
        vendors: Option<PathBuf>,
    },

    /// Ask the analyst a single question
    Ask {
        /// The question
        #[arg(short, long)]
        query: String,

        #[command(flatten)]
        gateway: GatewayArgs,
    },

    /// Score a JSON list of signals
    Score {
        /// JSON file containing an array of signals
        #[arg(short, long)]
        signals: PathBuf,
    },

    /// Print scored vendors from a JSON file of vendor records
    Vendors {
        /// JSON file of vendor records
        #[arg(short, long, env = "VEIL_VENDORS")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Serve {
            gateway,
            bind,
            cors_origin,
            vendors,
        } => {
            let gateway = build_gateway(gateway).await?;
            let registry = match vendors {
                Some(path) => VendorRegistry::load_from_file(&path)
                    .with_context(|| format!("loading vendors from {}", path.display()))?,
                None => {
                    warn!("No vendor file given, vendor endpoints will be empty");
                    VendorRegistry::new()
                }
            };

            println!("🛡️  Veil gateway on http://{}", bind);
            veil_server::serve(
                AppState::new(gateway, registry),
                ServerConfig { bind, cors_origin },
            )
            .await?;
        }
        Commands::Ask { query, gateway } => {
            let gateway = build_gateway(gateway).await?;
            let answer = gateway.answer(&query).await?;

            let source = if answer.was_cached { "cache" } else { "upstream" };
            println!("📡 Model: {} | Tokens: {} | Source: {}\n", answer.model_used, answer.tokens_used, source);
            println!("{}", answer.text);
        }
        Commands::Score { signals } => {
            let content = fs::read_to_string(&signals)
                .with_context(|| format!("reading {}", signals.display()))?;
            let signals: Vec<Signal> = serde_json::from_str(&content).context("parsing signals")?;

            let assessment = aggregate(&signals);
            println!("📊 Risk score: {}/100 ({} signals)", assessment.score, signals.len());
            for reason in &assessment.reasons {
                println!("   - {}", reason);
            }
        }
        Commands::Vendors { file } => {
            let registry = VendorRegistry::load_from_file(&file)
                .with_context(|| format!("loading vendors from {}", file.display()))?;

            for vendor in registry.list() {
                println!(
                    "{:<6} {:<24} {:<28} {:>3}  [{}]",
                    vendor.id,
                    vendor.name,
                    vendor.domain,
                    vendor.risk_score(),
                    vendor.industry_tag
                );
                for reason in vendor.reasons() {
                    println!("       - {}", reason);
                }
            }

            let stats = registry.stats();
            println!(
                "\n📊 {} vendors, {} signals, average risk {:.1}",
                stats.vendor_count, stats.signal_count, stats.avg_risk
            );
        }
    }

    Ok(())
}

async fn build_gateway(args: GatewayArgs) -> Result<QueryGateway> {
    if args.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; uncached queries will fail");
    }

    let mut backend_config =
        OpenAIBackendConfig::openai(args.api_key.as_deref().unwrap_or_default())
            .with_timeout(args.timeout);
    if let Some(base_url) = &args.base_url {
        backend_config = backend_config.with_base_url(base_url);
    }
    let backend = create_backend(backend_config)?;

    let persona = match &args.persona {
        Some(path) => Persona::load_from_file(path)
            .with_context(|| format!("loading persona from {}", path.display()))?,
        None => Persona::embedded(),
    };

    let config = GatewayConfig {
        cache_ttl: Duration::from_secs(args.cache_ttl),
        models: ModelCatalog::with_ids(&args.cheap_model, &args.full_model),
        max_output_tokens: args.max_tokens,
        upstream_timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };

    let cache = build_cache(args.redis_url.as_deref()).await;

    Ok(QueryGateway::new(backend, cache, persona, config))
}

#[cfg(feature = "cache-redis")]
async fn build_cache(redis_url: Option<&str>) -> SharedCacheStore {
    if let Some(url) = redis_url {
        match veil_gateway::RedisCacheStore::connect(url).await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("Redis unavailable ({}), falling back to in-memory cache", e),
        }
    }
    Arc::new(MemoryCacheStore::new())
}

#[cfg(not(feature = "cache-redis"))]
async fn build_cache(redis_url: Option<&str>) -> SharedCacheStore {
    if redis_url.is_some() {
        warn!("REDIS_URL is set but this build lacks the cache-redis feature; using in-memory cache");
    }
    Arc::new(MemoryCacheStore::new())
}

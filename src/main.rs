//! Simple Cache CLI
//!
//! Command-line front end for the cache adapter. Each invocation builds an
//! adapter from configuration, runs one command and prints the result as
//! JSON on stdout.
//!
//! ```text
//! simple-cache --url redis://cache:6379 --database 2 set user:1 '{"name":"ada"}' --ttl 60
//! simple-cache --mode fail get-many user:1 user:2 --default null
//! ```

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simple_cache_adapter::{
    AdapterConfig, CacheAdapter, CacheValue, CompressionAlgorithm, Error, FailureMode, Result,
    SimpleCache, StoreBackend, Ttl,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Simple Cache - generic cache over a remote key-value store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "CACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Store backend (redis, memory)
    #[arg(long, env = "CACHE_BACKEND")]
    backend: Option<StoreBackend>,

    /// Store URL
    #[arg(long, env = "CACHE_URL")]
    url: Option<String>,

    /// Database index to operate on
    #[arg(long, env = "CACHE_DATABASE")]
    database: Option<u32>,

    /// Failure mode (exception, fail)
    #[arg(long, env = "CACHE_MODE")]
    mode: Option<FailureMode>,

    /// Payload compression (none, lz4, zstd, snappy)
    #[arg(long, env = "CACHE_COMPRESSION")]
    compression: Option<CompressionAlgorithm>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the store answers (prints false under --mode fail)
    Ping,
    /// Read one key
    Get {
        key: String,
        /// JSON value returned on a miss
        #[arg(long, default_value = "null")]
        default: String,
    },
    /// Read several keys
    GetMany {
        #[arg(required = true)]
        keys: Vec<String>,
        /// JSON value returned for each miss
        #[arg(long, default_value = "null")]
        default: String,
    },
    /// Write one key
    Set {
        key: String,
        /// JSON value
        value: String,
        /// Expiry in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Write several keys from a JSON object
    SetMany {
        /// JSON object of key to value
        values: String,
        /// Expiry in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Remove keys
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Check whether a key is present
    Has { key: String },
    /// Remove every key in the selected database
    Clear,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = load_config(&args)?;
    info!(
        version = simple_cache_adapter::VERSION,
        backend = %config.store.backend,
        database = config.store.database,
        mode = %config.mode,
        "Starting simple-cache"
    );

    let cache = CacheAdapter::from_config(&config).await?;
    let output = run(&cache, args.command).await?;
    println!("{}", output);

    debug!(stats = ?cache.stats(), "Command complete");
    Ok(())
}

/// Layer CLI overrides on top of the file (or default) configuration
fn load_config(args: &Args) -> Result<AdapterConfig> {
    let mut config = match &args.config {
        Some(path) => AdapterConfig::from_file(path)?,
        None => AdapterConfig::default(),
    };

    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(url) = &args.url {
        config.store.url = url.clone();
    }
    if let Some(database) = args.database {
        config.store.database = database;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(compression) = args.compression {
        config.codec.compression = compression;
    }

    config.validate()?;
    Ok(config)
}

async fn run(cache: &CacheAdapter, command: Command) -> Result<CacheValue> {
    let output = match command {
        Command::Ping => CacheValue::Bool(cache.ping().await?),
        Command::Get { key, default } => cache.get(&key, parse_json(&default)?).await?,
        Command::GetMany { keys, default } => {
            let values = cache.get_many(&keys, parse_json(&default)?).await?;
            CacheValue::Object(values.into_iter().collect())
        }
        Command::Set { key, value, ttl } => {
            CacheValue::Bool(cache.set(&key, parse_json(&value)?, ttl.map(Ttl::Seconds)).await?)
        }
        Command::SetMany { values, ttl } => {
            let values = parse_object(&values)?;
            CacheValue::Bool(cache.set_many(values, ttl.map(Ttl::Seconds)).await?)
        }
        Command::Delete { keys } => CacheValue::Bool(cache.delete_many(&keys).await?),
        Command::Has { key } => CacheValue::Bool(cache.has(&key).await?),
        Command::Clear => CacheValue::Bool(cache.clear().await?),
    };
    Ok(output)
}

fn parse_json(raw: &str) -> Result<CacheValue> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_object(raw: &str) -> Result<IndexMap<String, CacheValue>> {
    match parse_json(raw)? {
        CacheValue::Object(map) => Ok(map.into_iter().collect()),
        other => Err(Error::Serialization(format!(
            "expected a JSON object of key to value, got {}",
            other
        ))),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    if let Ok(directive) = "redis=warn".parse() {
        filter = filter.add_directive(directive);
    }

    // Logs go to stderr so stdout carries only command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

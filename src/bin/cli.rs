//! Recall CLI
//!
//! Command-line interface for querying, ingesting, and managing backends.

use clap::{Parser, Subcommand};
use recall_coordinator::config::{
    apply_env_overrides, config_path, load_config_from_path, validate_config,
    CoordinatorConfig, MemoryBackendType, VectorBackendType, SAMPLE_CONFIG,
};
use recall_coordinator::core::Metadata;
use recall_coordinator::database::{init_pool, migrations};
use recall_coordinator::{Coordinator, Error, QueryRequest, Result, VERSION};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "recall",
    author = "Recall Contributors",
    version = VERSION,
    about = "Recall - merged retrieval over memory and vector backends",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to RECALL_CONFIG or the user config dir)
    #[arg(long, short, global = true, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query both subsystems and print the merged response as JSON
    Query {
        /// Query text
        text: String,
        /// User the query runs on behalf of
        #[arg(long, short, default_value = "default")]
        user: String,
        /// Maximum number of merged results
        #[arg(long, short)]
        limit: Option<usize>,
        /// Metadata filter, repeatable (key=value)
        #[arg(long = "filter", short = 'f', value_parser = parse_key_value)]
        filters: Vec<(String, serde_json::Value)>,
    },

    /// Store an entry in both subsystems
    Add {
        /// Text to store
        text: String,
        /// Owning user
        #[arg(long, short, default_value = "default")]
        user: String,
        /// Metadata entry, repeatable (key=value)
        #[arg(long = "meta", short, value_parser = parse_key_value)]
        metadata: Vec<(String, serde_json::Value)>,
    },

    /// Check the status of both subsystems
    Status,

    /// Run database migrations for Postgres-backed subsystems
    Migrate,

    /// Print a sample configuration
    InitConfig,
}

/// Parse `key=value`; the value is read as JSON when it parses, else as a string
fn parse_key_value(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Bad input or configuration exits with 2, everything else with 1
fn exit_code(error: &Error) -> i32 {
    if error.is_client_error() {
        2
    } else {
        1
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("recall_coordinator=info,recall=info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Query {
            text,
            user,
            limit,
            filters,
        } => run_query(cli.config, text, user, limit, filters).await,
        Commands::Add {
            text,
            user,
            metadata,
        } => add_entry(cli.config, text, user, metadata).await,
        Commands::Status => check_status(cli.config).await,
        Commands::Migrate => run_migrations(cli.config).await,
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<CoordinatorConfig> {
    match path {
        Some(path) => {
            let mut config = load_config_from_path(&path)?;
            apply_env_overrides(&mut config)?;
            Ok(config)
        }
        None => CoordinatorConfig::from_env(),
    }
}

async fn run_query(
    config: Option<PathBuf>,
    text: String,
    user: String,
    limit: Option<usize>,
    filters: Vec<(String, serde_json::Value)>,
) -> Result<()> {
    let coordinator = Coordinator::connect(resolve_config(config)?).await?;

    let mut request = QueryRequest::new(text, user);
    request.limit = limit;
    for (key, value) in filters {
        request = request.with_filter(key, value);
    }

    let response = coordinator.query(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    coordinator.close().await
}

async fn add_entry(
    config: Option<PathBuf>,
    text: String,
    user: String,
    metadata: Vec<(String, serde_json::Value)>,
) -> Result<()> {
    let coordinator = Coordinator::connect(resolve_config(config)?).await?;

    let metadata: Metadata = metadata.into_iter().collect();
    let report = coordinator.remember(&text, &user, metadata).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    coordinator.close().await?;

    if report.stored_anywhere() {
        Ok(())
    } else {
        Err(Error::Internal("Entry was not stored in any subsystem".into()))
    }
}

/// Check status of both subsystems
async fn check_status(config: Option<PathBuf>) -> Result<()> {
    println!("🔍 Recall Status\n");

    let source = config.clone().unwrap_or_else(config_path);
    let config = match resolve_config(config) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Configuration: {}", e);
            return Ok(());
        }
    };

    println!("Configuration: ✅ Loaded ({})", source.display());
    let validation = validate_config(&config);
    for issue in &validation.errors {
        println!("  ❌ {}: {}", issue.path, issue.message);
        if let Some(suggestion) = &issue.suggestion {
            println!("     💡 {}", suggestion);
        }
    }
    for issue in &validation.warnings {
        println!("  ⚠️  {}: {}", issue.path, issue.message);
    }
    if !validation.valid {
        return Ok(());
    }

    let coordinator = Coordinator::connect(config).await?;
    for status in coordinator.status().await {
        let state = match (status.available, status.healthy) {
            (false, _) => "❌ Unavailable".to_string(),
            (true, true) => "✅ Healthy".to_string(),
            (true, false) => format!(
                "❌ Unhealthy{}",
                status.error.map(|e| format!(": {}", e)).unwrap_or_default()
            ),
        };
        println!("{} ({}): {}", status.subsystem, status.backend, state);
    }

    coordinator.close().await
}

/// Run database migrations
async fn run_migrations(config: Option<PathBuf>) -> Result<()> {
    println!("Running database migrations...\n");

    let config = resolve_config(config)?;
    let mut ran = false;

    if config.memory.backend == MemoryBackendType::Postgres {
        let postgres = config
            .memory
            .postgres
            .as_ref()
            .ok_or_else(|| Error::Config("memory.postgres not configured for migrations".into()))?;
        let pool = init_pool(postgres, false).await?;
        migrations::run_memory(&pool).await?;
        pool.close().await;
        ran = true;
    }

    if config.vector.backend == VectorBackendType::Postgres {
        let postgres = config
            .vector
            .postgres
            .as_ref()
            .ok_or_else(|| Error::Config("vector.postgres not configured for migrations".into()))?;
        // Migrations create the extension, so skip the pgvector check here
        let pool = init_pool(postgres, false).await?;
        migrations::run_vector(&pool).await?;
        pool.close().await;
        ran = true;
    }

    if ran {
        println!("\n✅ Migrations complete!");
    } else {
        info!("No Postgres-backed subsystem configured");
        println!("Nothing to migrate: no subsystem uses the postgres backend.");
    }
    Ok(())
}

fn init_config() -> Result<()> {
    println!("{}", SAMPLE_CONFIG);
    Ok(())
}

//! todo-api: application entry point.
//!
//! Initializes tracing, loads configuration from a TOML file plus environment
//! overrides, connects the store, and serves the router. The `probe` and
//! `migrate` subcommands cover the container health check and one-off schema
//! setup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_api::config::{
    AppConfig, DatabaseBackend, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_PROBE_URL,
};
use todo_api::probe::{run_probe, ProbeOptions};
use todo_api::routes::create_router;
use todo_api::state::AppState;
use todo_api::store::{MemoryStore, MySqlStore, Store};

/// todo-api: a todo list JSON API
#[derive(Parser, Debug)]
#[command(name = "todo-api", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "todo_api=debug,tower_http=info")
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Fetch a URL once and exit non-zero unless it answers 2xx
    Probe {
        #[arg(long, default_value = DEFAULT_PROBE_URL)]
        url: String,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
        /// Total attempts before giving up
        #[arg(long, default_value_t = 1)]
        attempts: u32,
        /// Delay between attempts in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn init_tracing(log_filter: &str, json: bool) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(log_filter));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let command = args.command.unwrap_or(Command::Serve);

    // The probe runs inside health checks where no config file may exist
    if let Command::Probe {
        url,
        timeout_secs,
        attempts,
        interval_ms,
    } = &command
    {
        init_tracing(&log_filter, false);
        let options = ProbeOptions {
            url: url.clone(),
            timeout: Duration::from_secs(*timeout_secs),
            attempts: *attempts,
            interval: Duration::from_millis(*interval_ms),
        };
        run_probe(&options).await?;
        return Ok(());
    }

    // Load configuration
    let config = AppConfig::load(&args.config)?;
    init_tracing(&log_filter, config.logging.is_json());
    tracing::info!(path = %args.config, "Loaded configuration");

    let migrate_only = matches!(command, Command::Migrate);

    let store: Arc<dyn Store> = match config.database.backend {
        DatabaseBackend::Mysql => {
            let mysql = MySqlStore::connect(&config.database).await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                "Connected to MySQL"
            );
            if config.database.run_migrations || migrate_only {
                mysql.migrate().await?;
                tracing::info!("Database migrations applied");
            }
            Arc::new(mysql)
        }
        DatabaseBackend::Memory => {
            if migrate_only {
                tracing::warn!("Memory backend has no migrations to apply");
            } else {
                tracing::warn!("Using in-memory store, data will be lost on restart");
            }
            Arc::new(MemoryStore::new())
        }
    };

    if migrate_only {
        return Ok(());
    }

    if config.auth.secret_key == "change-me" {
        tracing::warn!("auth.secret_key is the shipped placeholder; set SECRET_KEY");
    }

    let http_config = config.http.clone();
    let state = AppState::new(config, store)?;
    let app = create_router(state);

    todo_api::http::start_server(app, &http_config).await?;

    Ok(())
}

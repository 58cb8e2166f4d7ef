use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use database_layer::{ensure_default_organization, run_migrations, DatabasePool, PgPluginRepository};
use error_common::{log_error, MarketError, Result};
use logger_redacted::{init_tracing, redact};
use nextmarket_server::{create_app, storage::S3BlobStore, MarketConfig, MarketServer};
use plugins_registry_api::{OrganizationId, PluginService};

/// NextMarket plugin marketplace server
#[derive(Parser, Debug)]
#[command(name = "nextmarket-server", version)]
#[command(about = "Plugin marketplace registry HTTP API server")]
struct Cli {
    /// Configuration file path (TOML); `nextmarket.toml` is used when present
    #[arg(short, long, env = "NEXTMARKET_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations, then serve the HTTP API (default)
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log_error("nextmarket-server", &e);
        eprintln!("{} {}", "error:".bright_red().bold(), redact(&e.to_string()));
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = MarketConfig::load(cli.config.as_deref())
        .map_err(|e| MarketError::ConfigError(e.to_string()))?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging).map_err(|e| MarketError::ConfigError(e.to_string()))?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Migrate => migrate(&config).await,
    }
}

/// Returns the pool and the default organization id
async fn connect_and_migrate(config: &MarketConfig) -> Result<(DatabasePool, OrganizationId)> {
    let pool = DatabasePool::new(&config.database)
        .await
        .map_err(|e| MarketError::DatabaseError(e.to_string()))?;
    run_migrations(pool.pool())
        .await
        .map_err(|e| MarketError::DatabaseError(e.to_string()))?;
    let organization = ensure_default_organization(pool.pool())
        .await
        .map_err(|e| MarketError::DatabaseError(e.to_string()))?;
    info!(organization_id = organization.id, "Default publisher: {}", organization.name);
    Ok((pool, organization.id))
}

async fn migrate(config: &MarketConfig) -> Result<()> {
    let (pool, _) = connect_and_migrate(config).await?;
    pool.close().await;
    println!("{}", "Database migrations applied".bright_green());
    Ok(())
}

async fn serve(mut config: MarketConfig) -> Result<()> {
    print_startup_banner();
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let (pool, default_publisher) = connect_and_migrate(&config).await?;
    config.registry.publisher_id.get_or_insert(default_publisher);

    let blobs = S3BlobStore::new(&config.storage).await;
    if config.storage.create_bucket {
        blobs
            .ensure_bucket()
            .await
            .map_err(|e| MarketError::StorageError(e.to_string()))?;
    }

    let repository = PgPluginRepository::new(&pool);
    let service = PluginService::new(
        Arc::new(repository),
        Arc::new(blobs),
        config.registry.clone(),
    );
    let server = MarketServer::new(service, config.server.clone());
    let app = create_app(server);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MarketError::NetworkError(format!("Failed to bind to {addr}: {e}")))?;

    info!("🚀 {}", format!("NextMarket server running on http://{addr}").bright_green());
    info!("📋 {}", format!("Health check available at: http://{addr}/health").bright_blue());
    info!("📋 {}", format!("API v1 available at: http://{addr}/api/v1").bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MarketError::ServerError(format!("HTTP server error: {e}")))?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let result = tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler");
    match result {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => log_error("shutdown", &MarketError::from(e)),
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                         NEXTMARKET                           ║".bright_cyan());
    println!("{}", "║                Plugin Marketplace Registry                   ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use insurance_server::{create_app, InsuranceServer, ServerConfig};

/// Insurance records HTTP server
#[derive(Parser, Debug)]
#[command(name = "insurance-server")]
#[command(about = "HTTP API for insurance providers and insurance details")]
struct Args {
    /// Server bind address
    #[arg(long, env = "INSURANCE_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "INSURANCE_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "insurance-server.yaml")]
    config: PathBuf,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Do not apply database migrations at startup
    #[arg(long)]
    skip_migrations: bool,
}

impl Args {
    /// Command-line values win over the file and `INSURANCE__` variables
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if self.verbose {
            config.logging.log_level = "debug".to_string();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if self.skip_migrations {
            config.server.run_migrations = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = ServerConfig::load(Some(args.config.as_path())).context("Failed to load configuration")?;
    let config = args.apply(config);
    config.validate()?;

    logger_redacted::init(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting insurance records server");

    let bind_address = config.bind_address();
    let server = InsuranceServer::new(config).await?;
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {bind_address}"))?;

    info!(address = %bind_address, "Insurance records server listening");
    info!("Health check available at: http://{bind_address}/health");
    info!("API v1 available at: http://{bind_address}/api/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Insurance records server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

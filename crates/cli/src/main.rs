use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use solomon_core::{AppConfig, ConfigLoader, DEFAULT_CONFIG_PATH};
use solomon_data::{DailyMetricsRepository, DatabaseClient, UserRepository};
use solomon_pipeline::PgSyncOrchestrator;
use solomon_web_api::{hash_password, AccessGate, ApiServer};

#[derive(Parser)]
#[command(name = "solomon")]
#[command(about = "Transaction sync pipeline and daily metrics API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (sync trigger, metrics query, health)
    Serve {
        /// Config file path
        #[arg(short, long, env = "SOLOMON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Run one sync and print the run summary as JSON
    Sync {
        /// Config file path
        #[arg(short, long, env = "SOLOMON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Print a signed bearer token for the metrics endpoint
    IssueToken {
        /// Config file path
        #[arg(short, long, env = "SOLOMON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: String,
        /// Token subject claim
        #[arg(long, default_value = "dashboard")]
        subject: String,
    },
    /// Create a login user unless the email is already registered
    CreateUser {
        /// Config file path
        #[arg(short, long, env = "SOLOMON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: String,
        #[arg(long, default_value = "admin@email.com")]
        email: String,
        #[arg(long, env = "SOLOMON_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { config } => run_server(&load_config(&config)?).await?,
        Commands::Sync { config } => run_sync_once(&load_config(&config)?).await?,
        Commands::IssueToken { config, subject } => {
            issue_token(&load_config(&config)?, &subject)?;
        }
        Commands::CreateUser {
            config,
            email,
            password,
        } => create_user(&load_config(&config)?, &email, &password).await?,
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    let config = ConfigLoader::load_from(path)
        .with_context(|| format!("failed to load configuration from {path}"))?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let database = DatabaseClient::from_config(&config.database).await?;
    if let Err(e) = database.ping().await {
        tracing::warn!(error = %e, "database not reachable at startup; continuing");
    }

    let orchestrator = PgSyncOrchestrator::from_config(config, &database)?;
    let metrics = DailyMetricsRepository::new(database.pool().clone());
    let users = UserRepository::new(database.pool().clone());
    let gate = AccessGate::new(&config.auth)?;

    let server = ApiServer::new(
        Arc::new(orchestrator),
        Arc::new(metrics),
        Arc::new(users),
        Arc::new(gate),
    )
    .protect_sync(config.auth.protect_sync);
    let addr = config.server.bind_addr();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&addr).await {
            tracing::error!(error = %e, "server error");
        }
    });

    shutdown_signal().await?;

    server_handle.abort();
    database.pool().close().await;

    tracing::info!("server stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    tracing::info!("received Ctrl+C, shutting down");
    Ok(())
}

async fn run_sync_once(config: &AppConfig) -> anyhow::Result<()> {
    let database = DatabaseClient::from_config(&config.database).await?;
    let orchestrator = PgSyncOrchestrator::from_config(config, &database)?;

    let result = orchestrator.run().await;
    database.pool().close().await;

    let summary = result?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn issue_token(config: &AppConfig, subject: &str) -> anyhow::Result<()> {
    let gate = AccessGate::new(&config.auth)?;
    let token = gate.issue_token(subject)?;

    tracing::info!(
        subject,
        ttl_secs = gate.token_ttl().as_secs(),
        "issued bearer token"
    );
    println!("{token}");
    Ok(())
}

async fn create_user(config: &AppConfig, email: &str, password: &str) -> anyhow::Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        anyhow::bail!("email and password cannot be empty");
    }

    let database = DatabaseClient::from_config(&config.database).await?;
    let users = UserRepository::new(database.pool().clone());

    let hash = hash_password(password)?;
    let result = users.create_if_absent(email.trim(), &hash).await;
    database.pool().close().await;

    if result? {
        tracing::info!(email, "user created");
    } else {
        tracing::info!(email, "user already exists; left unchanged");
    }
    Ok(())
}

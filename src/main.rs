// src/main.rs
// UpgradeSage - what breaks if I move this repository from ref A to ref B?

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use upgradesage::{
    config::{ConfigLocation, ConfigResolver, ConfigStore, EnvConfig},
    llm, web,
};

#[derive(Parser)]
#[command(name = "upgradesage")]
#[command(about = "Breaking-change analysis between two refs of a git repository")]
#[command(version)]
struct Cli {
    /// Config record to use instead of ./.upgradesage or ~/.upgradesage
    #[arg(long, global = true, env = "UPGRADESAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind (default: UPGRADESAGE_HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default: UPGRADESAGE_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the startup check as JSON and exit
    Check,
}

async fn run_server(
    store: Arc<ConfigStore>,
    env: &EnvConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let model_timeout = store.current().config.model_timeout();
    let client = llm::client_from_keys(&env.model, model_timeout);

    let state = web::state::AppState::new(store, client);
    let app = web::create_router(state);

    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| env.host.clone()),
        port.unwrap_or(env.port)
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "UpgradeSage listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let env = EnvConfig::load();
    let validation = env.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("{}", err);
        }
        bail!("invalid environment configuration");
    }

    let location = match cli.config {
        Some(path) => ConfigLocation::explicit(path),
        None => ConfigLocation::discover(),
    };
    let store = Arc::new(ConfigStore::new(ConfigResolver::new(
        location,
        env.overrides.clone(),
    )));
    info!(source = %store.current().describe_source(), "Configuration resolved");

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => run_server(store, &env, host, port).await,
        Commands::Check => {
            let check = store.current().startup_check();
            println!("{}", serde_json::to_string_pretty(&check)?);
            Ok(())
        }
    }
}

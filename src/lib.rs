pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;
pub mod state;

pub use config::Config;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => run_server(config).await,

        Some("init") => {
            Config::create_default_if_missing()?;
            println!("Config file created. Edit config.toml and run again.");
            Ok(())
        }

        Some("help" | "-h" | "--help") => {
            print_help();
            Ok(())
        }

        Some(other) => {
            println!("Unknown command: {other}");
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Reviewd - content review platform backend");
    println!();
    println!("USAGE:");
    println!("  reviewd [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("  serve    Start the API server (default)");
    println!("  init     Create default config file");
    println!("  help     Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the database, server port, and auth.");
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Reviewd v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let state = api::create_app_state_from_config(config).await?;
    let app = api::router(state).await;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening at http://{addr}/api/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }
}

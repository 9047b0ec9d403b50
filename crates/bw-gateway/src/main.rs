//! bw-gateway: Bandwidth provisioning gateway
//!
//! Serves an axum application with the Bandwidth layer installed and logs
//! every call and message callback.
//!
//! Usage:
//!   bw-gateway             - Provision against the Bandwidth API and serve
//!   bw-gateway --offline   - Use the in-memory provider
//!   bw-gateway --help      - Show help

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use bw_core::{BandwidthServices, Config, InMemoryBandwidth};
use bw_web::{Bandwidth, BandwidthOptions};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Talk to the configured Bandwidth account
    Server,
    /// In-memory provider, no credentials needed
    Offline,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("bw-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting bw-gateway...");
    tracing::info!("Application: {}", config.application.name);

    let services = match mode {
        RunMode::Offline => {
            tracing::info!("Running with the in-memory provider");
            BandwidthServices::from_backend(Arc::new(InMemoryBandwidth::new()))
        }
        _ => BandwidthServices::connect(&config.bandwidth)
            .map_err(|e| anyhow::anyhow!("Failed to create Bandwidth client: {}", e))?,
    };

    run_server(config, services).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--offline" | "-o" => return RunMode::Offline,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

fn print_help() {
    println!("bw-gateway - Bandwidth provisioning gateway");
    println!();
    println!("Usage:");
    println!("  bw-gateway            Provision against the Bandwidth API and serve");
    println!("  bw-gateway --offline  Use the in-memory provider");
    println!("  bw-gateway --help     Show this help message");
    println!("  bw-gateway --version  Show version");
    println!();
    println!("Configuration is read from bw-gateway.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  BANDWIDTH_USER_ID            Account user id (required online)");
    println!("  BANDWIDTH_API_TOKEN          API token (required online)");
    println!("  BANDWIDTH_API_SECRET         API secret (required online)");
    println!("  BANDWIDTH_BASE_URL           API endpoint (default: https://api.catapult.inetwork.com/v1)");
    println!("  BANDWIDTH_APPLICATION_NAME   Application name (default: bw-gateway)");
    println!("  BANDWIDTH_USE_HTTPS          https callback URLs (default: true)");
    println!("  BANDWIDTH_DOMAIN_NAME        SIP domain to provision (optional)");
    println!("  BANDWIDTH_PHONE_NUMBER_NAME  Name of the allocated number (optional)");
    println!("  BANDWIDTH_AREA_CODE          Order a local number in this area code");
    println!("  BANDWIDTH_TOLL_FREE          Order a toll-free number instead");
    println!("  PORT                         HTTP port (default: 3000)");
}

async fn run_server(config: Config, services: BandwidthServices) -> anyhow::Result<()> {
    let options = BandwidthOptions::from_config(&config)
        .on_call(routes::call_logger())
        .on_message(routes::message_logger());
    tracing::info!("Provisioning: {:?}", options);

    let app = routes::app(Bandwidth::new(services, options));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down...");
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod app;
mod http;

#[derive(Debug, Parser)]
#[command(name = "pantry-gateway", version, about = "Food inventory service with expiry alerts")]
struct Cli {
    /// Path to pantry.toml (overrides PANTRY_CONFIG).
    #[arg(long, short)]
    config: Option<String>,

    /// Run the alert pipeline once against the admin address and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pantry_gateway=info,pantry_alerts=info,pantry_scheduler=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > PANTRY_CONFIG env > ~/.pantry/pantry.toml
    let config_path = cli.config.or_else(|| std::env::var("PANTRY_CONFIG").ok());
    let config =
        pantry_core::config::PantryConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            pantry_core::config::PantryConfig::default()
        });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let transport = app::build_transport(&config);
    let state = Arc::new(app::AppState::from_config(config, transport)?);

    if cli.once {
        let report = state.scheduler.trigger_now().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.send.success {
            anyhow::bail!(
                "alert delivery failed: {}",
                report.send.error.unwrap_or_default()
            );
        }
        return Ok(());
    }

    match state.scheduler.start() {
        Some(next) => info!(next_run = %next, "daily alerts scheduled"),
        None => info!("daily alerts not scheduled"),
    }

    let router = app::build_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Pantry gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop the daily trigger; an in-flight run finishes on its own task
    state.scheduler.stop();
    info!("Pantry gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

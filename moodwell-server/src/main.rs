use std::sync::Arc;

use clap::Parser;
use moodwell_core::MoodwellConfig;
use tokio::sync::broadcast;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use moodwell_server::server;
use moodwell_server::subsystems::pipeline::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "moodwell.toml")]
    config: String,

    /// Check the configured store and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match MoodwellConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let directive: Directive = config
        .service
        .log_level
        .parse()
        .unwrap_or_else(|_| tracing::Level::INFO.into());
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let state = match AppState::from_config(config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to start turn pipeline: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match &state.pool {
            Some(pool) => match moodwell_core::db::health_check(pool).await {
                Ok(v) => println!("✅ PostgreSQL connected: {}", v),
                Err(e) => {
                    println!("❌ PostgreSQL connection failed: {}", e);
                    std::process::exit(1);
                }
            },
            None => println!("✅ In-memory store (no database configured)"),
        }
        println!(
            "✅ Strategy: {:?}, persistence: {:?}",
            state.orchestrator.settings().strategy,
            state.orchestrator.settings().persistence
        );
        println!("✅ Moodwell health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if state.config.http.enabled {
        let http_state = state.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = moodwell_server::http::start_http_server(http_state, http_shutdown).await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = state.config.service.socket_path.clone();
    server::run_unix_server(&socket_path, state, tx.subscribe()).await?;

    Ok(())
}

mod api;
mod config;
mod error;
mod exchange;
mod indicator;
mod model;
mod render;
mod report;
mod snapshot;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::ApiState;
use config::AppConfig;
use exchange::binance::BinanceMarketData;
use report::{ReportBuilder, ReportSettings, validate_coins};

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("report error")]
    Report,
    #[display("server error")]
    Server,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(
    name = "coin-prompt",
    about = "Market snapshot prompts for crypto perpetuals"
)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the full prompt for the configured (or given) coins
    Prompt {
        /// Comma-separated coin list overriding the configured one
        #[arg(long, value_delimiter = ',')]
        coins: Vec<String>,
        /// Emit the snapshots as JSON instead of prompt text
        #[arg(long)]
        json: bool,
    },
    /// Print the prompt block for a single coin
    Coin { symbol: String },
    /// Serve the prompt over HTTP
    Serve {
        /// Listen address overriding `server.bind`
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path).change_context(AppError::Config)?,
        None => {
            let config = AppConfig::default();
            config::validate(&config).change_context(AppError::Config)?;
            config
        }
    };

    init_tracing(&config);

    let source = Arc::new(BinanceMarketData::new(&config.exchange));
    let builder = ReportBuilder::new(source, ReportSettings::from_config(&config));

    match cli.command {
        Command::Prompt { coins, json } => {
            let coins = if coins.is_empty() {
                config.report.coins.clone()
            } else {
                coins
            };
            let coins = validate_coins(&coins).change_context(AppError::Report)?;
            let snapshots = builder
                .build_report(&coins)
                .await
                .change_context(AppError::Report)?;

            if json {
                let body = serde_json::to_string_pretty(&snapshots)
                    .change_context(AppError::Runtime)?;
                println!("{body}");
            } else {
                print!(
                    "{}",
                    render::render_report(&snapshots, builder.settings().intraday_timeframe)
                );
            }
        }
        Command::Coin { symbol } => {
            let coins = validate_coins(&[symbol]).change_context(AppError::Report)?;
            let coin = &coins[0];
            match builder.fetch_snapshot(coin).await {
                Some(snapshot) => print!("{}", render::render_snapshot(&snapshot)),
                None => {
                    return Err(Report::new(AppError::Report)
                        .attach(format!("unable to fetch data for {coin}")));
                }
            }
        }
        Command::Serve { bind } => {
            let addr: SocketAddr = match bind {
                Some(addr) => addr,
                None => config
                    .server
                    .bind
                    .parse()
                    .change_context(AppError::Config)
                    .attach_with(|| format!("bind: {}", config.server.bind))?,
            };
            let state = ApiState::new(builder, &config.report.coins)
                .change_context(AppError::Config)?;
            let state = Arc::new(state);
            serve(addr, state).await?;
        }
    }

    Ok(())
}

async fn serve(addr: SocketAddr, state: Arc<ApiState>) -> Result<(), Report<AppError>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .change_context(AppError::Server)
        .attach_with(|| format!("bind: {addr}"))?;
    info!(%addr, "prompt API listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .change_context(AppError::Server)?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("ctrl+c received, shutting down"),
        Err(e) => {
            // Without a signal handler the server runs until killed.
            warn!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    }
}

fn init_tracing(config: &AppConfig) {
    // Stdout carries the prompt; logs go to stderr.
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

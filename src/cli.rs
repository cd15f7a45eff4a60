use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::server::{self, AppState};
use crate::services::{IndicatorConfigStore, IndicatorEngine, SeriesStore};
use crate::utils::{get_config_path, get_data_dir};

#[derive(Parser)]
#[command(name = "priceboard")]
#[command(about = "Price ingestion and indicator service", long_about = None)]
pub struct Cli {
    /// Data directory holding per-ticker history files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the indicator configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Delete one ticker's data, or everything
    Reset {
        /// Ticker to reset; omit to reset the whole store
        #[arg(short, long)]
        ticker: Option<String>,
    },
    /// Rebuild indicators for every stored ticker
    Recompute,
    /// Show what the store currently holds
    Status,
}

pub async fn run() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(get_data_dir);
    let config_path = cli.config.unwrap_or_else(get_config_path);
    let store = Arc::new(SeriesStore::new(data_dir));
    let config = Arc::new(IndicatorConfigStore::new(config_path));

    match cli.command {
        Commands::Serve { port } => {
            let state = AppState::new(store, config);
            if let Err(e) = server::serve(state, port).await {
                eprintln!("server error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Reset { ticker } => match store.reset(ticker.as_deref()) {
            Ok(()) => match ticker {
                Some(ticker) => println!("Reset data for {}", ticker),
                None => println!("Reset all data"),
            },
            Err(e) => {
                eprintln!("reset failed: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Recompute => {
            let engine = IndicatorEngine::new(store, config);
            match engine.recompute_all() {
                Ok(sweep) => {
                    println!(
                        "Recomputed indicators for {} tickers ({} failed)",
                        sweep.recomputed, sweep.failed
                    );
                }
                Err(e) => {
                    eprintln!("recompute failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status => match store.load_meta() {
            Ok(meta) => {
                if meta.is_empty() {
                    println!("Store is empty");
                    return;
                }
                println!("{} tickers stored:", meta.len());
                for entry in meta.values() {
                    println!(
                        "  {} [{}] {} records, type {}, updated {}",
                        entry.ticker,
                        entry.group,
                        entry.total_records,
                        entry.kind.as_str(),
                        entry.last_updated.format("%Y-%m-%d %H:%M:%S"),
                    );
                }
            }
            Err(e) => {
                eprintln!("status failed: {}", e);
                std::process::exit(1);
            }
        },
    }
}

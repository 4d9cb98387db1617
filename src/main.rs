mod config;
mod error;
mod models;
mod pipeline;
mod render;
mod scraper;
mod screening;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::models::{InvestorCategory, Market};
use crate::pipeline::{CancelSignal, Pipeline, ScanRequest};
use crate::render::OutputFormat;

#[derive(Parser)]
#[command(
    name = "flow-screener",
    about = "Consecutive net-buy equity screener for KOSPI/KOSDAQ",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Score tickers that were net-bought on every one of the last N sessions
    Scan {
        #[arg(short, long, value_enum, default_value_t = Market::Kospi)]
        market: Market,

        #[arg(short, long, value_enum, default_value_t = InvestorCategory::Foreign)]
        investor: InvestorCategory,

        /// Consecutive sessions (1 = today only)
        #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,

        /// Enrich at most this many candidates, in latest rank order
        #[arg(short, long)]
        limit: Option<usize>,

        /// Stop after this many seconds and report what finished
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Console)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        no_color: bool,
    },

    /// Print one session's top net-buy list
    Top {
        #[arg(short, long, value_enum, default_value_t = Market::Kospi)]
        market: Market,

        #[arg(short, long, value_enum, default_value_t = InvestorCategory::Foreign)]
        investor: InvestorCategory,

        /// Session box (0 = most recent)
        #[arg(short, long, default_value_t = 0)]
        day: usize,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the latest KOSPI and KOSDAQ composite index levels
    Indices {
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "flow_screener=info,warn",
        1 => "flow_screener=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let pipeline = Pipeline::new(&config)?;

    match cli.command {
        Command::Scan {
            market,
            investor,
            days,
            limit,
            timeout,
            format,
            output,
            no_color,
        } => {
            let _t = utils::Timer::start(format!("{} {} {}-day scan", market, investor, days));

            let (handle, mut signal) = CancelSignal::pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Ctrl-C received; finishing with the results gathered so far");
                    handle.cancel();
                }
            });
            if let Some(secs) = timeout.or(config.pipeline.run_timeout_secs) {
                signal = signal.with_timeout(Duration::from_secs(secs));
            }

            let request = ScanRequest {
                market,
                investor,
                window: days as usize,
                candidate_limit: limit,
            };
            let run = pipeline.run(&request, signal).await?;

            let color = !no_color && output.is_none() && std::io::stdout().is_terminal();
            let body = render::render(&run, format, color)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{}{}", format.file_prefix(), body))
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Wrote {} result(s) to {:?}", run.results.len(), path);
                }
                None => print!("{}", body),
            }
        }

        Command::Top {
            market,
            investor,
            day,
            limit,
        } => {
            let list = pipeline
                .rank_list(market, investor, day)
                .await
                .with_context(|| format!("Failed to fetch {} {} rank list", market, investor))?;
            print!("{}", render::render_rank_list(&list, limit));
        }

        Command::Indices { no_color } => {
            let quotes = pipeline.market_snapshot().await;
            let color = !no_color && std::io::stdout().is_terminal();
            print!("{}", render::render_indices(&quotes, color));
        }
    }

    Ok(())
}

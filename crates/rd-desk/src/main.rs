mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rd_types::AssetId;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Risk desk: market risk metrics, alerts and trend projections")]
struct Args {
    /// Path to config file (optional)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding `<asset>.csv` histories and `quotes.csv` (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Annualised volatility alert threshold in percent (overrides config)
    #[arg(long, global = true)]
    volatility_threshold: Option<f64>,

    /// Volume multiple alert threshold (overrides config)
    #[arg(long, global = true)]
    volume_threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute metrics for the configured assets and evaluate alerts
    Monitor {
        /// Number of cycles to run
        #[arg(long, default_value = "1")]
        cycles: u32,

        /// Seconds between cycles
        #[arg(long, default_value = "60")]
        interval_secs: u64,
    },
    /// Volatility and VaR for a single asset
    Analyze {
        #[arg(long)]
        asset: String,

        #[arg(long, default_value = "365")]
        days: u32,
    },
    /// Linear trend projection for a single asset
    Project {
        #[arg(long)]
        asset: String,

        #[arg(long, default_value = "365")]
        days: u32,

        /// Days to project
        #[arg(long, default_value = "30")]
        horizon: usize,
    },
    /// Return correlation between two assets
    Correlate {
        #[arg(long)]
        a: String,

        #[arg(long)]
        b: String,

        #[arg(long, default_value = "180")]
        days: u32,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::default(),
    };
    if let Some(dir) = &args.data_dir {
        cfg.data.dir = dir.into();
    }
    if let Some(v) = args.volatility_threshold {
        cfg.alerts.volatility_pct_threshold = v;
    }
    if let Some(v) = args.volume_threshold {
        cfg.alerts.volume_multiple_threshold = v;
    }
    cfg.alerts.validate()?;

    let data = commands::manager(&cfg);

    match args.command {
        Command::Monitor {
            cycles,
            interval_secs,
        } => {
            let interval = std::time::Duration::from_secs(interval_secs);
            for report in commands::monitor(&cfg, &data, cycles, interval).await? {
                print_json(&report)?;
            }
        }
        Command::Analyze { asset, days } => {
            print_json(&commands::analyze(&cfg, &data, &AssetId::new(&asset), days).await?)?;
        }
        Command::Project {
            asset,
            days,
            horizon,
        } => {
            let projection = commands::project(&data, &AssetId::new(&asset), days, horizon).await?;
            tracing::warn!("{}", projection.advisory);
            print_json(&projection)?;
        }
        Command::Correlate { a, b, days } => {
            let report =
                commands::correlate(&data, &AssetId::new(&a), &AssetId::new(&b), days).await?;
            print_json(&report)?;
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use couponbase::config::Config;
use couponbase::orders::LineItem;

mod commands;

#[derive(Parser)]
#[command(
    name = "couponbase",
    version,
    about = "Load coupon code sources and check discount eligibility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true, default_value = "false")]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the three coupon sources and report what was found
    Load {
        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Load the sources, then check coupon codes
    Check {
        /// Codes to check
        #[arg(required = true)]
        codes: Vec<String>,
    },

    /// Load the sources, then price an order
    Quote {
        /// Coupon code to apply
        #[arg(long)]
        coupon: Option<String>,

        /// Line item as PRODUCT:UNIT_PRICE:QUANTITY (repeatable)
        #[arg(short, long = "item", value_parser = commands::quote::parse_line_item, required = true)]
        items: Vec<LineItem>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    if cli.metrics {
        if let Err(e) = couponbase::metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed");
        }
    }

    tracing::info!("couponbase starting");

    match cli.command {
        Commands::Load { json } => {
            tracing::info!(json = %json, "Starting load command");
            commands::load::load(&config, json).await?;
        }

        Commands::Check { codes } => {
            tracing::info!(codes = codes.len(), "Starting check command");
            commands::check::check(&config, &codes).await?;
        }

        Commands::Quote { coupon, items } => {
            tracing::info!(coupon = ?coupon, items = items.len(), "Starting quote command");
            commands::quote::quote(&config, &items, coupon.as_deref()).await?;
        }
    }

    if cli.metrics {
        match couponbase::metrics::encode_metrics() {
            Ok(text) => print!("{text}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }

    tracing::info!("couponbase completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("couponbase=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("couponbase={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

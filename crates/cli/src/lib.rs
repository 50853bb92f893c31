pub mod commands;

use std::process::ExitCode;

use bhojana_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "bhojana",
    about = "Bhojana operator CLI",
    long_about = "Operate the Bhojana order engine: migrations, demo data, config inspection, quotes and agent payouts.",
    after_help = "Examples:\n  bhojana doctor --json\n  bhojana quote --item 250x2 --item 99.50x1 --coupon FEAST10\n  bhojana earnings --agent rider-7"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo coupons (idempotent upsert by code)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a cart and show the breakdown with its trace")]
    Quote {
        #[arg(long = "item", value_name = "PRICExQTY", required = true, help = "Cart line, e.g. 250x2")]
        items: Vec<String>,
        #[arg(long, help = "Coupon code to apply")]
        coupon: Option<String>,
    },
    #[command(about = "Report a delivery agent's commission earnings")]
    Earnings {
        #[arg(long, help = "Delivery agent id")]
        agent: String,
    },
    #[command(about = "Mark the commission of a closed order as paid")]
    Payout {
        #[arg(long, help = "Order id (UUID)")]
        order: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Quote { items, coupon } => commands::quote::run(&items, coupon.as_deref()),
        Command::Earnings { agent } => commands::earnings::run(&agent),
        Command::Payout { order } => commands::payout::run(&order),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Events go to stderr so stdout stays a single JSON payload.
fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

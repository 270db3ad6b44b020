mod config;
mod console;
mod extract;
mod ledger;
mod models;
mod pipeline;
mod portal;
mod utils;

use anyhow::Result;
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, Direction};
use crate::console::{Operator, StdinOperator};
use crate::ledger::{CsvLedger, SeenTrips};
use crate::models::{WeekCursor, parse_start_date};
use crate::pipeline::Orchestrator;
use crate::portal::driver::DriverPage;
use crate::portal::navigator::{AbsoluteNavigator, RelativeNavigator, WeekNavigator};
use crate::portal::{Pacer, PortalPage};

#[derive(Parser)]
#[command(name = "ride-ledger", about = "Driver portal ride-earnings scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Walk weekly activity views and append trip rows to the CSV ledger
    Scrape {
        /// Starting week date (e.g. "Jul 1, 2024"); prompted when omitted
        #[arg(short, long)]
        start: Option<String>,

        /// Override the configured traversal direction
        #[arg(short, long, value_enum)]
        direction: Option<Direction>,
    },

    /// Show ledger statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "ride_ledger=info,warn",
        1 => "ride_ledger=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { start, direction } => {
            let _t = utils::RunTimer::start("Scrape run");
            scrape(config, start, direction).await?;
        }

        Command::Stats => {
            let ledger = CsvLedger::open(&config.output.csv_path)?;
            let report = ledger.scan_existing();
            println!("─────────────────────────────────");
            println!("  ride-ledger — Ledger Stats");
            println!("─────────────────────────────────");
            println!("  File  : {:?}", ledger.path());
            println!("  Trips : {}", utils::fmt_count(report.rows));
            println!(
                "  Last  : {}",
                report
                    .last_date
                    .map(|d| d.format("%b %d, %Y").to_string())
                    .unwrap_or("—".into())
            );
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

async fn scrape(
    config: AppConfig,
    start_arg: Option<String>,
    direction_arg: Option<Direction>,
) -> Result<()> {
    let ledger = CsvLedger::open(&config.output.csv_path)?;
    let report = ledger.scan_existing();
    if let Some(last) = report.last_date {
        info!(
            "Found {} existing trips. Last: {}",
            report.rows,
            last.format("%b %d, %Y")
        );
    } else {
        info!("No dates found. {} rows in CSV.", report.rows);
    }
    let seen = SeenTrips::load(&config.output.seen_path)?;

    let page = DriverPage::connect(
        &config.portal.webdriver_url,
        Duration::from_millis(config.portal.wait_budget_ms),
    )
    .await?;
    page.navigate(&config.portal.activities_url).await?;

    let operator = StdinOperator;
    operator.confirm_ready()?;

    let today = Local::now().date_naive();
    let start = match start_arg.or_else(|| config.portal.start_date.clone()) {
        Some(s) => parse_start_date(&s, today.year()).unwrap_or_else(|| {
            info!("Could not parse '{}', using today.", s);
            today
        }),
        None => operator.start_date()?.unwrap_or(today),
    };
    let cursor = WeekCursor::containing(start);
    info!("Starting from Monday: {}", cursor.monday().format("%b %d, %Y"));

    let direction = direction_arg.unwrap_or(config.portal.direction);
    let navigator: Box<dyn WeekNavigator> = match direction {
        Direction::Forward => Box::new(AbsoluteNavigator::new(config.portal.activities_url.as_str())),
        Direction::Backward => Box::new(RelativeNavigator::new(config.portal.activities_url.as_str())),
    };

    let mut orchestrator = Orchestrator::new(
        &page,
        navigator.as_ref(),
        &operator,
        ledger,
        seen,
        Pacer::new(&config.pacing),
        direction,
        config.portal.activities_url.clone(),
    );
    let stats = orchestrator.run(cursor, today).await?;
    drop(orchestrator);

    println!();
    println!("{}", "=".repeat(50));
    println!(
        "{}! Weeks: {} | New trips: {} | Skipped: {} | Errors: {}",
        if stats.aborted { "STOPPED" } else { "DONE" },
        stats.weeks_visited,
        utils::fmt_count(stats.trips_scraped),
        stats.trips_skipped,
        stats.trip_errors,
    );
    println!("Saved: {:?}", config.output.csv_path);
    println!("{}", "=".repeat(50));

    page.close().await?;
    Ok(())
}

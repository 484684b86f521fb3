// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use tailfinder_core::{FlightQuery, MatchPolicy, ResponseFormat, TailFinder, TailFinderConfig, TailLookup};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Carrier code followed by flight number, e.g. AA1234
    flight: String,
    /// Origin airport, e.g. DFW
    origin: String,
    /// Departure date as MMDDYYYY
    date: String,

    /// Path to a JSON config file
    #[arg(short, long, env = "TAILFINDER_CONFIG")]
    config: Option<PathBuf>,

    /// How the departures portal answers: html or delimited
    #[arg(long)]
    format: Option<ResponseFormat>,

    /// Flight number comparison: exact or zero-padded
    #[arg(long = "match")]
    match_policy: Option<MatchPolicy>,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Cookie header for the registry, e.g. PHPSESSID=...
    #[arg(long, env = "TAILFINDER_REGISTRY_COOKIE")]
    registry_cookie: Option<String>,

    /// Print the full lookup result as JSON
    #[arg(long)]
    json: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("tailfinder")
        .build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config =
        TailFinderConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(format) = cli.format {
        config.departures.response_format = format;
    }
    if let Some(policy) = cli.match_policy {
        config.departures.match_policy = policy;
    }
    if let Some(secs) = cli.timeout {
        let timeout = (secs > 0).then_some(secs);
        config.departures.timeout_secs = timeout;
        config.registry.timeout_secs = timeout;
    }
    if let Some(cookie) = cli.registry_cookie {
        config.registry.session_cookie = Some(cookie);
    }

    let query = FlightQuery::parse(&cli.flight, &cli.origin, &cli.date)?;
    let finder = TailFinder::from_config(&config)?;
    let result = finder
        .lookup(&query)
        .with_context(|| format!("Lookup failed for {}", query))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(tail) = result.tail() {
        println!("{}", tail);
    }

    if let TailLookup::NotFound { flight_number } = &result {
        anyhow::bail!(
            "Flight {}{} not found in {} departures on {}",
            query.carrier,
            flight_number,
            query.origin,
            query.date.format("%m/%d/%Y")
        );
    }
    Ok(())
}

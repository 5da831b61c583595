//! `blackout-gate` CLI — check a deployment calendar before promoting.
//!
//! ## Usage
//!
//! ```sh
//! # Is a promotion allowed right now? (calendar on stdin)
//! curl -s https://example.com/freeze.ics | blackout-gate check
//!
//! # Evaluate at a fixed instant with a 30-minute lead time
//! blackout-gate check -i freeze.ics --now 2026-03-01T09:30:00Z --margin 1800
//!
//! # Report every conflicting window, not just one
//! blackout-gate check -i freeze.ics --all
//!
//! # Show the parsed calendar as JSON
//! blackout-gate list -i freeze.ics
//! ```
//!
//! `check` exits `0` when promotions may proceed, `2` when they are blocked,
//! and `1` on any error.

mod config;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use blackout_gate::{
    evaluate_detailed, find_blocking_events, parse_calendar, parse_instant, CalendarEvent,
    Evaluation, EvaluationRequest, EventCollection, Selection, Verdict,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const EXIT_BLOCKED: u8 = 2;

#[derive(Parser)]
#[command(
    name = "blackout-gate",
    version,
    about = "Decide from a calendar whether deployment promotions must be suspended"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true, env = "BLACKOUT_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the calendar and report whether promotions are blocked
    Check {
        /// Calendar file (falls back to the config file, then stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Format of the calendar input
        #[arg(long, value_enum, default_value_t = InputFormat::Ics)]
        format: InputFormat,
        /// Reference instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
        /// Advance margin in seconds (default 3600)
        #[arg(long, allow_negative_numbers = true)]
        margin: Option<i64>,
        /// Which conflicting event to report when several conflict
        #[arg(long, value_enum)]
        selection: Option<SelectionArg>,
        /// Also list every conflicting event
        #[arg(long)]
        all: bool,
    },
    /// Print the parsed calendar as JSON
    List {
        /// Calendar file (falls back to the config file, then stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Format of the calendar input
        #[arg(long, value_enum, default_value_t = InputFormat::Ics)]
        format: InputFormat,
        /// Include non-event records (todos, journals, ...)
        #[arg(long)]
        all_kinds: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// iCalendar (RFC 5545)
    Ics,
    /// JSON object of uid → record
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SelectionArg {
    EarliestStart,
    FirstFound,
}

impl From<SelectionArg> for Selection {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::EarliestStart => Selection::EarliestStart,
            SelectionArg::FirstFound => Selection::FirstFound,
        }
    }
}

/// JSON document written by `check`.
#[derive(Serialize)]
struct CheckReport<'a> {
    #[serde(flatten)]
    evaluation: Evaluation<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicts: Option<Vec<Conflict<'a>>>,
}

#[derive(Serialize)]
struct Conflict<'a> {
    uid: &'a str,
    event: &'a CalendarEvent,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    init_tracing(&config.logging.level, cli.json_logs || config.logging.json);

    match cli.command {
        Commands::Check {
            input,
            format,
            now,
            margin,
            selection,
            all,
        } => {
            let events = load_calendar(input.or(config.calendar.clone()), format)?;

            let now = match now {
                Some(raw) => parse_instant(&raw).context("Invalid --now")?,
                None => Utc::now(),
            };
            let request = EvaluationRequest::at(now)
                .with_margin(margin.unwrap_or(config.margin_seconds))
                .with_selection(selection.map(Selection::from).unwrap_or(config.selection));

            let evaluation =
                evaluate_detailed(&events, &request).context("Failed to evaluate calendar")?;
            let conflicts = if all {
                let found = find_blocking_events(&events, &request)
                    .context("Failed to evaluate calendar")?;
                Some(
                    found
                        .into_iter()
                        .map(|(uid, event)| Conflict { uid, event })
                        .collect(),
                )
            } else {
                None
            };

            match evaluation.verdict {
                Verdict::Blocked { uid, event } => tracing::info!(
                    uid,
                    summary = %event.summary,
                    "promotions blocked"
                ),
                Verdict::Clear => tracing::info!("promotions allowed"),
            }

            let report = CheckReport {
                evaluation,
                conflicts,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);

            if evaluation.is_blocked() {
                return Ok(ExitCode::from(EXIT_BLOCKED));
            }
        }
        Commands::List {
            input,
            format,
            all_kinds,
        } => {
            let events = load_calendar(input.or(config.calendar.clone()), format)?;
            let events = if all_kinds {
                events
            } else {
                events.events_only()
            };
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn load_calendar(path: Option<PathBuf>, format: InputFormat) -> Result<EventCollection> {
    let raw = read_input(path.as_deref())?;
    let events = match format {
        InputFormat::Ics => parse_calendar(&raw).context("Failed to parse calendar")?,
        InputFormat::Json => {
            serde_json::from_str(&raw).context("Failed to parse calendar JSON")?
        }
    };
    tracing::debug!(records = events.len(), "loaded calendar");
    Ok(events)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

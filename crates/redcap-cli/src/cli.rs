//! CLI argument definitions for the monitoring report.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "redcap-report",
    version,
    about = "Study-monitoring tables from REDCap exports",
    long_about = "Build study-monitoring tables from REDCap exports.\n\n\
                  Reads the display-term dictionary, the weekly participant export and\n\
                  the multi-instance event payload, then prints screening, consent,\n\
                  status, deviation and demographics tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build and print every monitoring table.
    Report(ReportArgs),

    /// List the display-term fields and their term counts.
    Terms(TermsArgs),
}

#[derive(Parser)]
pub struct ReportArgs {
    /// Display-term CSV (`api_field`, `api_value`, `display_text`).
    #[arg(long = "display-terms", value_name = "CSV")]
    pub display_terms: PathBuf,

    /// Weekly participant export.
    #[arg(long = "weekly", value_name = "CSV")]
    pub weekly: PathBuf,

    /// Multi-instance event payload; deviation tables are empty without it.
    #[arg(long = "events", value_name = "JSON")]
    pub events: Option<PathBuf>,

    /// Last day of the reporting window (default: today).
    #[arg(long = "report-date", value_name = "YYYY-MM-DD")]
    pub report_date: Option<NaiveDate>,

    /// Length of the reporting window in days.
    #[arg(long = "window-days", default_value_t = 7)]
    pub window_days: i64,

    /// Override the recent-consent range from the config.
    #[arg(long = "consent-days")]
    pub consent_days: Option<i64>,

    /// Override the recent-deviation range from the config.
    #[arg(long = "deviation-days")]
    pub deviation_days: Option<i64>,

    /// TOML file with `[snapshot]`, `[events]` and `[report]` tables.
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Also write each table as CSV into this directory.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct TermsArgs {
    /// Display-term CSV (`api_field`, `api_value`, `display_text`).
    #[arg(value_name = "CSV")]
    pub display_terms: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use comfy_table::Table;
use tracing::{info, info_span};

use redcap_cli::config::DashboardConfig;
use redcap_cli::export::export_tables;
use redcap_cli::render::apply_table_style;
use redcap_ingest::{EventTable, load_display_terms, load_multi_data, load_weekly_data};
use redcap_report::{ReportWindow, StudyReport};

use crate::cli::{ReportArgs, TermsArgs};

/// A built report and the CSV files written for it.
pub struct ReportRun {
    pub report: StudyReport,
    pub exported: Vec<PathBuf>,
}

pub fn run_terms(args: &TermsArgs) -> Result<()> {
    let dictionary = load_display_terms(&args.display_terms)
        .ok_or_else(|| anyhow!("failed to load {}", args.display_terms.display()))?;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Display Field", "Terms"]);
    apply_table_style(&mut table);
    for terms in dictionary.fields() {
        table.add_row(vec![
            terms.pair().raw().to_string(),
            terms.pair().display().to_string(),
            terms.len().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_report(args: &ReportArgs) -> Result<ReportRun> {
    let started = Instant::now();
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(days) = args.consent_days {
        config.report.consent_days_range = days;
    }
    if let Some(days) = args.deviation_days {
        config.report.deviation_days_range = days;
    }

    let report_date = args
        .report_date
        .unwrap_or_else(|| Local::now().date_naive());
    let end = report_date
        .and_hms_opt(23, 59, 59)
        .context("build report end time")?;
    let window = ReportWindow::ending_at(end, args.window_days).context("reporting window")?;
    let span = info_span!("report", date = %report_date);
    let _guard = span.enter();

    // Each loader logs its own failure; `None` only needs a path here.
    let dictionary = load_display_terms(&args.display_terms)
        .ok_or_else(|| anyhow!("failed to load {}", args.display_terms.display()))?;
    let snapshot = load_weekly_data(&args.weekly, &dictionary, &config.snapshot)
        .ok_or_else(|| anyhow!("failed to load {}", args.weekly.display()))?;
    let events = match &args.events {
        Some(path) => load_multi_data(path, &config.events)
            .ok_or_else(|| anyhow!("failed to load {}", path.display()))?,
        None => EventTable::default(),
    };

    let report = StudyReport::build(&snapshot, &events, &dictionary, window, &config.report)
        .context("build report tables")?;
    let exported = match &args.output_dir {
        Some(dir) => export_tables(&report.tables(), dir)?,
        None => Vec::new(),
    };
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        exported = exported.len(),
        "report complete"
    );
    Ok(ReportRun { report, exported })
}

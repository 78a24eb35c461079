//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `custpulse preview` - parse CSV files and list the records
//! - `custpulse analyze` - run one analysis and print the dashboard
//! - `custpulse histogram` - distribution of one numeric column
//! - `custpulse export` - re-emit normalized CSV
//! - `custpulse history` - past analysis attempts from the run log
//! - `custpulse health` - credential, config and log status
//! - `custpulse config show|init|set|path` - configuration management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::analytics::histogram::{self, Bin};
use crate::analytics::logger::{self, AnalysisLogEntry};
use crate::analytics::reporter::{Dashboard, LabelCount};
use crate::config;
use crate::config::schema::CustpulseConfig;
use crate::llm::gemini::GeminiClient;
use crate::records::{Column, CustomerDraft, CustomerRecord, csv};
use crate::state::Controller;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Parse every file in order and concatenate the rows.
fn load_files(files: &[PathBuf]) -> Result<Vec<CustomerRecord>> {
    let mut records = Vec::new();
    for file in files {
        let parsed = csv::parse_csv_file(file)
            .with_context(|| format!("failed to load {}", file.display()))?;
        records.extend(parsed);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// custpulse preview
// ---------------------------------------------------------------------------

pub fn run_preview(files: &[PathBuf], format: OutputFormat) -> Result<()> {
    let records = load_files(files)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Csv => print!("{}", csv::to_csv(&records)),
        OutputFormat::Table => print_records_table(&records),
    }
    Ok(())
}

fn print_records_table(records: &[CustomerRecord]) {
    println!(
        "{}",
        format!("Customers Ready for Analysis ({})", records.len())
            .bold()
            .cyan()
    );
    println!("{}", "=".repeat(72));
    println!(
        "  {:<12} {:>5} {:<8} {:>10} {:>7} {:>6} Preferences",
        "Customer ID", "Age", "Gender", "Purchases", "Visits", "Pages"
    );
    println!("  {}", "-".repeat(70));

    for (i, r) in records.iter().enumerate() {
        let line = format!(
            "  {:<12} {:>5} {:<8} {:>10} {:>7} {:>6} {}",
            truncate(&r.customer_id, 12),
            r.text(Column::Age),
            truncate(&r.text(Column::Gender), 8),
            r.text(Column::TotalPurchaseAmount),
            r.text(Column::VisitFrequency),
            r.text(Column::PagesVisited),
            truncate(&r.text(Column::ProductPreferences), 24),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

// ---------------------------------------------------------------------------
// custpulse analyze
// ---------------------------------------------------------------------------

/// Load records from files and `--customer` entries, analyze them, and print
/// the dashboard.
pub fn run_analyze(files: &[PathBuf], customers: &[String], format: OutputFormat) -> Result<()> {
    let config = config::load();
    let mut controller = Controller::new();

    controller.add_records(load_files(files)?);
    for entry in customers {
        let draft = CustomerDraft::parse_inline(entry)
            .with_context(|| format!("invalid --customer value: {entry}"))?;
        let record = draft
            .commit()
            .with_context(|| format!("invalid --customer value: {entry}"))?;
        controller.add_customer(record);
    }

    let client = GeminiClient::from_config(&config.analysis);
    if format == OutputFormat::Table {
        println!(
            "{} {} customer(s) with {}...",
            "Analyzing".bold(),
            controller.records().len(),
            config.analysis.model
        );
    }

    if controller.run_analysis(&client, &config.logging).is_err() {
        let banner = controller.error_banner().unwrap_or_default().to_string();
        bail!(banner);
    }

    let dashboard = controller.dashboard(&config.dashboard.options());
    match format {
        OutputFormat::Json | OutputFormat::Csv => {
            println!("{}", serde_json::to_string_pretty(&dashboard)?)
        }
        OutputFormat::Table => print_dashboard(&dashboard),
    }
    Ok(())
}

fn print_dashboard(dashboard: &Dashboard) {
    println!();
    println!("{}", "Customer Behavior Dashboard".bold().cyan());
    println!("{}", "=".repeat(60));
    let k = &dashboard.kpi_display;
    println!("  {} {}", "Customers analyzed:  ".bold(), k.analyzed_count);
    println!("  {} {}", "Avg purchase value:  ".bold(), k.avg_purchase_value);
    println!("  {} {}", "Avg visit frequency: ".bold(), k.avg_visit_frequency);
    println!("  {} {}", "High churn risk:     ".bold(), k.high_churn_share);
    println!();

    print_counts("Customer Segments", &dashboard.segments);

    if !dashboard.scatter.is_empty() {
        println!("{}", "Purchase Score vs. Churn Risk".bold().cyan());
        for series in &dashboard.scatter {
            let points = series
                .points
                .iter()
                .map(|p| format!("{}({:.0}, {:.0})", p.customer_id, p.x, p.y))
                .collect::<Vec<_>>()
                .join("  ");
            println!("  {:<20} {}", truncate(&series.segment, 20).bold(), points);
        }
        println!();
    }

    print_counts("Top Product Preferences", &dashboard.top_preferences);

    for dist in &dashboard.distributions {
        if dist.bins.is_empty() {
            continue;
        }
        println!("{}", dist.title.bold().cyan());
        print_bins(&dist.bins);
        println!();
    }

    println!("{}", "Analysis Results".bold().cyan());
    println!(
        "  {:<12} {:>8} {:>8} {:<20} Next Best Action",
        "Customer ID", "Purchase", "Churn", "Segment"
    );
    println!("  {}", "-".repeat(70));
    for (i, row) in dashboard.results.iter().enumerate() {
        let r = &row.result;
        let churn = format!("{:>8}", r.churn_risk);
        let churn = if row.high_churn {
            churn.red().to_string()
        } else {
            churn
        };
        let line = format!(
            "  {:<12} {:>8} {} {:<20} {}",
            truncate(&r.customer_id, 12),
            r.purchase_score,
            churn,
            truncate(&r.segment, 20),
            r.next_best_action,
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_counts(title: &str, counts: &[LabelCount]) {
    if counts.is_empty() {
        return;
    }
    println!("{}", title.bold().cyan());
    let widest = counts.iter().map(|c| c.count).max().unwrap_or(1).max(1);
    for c in counts {
        println!(
            "  {:<24} {:>4} {}",
            truncate(&c.label, 24),
            c.count,
            bar(c.count, widest).green()
        );
    }
    println!();
}

fn print_bins(bins: &[Bin]) {
    let widest = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1);
    for b in bins {
        println!("  {:<16} {:>4} {}", b.label, b.count, bar(b.count, widest).blue());
    }
}

fn bar(count: usize, widest: usize) -> String {
    "█".repeat((count * 30).div_ceil(widest))
}

// ---------------------------------------------------------------------------
// custpulse histogram
// ---------------------------------------------------------------------------

pub fn run_histogram(file: &Path, column: &str, bins: Option<usize>) -> Result<()> {
    let column = Column::from_name(column)
        .with_context(|| format!("unknown column: {column}"))?;
    if !column.is_numeric() {
        bail!("column \"{}\" is not numeric", column.header());
    }

    let records = load_files(&[file.to_path_buf()])?;
    let bins = bins.unwrap_or_else(|| config::load().dashboard.bins);
    let sample: Vec<Option<f64>> = records.iter().map(|r| r.number(column)).collect();
    let result = histogram::bin(&sample, bins);

    if result.is_empty() {
        println!(
            "{}",
            format!("No numeric values in \"{}\".", column.header()).yellow()
        );
        return Ok(());
    }

    println!("{}", format!("{} Distribution", column.header()).bold().cyan());
    print_bins(&result);
    Ok(())
}

// ---------------------------------------------------------------------------
// custpulse export
// ---------------------------------------------------------------------------

pub fn run_export(files: &[PathBuf]) -> Result<()> {
    let records = load_files(files)?;
    print!("{}", csv::to_csv(&records));
    Ok(())
}

// ---------------------------------------------------------------------------
// custpulse history
// ---------------------------------------------------------------------------

/// Show recent analysis attempts from the run log.
pub fn run_history(format: OutputFormat, days: Option<u32>) -> Result<()> {
    let config = config::load();
    let entries = logger::read_entries_since_days(&config.logging, days);

    if entries.is_empty() {
        println!("{}", "No analysis runs logged yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => print_history_csv(&entries),
        OutputFormat::Table => print_history_table(&entries),
    }
    Ok(())
}

fn print_history_table(entries: &[AnalysisLogEntry]) {
    let succeeded = entries.iter().filter(|e| e.success).count();
    println!("{}", "Analysis History".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {} {} ({} succeeded)",
        "Runs:".bold(),
        entries.len(),
        succeeded
    );
    println!();
    println!(
        "  {:<20} {:>6} {:>8} {:>9} Outcome",
        "Time", "Batch", "Results", "Latency"
    );
    println!("  {}", "-".repeat(58));
    for e in entries {
        let time = truncate(&e.timestamp.replace('T', " "), 19);
        let latency = e
            .latency_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let outcome = if e.success {
            "ok".green()
        } else {
            e.error_kind.as_deref().unwrap_or("failed").red()
        };
        println!(
            "  {:<20} {:>6} {:>8} {:>9} {}",
            time, e.batch_size, e.result_count, latency, outcome
        );
    }
}

fn print_history_csv(entries: &[AnalysisLogEntry]) {
    println!("timestamp,model,batch_size,result_count,success,latency_ms,error_kind");
    for e in entries {
        println!(
            "{},{},{},{},{},{},{}",
            e.timestamp,
            e.model,
            e.batch_size,
            e.result_count,
            e.success,
            e.latency_ms.map(|ms| ms.to_string()).unwrap_or_default(),
            e.error_kind.as_deref().unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// custpulse health
// ---------------------------------------------------------------------------

pub fn run_health() -> Result<()> {
    println!("{}", "custpulse Health Check".bold().cyan());
    println!("{}", "=".repeat(50));

    let config = config::load();
    print_health_item("Config", true, &config_sources_summary());

    let key_ok = config.analysis.api_key().is_some();
    print_health_item(
        "API key",
        key_ok,
        if key_ok {
            "configured"
        } else {
            "missing (set CUSTPULSE_API_KEY or GEMINI_API_KEY)"
        },
    );
    print_health_item("Model", true, &config.analysis.model);
    print_health_item("Endpoint", true, &config.analysis.base_url);

    let log_path = logger::analysis_log_path(&config.logging);
    let log_exists = log_path.as_ref().map(|p| p.exists()).unwrap_or(false);
    let detail = match (&log_path, log_exists, config.logging.enabled) {
        (_, _, false) => "disabled".to_string(),
        (Some(_), true, _) => format!("{} entries", logger::read_all_entries(&config.logging).len()),
        (Some(p), false, _) => format!("no log file yet ({})", p.display()),
        (None, _, _) => "no home directory".to_string(),
    };
    print_health_item("Run log", log_exists || !config.logging.enabled, &detail);

    Ok(())
}

fn config_sources_summary() -> String {
    let exists = |p: Option<PathBuf>| p.map(|p| p.exists()).unwrap_or(false);
    match (
        exists(config::global_config_file()),
        exists(config::project_config_file()),
    ) {
        (false, false) => "built-in defaults".to_string(),
        (true, false) => "~/.custpulse/config.toml".to_string(),
        (false, true) => ".custpulse.toml".to_string(),
        (true, true) => "~/.custpulse/config.toml + .custpulse.toml".to_string(),
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<12} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// custpulse config show | init | set | path
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective custpulse Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let effective: CustpulseConfig = config::load();
    println!(
        "  {} {}",
        "API key:".bold(),
        if effective.analysis.api_key().is_some() {
            "set (hidden)".green()
        } else {
            "not set".yellow()
        }
    );
    println!();
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.custpulse/config.toml", config::global_config_file()),
        (".custpulse.toml", config::project_config_file()),
    ] {
        if path.map(|p| p.exists()).unwrap_or(false) {
            println!("  {} {}", "✓".green(), label.dimmed());
        } else {
            println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
        }
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "CUSTPULSE_* environment variables".dimmed()
    );

    Ok(())
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Edit the file to customize custpulse.".dimmed());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

pub fn run_config_path() -> Result<()> {
    let path = config::global_config_file().context("could not determine home directory")?;
    println!("{}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Analysis log entry (JSONL)
// ---------------------------------------------------------------------------

/// One line of the run log (`~/.custpulse/analysis-log.jsonl`).
///
/// Records the outcome of an analysis attempt. No customer data is written:
/// only sizes, timing and the error kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisLogEntry {
    pub timestamp: String,
    pub model: String,
    /// Number of customers submitted.
    pub batch_size: usize,
    /// Number of results accepted (0 on failure).
    #[serde(default)]
    pub result_count: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
    /// [`crate::error::AnalysisError::kind`] when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<String>,
}

impl AnalysisLogEntry {
    pub fn new(model: &str, batch_size: usize) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            model: model.to_string(),
            batch_size,
            result_count: 0,
            success: false,
            latency_ms: None,
            error_kind: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry to the run log. Best-effort: failures are ignored.
pub fn log_analysis(config: &LoggingConfig, entry: &AnalysisLogEntry) {
    if !config.enabled {
        return;
    }
    let _ = append_log_entry(config, entry);
}

fn append_log_entry(config: &LoggingConfig, entry: &AnalysisLogEntry) -> Result<()> {
    let Some(path) = analysis_log_path(config) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every entry, skipping malformed lines. Missing file → empty.
pub fn read_all_entries(config: &LoggingConfig) -> Vec<AnalysisLogEntry> {
    let Some(path) = analysis_log_path(config) else {
        return Vec::new();
    };

    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<AnalysisLogEntry>(&line).ok())
        .collect()
}

/// Entries from the last `days` days, or all of them for `None`.
pub fn read_entries_since_days(config: &LoggingConfig, days: Option<u32>) -> Vec<AnalysisLogEntry> {
    let entries = read_all_entries(config);

    let Some(days) = days else {
        return entries;
    };

    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
    entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .collect()
}

/// Resolved path of the run log.
pub fn analysis_log_path(config: &LoggingConfig) -> Option<PathBuf> {
    match &config.log_path {
        Some(path) => Some(PathBuf::from(path)),
        None => crate::config::data_dir().map(|dir| dir.join("analysis-log.jsonl")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> LoggingConfig {
        let path = std::env::temp_dir()
            .join(format!("custpulse-log-{}", std::process::id()))
            .join(name);
        let _ = fs::remove_file(&path);
        LoggingConfig {
            enabled: true,
            log_path: Some(path.display().to_string()),
        }
    }

    #[test]
    fn appends_and_reads_back_entries() {
        let config = temp_config("roundtrip.jsonl");
        let mut ok = AnalysisLogEntry::new("gemini-2.5-flash", 3);
        ok.success = true;
        ok.result_count = 3;
        ok.latency_ms = Some(420);
        let mut failed = AnalysisLogEntry::new("gemini-2.5-flash", 3);
        failed.error_kind = Some("response_shape".to_string());

        log_analysis(&config, &ok);
        log_analysis(&config, &failed);

        let entries = read_all_entries(&config);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert_eq!(entries[0].latency_ms, Some(420));
        assert_eq!(entries[1].error_kind.as_deref(), Some("response_shape"));
    }

    #[test]
    fn disabled_logging_writes_nothing() {
        let mut config = temp_config("disabled.jsonl");
        config.enabled = false;
        log_analysis(&config, &AnalysisLogEntry::new("m", 1));
        assert!(read_all_entries(&config).is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let config = temp_config("malformed.jsonl");
        let path = analysis_log_path(&config).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json\n").unwrap();
        log_analysis(&config, &AnalysisLogEntry::new("m", 2));
        let entries = read_all_entries(&config);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].batch_size, 2);
    }

    #[test]
    fn day_window_keeps_recent_entries() {
        let config = temp_config("window.jsonl");
        log_analysis(&config, &AnalysisLogEntry::new("m", 1));
        assert_eq!(read_entries_since_days(&config, Some(1)).len(), 1);
        assert_eq!(read_entries_since_days(&config, None).len(), 1);
    }
}

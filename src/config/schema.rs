/// Configuration schema and defaults for custpulse.
///
/// Defines the TOML-serializable configuration structure with the
/// `[analysis]`, `[dashboard]` and `[logging]` sections. Every field has a
/// built-in default; users only set what they want to change.
use serde::{Deserialize, Serialize};

use crate::analytics::histogram::DEFAULT_BINS;
use crate::analytics::reporter::{DashboardOptions, HIGH_CHURN_THRESHOLD, TOP_PREFERENCES};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level custpulse configuration.
///
/// Maps to `~/.custpulse/config.toml` and `.custpulse.toml`. Missing
/// sections and fields fall back to the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustpulseConfig {
    pub analysis: AnalysisConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [analysis]
// ---------------------------------------------------------------------------

/// Settings for the generative-AI analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Service credential. Usually supplied through the environment; never
    /// written back out by `config show` or `config set`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name, e.g. `"gemini-2.5-flash"`.
    pub model: String,
    /// API base URL (no trailing slash needed).
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout in milliseconds. `0` leaves the request unbounded.
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.2,
            timeout_ms: 0,
        }
    }
}

impl AnalysisConfig {
    /// The credential, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Histogram bin count for the behavior distributions.
    pub bins: usize,
    /// Number of preference tags shown.
    pub top_preferences: usize,
    /// Churn-risk percentage above which a customer counts as high risk.
    pub high_churn_threshold: f64,
    /// Listen address for `custpulse web`.
    pub addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            top_preferences: TOP_PREFERENCES,
            high_churn_threshold: HIGH_CHURN_THRESHOLD,
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn options(&self) -> DashboardOptions {
        DashboardOptions {
            bins: self.bins.max(1),
            top_preferences: self.top_preferences,
            high_churn_threshold: self.high_churn_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Run-log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append one JSONL line per analysis attempt.
    pub enabled: bool,
    /// Override for `~/.custpulse/analysis-log.jsonl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl CustpulseConfig {
    /// Annotated default config file content, written by `config init`.
    pub fn default_toml() -> String {
        r#"# custpulse configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (CUSTPULSE_*, GEMINI_API_KEY, API_KEY)
#   2. Project config (.custpulse.toml in current directory)
#   3. User global config (~/.custpulse/config.toml)
#   4. Built-in defaults
#
# The API key is best supplied via CUSTPULSE_API_KEY or GEMINI_API_KEY.

[analysis]
model = "gemini-2.5-flash"
base_url = "https://generativelanguage.googleapis.com"
temperature = 0.2
timeout_ms = 0                 # 0 = no local timeout

[dashboard]
bins = 5                       # histogram bins for distributions
top_preferences = 10
high_churn_threshold = 60.0    # percent; strictly greater counts as high
addr = "127.0.0.1:9747"

[logging]
enabled = true                 # ~/.custpulse/analysis-log.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_constants() {
        let config = CustpulseConfig::default();
        assert_eq!(config.dashboard.bins, 5);
        assert_eq!(config.dashboard.top_preferences, 10);
        assert_eq!(config.dashboard.high_churn_threshold, 60.0);
        assert!(config.logging.enabled);
        assert!(config.analysis.api_key().is_none());
    }

    #[test]
    fn default_toml_parses_back() {
        let config: CustpulseConfig = toml::from_str(&CustpulseConfig::default_toml()).unwrap();
        assert_eq!(config.analysis.model, "gemini-2.5-flash");
        assert_eq!(config.analysis.timeout_ms, 0);
        assert_eq!(config.dashboard.addr, "127.0.0.1:9747");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: CustpulseConfig = toml::from_str("[dashboard]\nbins = 8\n").unwrap();
        assert_eq!(config.dashboard.bins, 8);
        assert_eq!(config.dashboard.top_preferences, 10);
        assert_eq!(config.analysis.temperature, 0.2);
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = CustpulseConfig::default();
        config.analysis.api_key = Some("secret".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("secret"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AnalysisConfig {
            api_key: Some("   ".to_string()),
            ..AnalysisConfig::default()
        };
        assert!(config.api_key().is_none());
    }
}

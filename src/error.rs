//! Error taxonomy for custpulse.
//!
//! Every component below the view-state controller reports failures through
//! one of these types. Only [`crate::state::Controller`] turns them into
//! user-facing messages.

use thiserror::Error;

/// CSV upload failures. Never affects records that were already loaded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unknown CSV header: \"{header}\". Expected headers: {expected}")]
    UnknownHeader { header: String, expected: String },

    #[error("CSV file must contain a header row and at least one data row.")]
    MissingRows,

    #[error("Row {row} has {actual} columns, expected {expected}.")]
    ColumnCount {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Row {row} is missing Customer ID.")]
    MissingCustomerId { row: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Manual-entry failures. The form keeps the values the user typed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Customer ID is required.")]
    MissingCustomerId,

    #[error("{field} must be a number, got \"{value}\".")]
    InvalidNumber { field: String, value: String },

    #[error("Unknown field \"{0}\".")]
    UnknownField(String),
}

/// Problems with the shape of an otherwise valid JSON response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseShapeError {
    #[error("AI response was not in the expected array format.")]
    NotAnArray,

    #[error("AI response item {index} is not an object.")]
    NotAnObject { index: usize },

    #[error("AI response item {index} ({customer_id}) is missing required fields: {}", .missing.join(", "))]
    MissingFields {
        index: usize,
        customer_id: String,
        missing: Vec<String>,
    },
}

/// Failures of the analyze action.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("API key is not configured (set CUSTPULSE_API_KEY or GEMINI_API_KEY)")]
    Configuration,

    #[error("No customer data to analyze. Please upload a CSV or add data manually.")]
    EmptyBatch,

    #[error("an analysis request is already running")]
    AnalysisInFlight,

    #[error("AI response is not valid JSON: {0}")]
    ResponseFormat(#[from] serde_json::Error),

    #[error(transparent)]
    ResponseShape(#[from] ResponseShapeError),

    #[error("AI response does not match the submitted customers ({})", describe_mismatch(.missing, .unexpected, .duplicates))]
    Reconciliation {
        missing: Vec<String>,
        unexpected: Vec<String>,
        duplicates: Vec<String>,
    },

    #[error("inference service error: {0}")]
    Service(String),
}

impl AnalysisError {
    /// Short machine-readable kind, used by the run log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::EmptyBatch => "empty_batch",
            Self::AnalysisInFlight => "in_flight",
            Self::ResponseFormat(_) => "response_format",
            Self::ResponseShape(_) => "response_shape",
            Self::Reconciliation { .. } => "reconciliation",
            Self::Service(_) => "service",
        }
    }
}

fn describe_mismatch(missing: &[String], unexpected: &[String], duplicates: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing: {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unexpected: {}", unexpected.join(", ")));
    }
    if !duplicates.is_empty() {
        parts.push(format!("duplicated: {}", duplicates.join(", ")));
    }
    parts.join("; ")
}

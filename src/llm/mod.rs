/// Predictive analysis via an external generative-AI service.
///
/// One call per batch: the full customer list is serialized into a single
/// prompt, the service answers with a JSON array of per-customer
/// predictions, and the answer is validated before anyone sees it.
///
/// # Pipeline
///
/// 1. **Preconditions** - a credential must be configured and the batch must
///    be non-empty. Both are checked before any request goes out.
/// 2. **Prompt** - [`prompts::build_prompt`] embeds the sanitized records.
/// 3. **Call** - an [`InferenceService`] (in production
///    [`gemini::GeminiClient`]) returns the raw response text.
/// 4. **Validation** - [`validation::parse_response`] strips a stray code
///    fence, parses, and checks every element; then
///    [`validation::reconcile`] matches result IDs against the batch.
///
/// There is no retry and no caching. Any failure is returned as a single
/// [`AnalysisError`].
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub mod gemini;
pub mod prompts;
pub mod validation;

use crate::analytics::logger::{self, AnalysisLogEntry};
use crate::config::schema::LoggingConfig;
use crate::error::AnalysisError;
use crate::records::CustomerRecord;

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Predictions for one customer, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub customer_id: String,
    /// Percentage string, e.g. `"82%"`.
    pub purchase_score: String,
    /// Percentage string, e.g. `"15%"`.
    pub churn_risk: String,
    pub segment: String,
    pub next_best_action: String,
}

impl AnalysisResult {
    /// Purchase score as a number (0 when unparseable).
    pub fn purchase_score_value(&self) -> f64 {
        parse_percentage(&self.purchase_score)
    }

    /// Churn risk as a number (0 when unparseable).
    pub fn churn_risk_value(&self) -> f64 {
        parse_percentage(&self.churn_risk)
    }
}

/// `"82%"` → `82.0`. Anything that is not a finite number yields `0.0`.
pub fn parse_percentage(value: &str) -> f64 {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// An opaque prompt-in, text-out inference backend.
pub trait InferenceService {
    /// Model name, for logging.
    fn model_name(&self) -> &str;

    /// Whether a credential is available. Checked before every request.
    fn has_credential(&self) -> bool;

    /// Send one prompt and return the raw response text.
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError>;
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Analyze a batch of customers with a single service call.
pub fn analyze_batch(
    service: &dyn InferenceService,
    records: &[CustomerRecord],
) -> Result<Vec<AnalysisResult>, AnalysisError> {
    if !service.has_credential() {
        return Err(AnalysisError::Configuration);
    }
    if records.is_empty() {
        return Err(AnalysisError::EmptyBatch);
    }

    let prompt = prompts::build_prompt(records);
    let raw = service.generate(&prompt)?;

    let results = validation::parse_response(&raw)?;
    validation::reconcile(records, &results)?;
    Ok(results)
}

/// [`analyze_batch`] plus timing and one run-log line.
pub fn analyze_and_log(
    service: &dyn InferenceService,
    records: &[CustomerRecord],
    logging: &LoggingConfig,
) -> Result<Vec<AnalysisResult>, AnalysisError> {
    let mut entry = AnalysisLogEntry::new(service.model_name(), records.len());

    let start = Instant::now();
    let outcome = analyze_batch(service, records);
    entry.latency_ms = Some(start.elapsed().as_millis() as u64);

    match &outcome {
        Ok(results) => {
            entry.success = true;
            entry.result_count = results.len();
        }
        Err(e) => entry.error_kind = Some(e.kind().to_string()),
    }
    logger::log_analysis(logging, &entry);

    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakeService {
        credential: bool,
        response: Result<String, String>,
        calls: Cell<usize>,
        last_prompt: RefCell<String>,
    }

    impl FakeService {
        fn replying(text: &str) -> Self {
            Self {
                credential: true,
                response: Ok(text.to_string()),
                calls: Cell::new(0),
                last_prompt: RefCell::new(String::new()),
            }
        }
    }

    impl InferenceService for FakeService {
        fn model_name(&self) -> &str {
            "fake"
        }

        fn has_credential(&self) -> bool {
            self.credential
        }

        fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_prompt.borrow_mut() = prompt.to_string();
            self.response.clone().map_err(AnalysisError::Service)
        }
    }

    const ONE_RESULT: &str = r#"[{"customerId":"C1","purchaseScore":"82%","churnRisk":"10%","segment":"Loyal Buyer","nextBestAction":"Recommend new arrivals"}]"#;

    #[test]
    fn parse_percentage_handles_variants() {
        assert_eq!(parse_percentage("82%"), 82.0);
        assert_eq!(parse_percentage(" 7.5 % "), 7.5);
        assert_eq!(parse_percentage("45"), 45.0);
        assert_eq!(parse_percentage("high"), 0.0);
    }

    #[test]
    fn missing_credential_fails_before_any_call() {
        let mut service = FakeService::replying(ONE_RESULT);
        service.credential = false;
        let err = analyze_batch(&service, &[CustomerRecord::new("C1")]).unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration));
        assert_eq!(service.calls.get(), 0);
    }

    #[test]
    fn empty_batch_fails_before_any_call() {
        let service = FakeService::replying(ONE_RESULT);
        let err = analyze_batch(&service, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyBatch));
        assert_eq!(service.calls.get(), 0);
    }

    #[test]
    fn successful_batch_returns_results() {
        let service = FakeService::replying(ONE_RESULT);
        let results = analyze_batch(&service, &[CustomerRecord::new("C1")]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].segment, "Loyal Buyer");
        assert_eq!(service.calls.get(), 1);
        assert!(service.last_prompt.borrow().contains("\"customerId\": \"C1\""));
    }

    #[test]
    fn service_errors_propagate_unchanged() {
        let mut service = FakeService::replying("");
        service.response = Err("quota exceeded".to_string());
        let err = analyze_batch(&service, &[CustomerRecord::new("C1")]).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(service.calls.get(), 1);
    }

    #[test]
    fn object_response_is_a_shape_error() {
        let service = FakeService::replying(r#"{"customerId":"C1"}"#);
        let err = analyze_batch(&service, &[CustomerRecord::new("C1")]).unwrap_err();
        assert!(matches!(err, AnalysisError::ResponseShape(_)));
    }

    #[test]
    fn analyze_and_log_writes_one_entry() {
        let path = std::env::temp_dir()
            .join(format!("custpulse-llm-{}", std::process::id()))
            .join("log.jsonl");
        let _ = std::fs::remove_file(&path);
        let logging = LoggingConfig {
            enabled: true,
            log_path: Some(path.display().to_string()),
        };

        let service = FakeService::replying("not json");
        assert!(analyze_and_log(&service, &[CustomerRecord::new("C1")], &logging).is_err());

        let entries = logger::read_all_entries(&logging);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
        assert_eq!(entries[0].error_kind.as_deref(), Some("response_format"));
        assert_eq!(entries[0].batch_size, 1);
    }
}

//! JSON API handlers for the web dashboard.
//!
//! Each handler takes the server's [`WebState`] and returns an [`ApiReply`];
//! the server turns replies into HTTP responses. Failures are reported as
//! `{"error": "..."}` with a 4xx/5xx status.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::analytics::logger;
use crate::config::schema::CustpulseConfig;
use crate::error::AnalysisError;
use crate::llm::InferenceService;
use crate::records::{CustomerDraft, ManualEntryForm};
use crate::state::{Controller, View};

/// Everything the server holds between requests.
pub struct WebState {
    pub controller: Controller,
    pub config: CustpulseConfig,
    pub service: Box<dyn InferenceService>,
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.body {
            map.insert(key.to_string(), value);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ViewRequest {
    view: View,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    model: String,
    base_url: String,
    api_key_configured: bool,
    logging_enabled: bool,
    high_churn_threshold: f64,
    log_entries: usize,
    records: usize,
    results: usize,
}

fn snapshot(state: &WebState) -> Value {
    let snapshot = state
        .controller
        .snapshot(state.config.dashboard.high_churn_threshold);
    serde_json::to_value(snapshot).unwrap_or(Value::Null)
}

/// HTTP status for a failed analysis.
fn analysis_status(error: &AnalysisError) -> u16 {
    match error {
        AnalysisError::EmptyBatch => 400,
        AnalysisError::AnalysisInFlight => 409,
        AnalysisError::Configuration => 500,
        AnalysisError::ResponseFormat(_)
        | AnalysisError::ResponseShape(_)
        | AnalysisError::Reconciliation { .. }
        | AnalysisError::Service(_) => 502,
    }
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/state` - the whole session.
pub fn get_state(state: &WebState) -> ApiReply {
    ApiReply::ok(snapshot(state))
}

/// `POST /api/customers/csv` - raw CSV text in the body; rows are appended.
pub fn post_customers_csv(state: &mut WebState, body: &str) -> ApiReply {
    match state.controller.load_csv(body) {
        Ok(added) => ApiReply::ok(json!({ "added": added, "state": snapshot(state) })),
        Err(e) => ApiReply::error(400, &e.to_string()).with("state", snapshot(state)),
    }
}

/// `POST /api/customers` - one draft as JSON (all fields strings).
///
/// On a validation failure the draft is echoed back so the form keeps its
/// values.
pub fn post_customer(state: &mut WebState, body: &str) -> ApiReply {
    let draft: CustomerDraft = match serde_json::from_str(body) {
        Ok(d) => d,
        Err(e) => return ApiReply::error(400, &format!("invalid customer JSON: {e}")),
    };

    let mut form = ManualEntryForm::new(draft);
    match state.controller.submit_manual(&mut form) {
        Ok(()) => ApiReply::ok(json!({ "state": snapshot(state) })),
        Err(e) => ApiReply::error(422, &e.to_string())
            .with("draft", serde_json::to_value(&form.draft).unwrap_or(Value::Null)),
    }
}

/// `POST /api/analyze` - run one analysis over the current batch.
pub fn post_analyze(state: &mut WebState) -> ApiReply {
    let outcome = state
        .controller
        .run_analysis(state.service.as_ref(), &state.config.logging);

    match outcome {
        Ok(()) => {
            let dashboard = state.controller.dashboard(&state.config.dashboard.options());
            ApiReply::ok(json!({
                "state": snapshot(state),
                "dashboard": serde_json::to_value(&dashboard).unwrap_or(Value::Null),
            }))
        }
        Err(e) => {
            let message = state
                .controller
                .error_banner()
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string());
            ApiReply::error(analysis_status(&e), &message)
                .with("kind", Value::from(e.kind()))
                .with("state", snapshot(state))
        }
    }
}

/// `POST /api/clear` - drop records and results.
pub fn post_clear(state: &mut WebState) -> ApiReply {
    state.controller.clear();
    ApiReply::ok(snapshot(state))
}

/// `PUT /api/view` - `{"view": "input" | "dashboard"}`.
pub fn put_view(state: &mut WebState, body: &str) -> ApiReply {
    match serde_json::from_str::<ViewRequest>(body) {
        Ok(req) => {
            state.controller.set_view(req.view);
            ApiReply::ok(snapshot(state))
        }
        Err(e) => ApiReply::error(400, &format!("invalid view request: {e}")),
    }
}

/// `GET /api/dashboard` - KPIs and chart series for the current data.
pub fn get_dashboard(state: &WebState) -> ApiReply {
    let dashboard = state.controller.dashboard(&state.config.dashboard.options());
    match serde_json::to_value(&dashboard) {
        Ok(v) => ApiReply::ok(v),
        Err(e) => ApiReply::error(500, &format!("failed to serialize dashboard: {e}")),
    }
}

/// `GET /api/health` - configuration and session summary.
pub fn get_health(state: &WebState) -> ApiReply {
    let resp = HealthResponse {
        model: state.service.model_name().to_string(),
        base_url: state.config.analysis.base_url.clone(),
        api_key_configured: state.service.has_credential(),
        logging_enabled: state.config.logging.enabled,
        high_churn_threshold: state.config.dashboard.high_churn_threshold,
        log_entries: logger::read_all_entries(&state.config.logging).len(),
        records: state.controller.records().len(),
        results: state.controller.results().len(),
    };
    ApiReply::ok(serde_json::to_value(&resp).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LoggingConfig;

    struct Canned(&'static str);

    impl InferenceService for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }
        fn has_credential(&self) -> bool {
            true
        }
        fn generate(&self, _prompt: &str) -> Result<String, AnalysisError> {
            Ok(self.0.to_string())
        }
    }

    fn state(reply: &'static str) -> WebState {
        let mut config = CustpulseConfig::default();
        config.logging = LoggingConfig {
            enabled: false,
            log_path: None,
        };
        WebState {
            controller: Controller::new(),
            config,
            service: Box::new(Canned(reply)),
        }
    }

    const TWO_RESULTS: &str = r#"```json
[{"customerId":"A","purchaseScore":"80%","churnRisk":"70%","segment":"At-Risk","nextBestAction":"Re-engagement email"},
 {"customerId":"B","purchaseScore":"40%","churnRisk":"10%","segment":"Loyal Buyer","nextBestAction":"Recommend new arrivals"}]
```"#;

    #[test]
    fn csv_upload_appends_and_reports_count() {
        let mut s = state("[]");
        let reply = post_customers_csv(&mut s, "Customer ID,Total Purchase Amount\nA,100\nB,300\n");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["added"], 2);
        assert_eq!(reply.body["state"]["records"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn bad_csv_is_a_client_error_with_message() {
        let mut s = state("[]");
        let reply = post_customers_csv(&mut s, "Customer ID\n");
        assert_eq!(reply.status, 400);
        assert!(
            reply.body["error"]
                .as_str()
                .unwrap()
                .contains("at least one data row")
        );
    }

    #[test]
    fn invalid_draft_is_echoed_back() {
        let mut s = state("[]");
        let reply = post_customer(&mut s, r#"{"age":"thirty","customerId":"C9"}"#);
        assert_eq!(reply.status, 422);
        assert_eq!(reply.body["draft"]["age"], "thirty");
        assert!(s.controller.records().is_empty());
    }

    #[test]
    fn valid_draft_is_appended() {
        let mut s = state("[]");
        let reply = post_customer(&mut s, r#"{"customerId":"C9","emailOpens":"4"}"#);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["state"]["records"][0]["emailOpens"], 4.0);
    }

    #[test]
    fn analyze_with_no_records_is_a_client_error() {
        let mut s = state("[]");
        let reply = post_analyze(&mut s);
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["kind"], "empty_batch");
    }

    #[test]
    fn analyze_returns_dashboard_on_success() {
        let mut s = state(TWO_RESULTS);
        post_customers_csv(&mut s, "Customer ID,Total Purchase Amount\nA,100\nB,300\n");
        let reply = post_analyze(&mut s);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["state"]["view"], "dashboard");
        assert_eq!(reply.body["dashboard"]["kpis"]["analyzedCount"], 2);
        assert_eq!(reply.body["dashboard"]["kpis"]["highChurnShare"], 50.0);
        assert_eq!(reply.body["dashboard"]["kpiDisplay"]["highChurnShare"], "50.0%");
        assert_eq!(reply.body["dashboard"]["results"][0]["highChurn"], true);
    }

    #[test]
    fn analyze_failure_carries_banner_and_kind() {
        let mut s = state(r#"[{"customerId":"A"}]"#);
        post_customers_csv(&mut s, "Customer ID\nA\n");
        let reply = post_analyze(&mut s);
        assert_eq!(reply.status, 502);
        assert_eq!(reply.body["kind"], "response_shape");
        assert!(
            reply.body["error"]
                .as_str()
                .unwrap()
                .starts_with("Failed to analyze data:")
        );
        assert_eq!(reply.body["state"]["status"], "failed");
    }

    #[test]
    fn state_lists_previous_results_after_returning_to_input() {
        let mut s = state(TWO_RESULTS);
        post_customers_csv(&mut s, "Customer ID,Total Purchase Amount\nA,100\nB,300\n");
        post_analyze(&mut s);
        assert_eq!(get_state(&s).body["previousResults"], json!([]));

        put_view(&mut s, r#"{"view":"input"}"#);
        let rows = get_state(&s).body["previousResults"].clone();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["customerId"], "A");
        assert_eq!(rows[0]["highChurn"], true);
        assert_eq!(rows[1]["record"]["totalPurchaseAmount"], 300.0);
    }

    #[test]
    fn view_switch_validates_body() {
        let mut s = state("[]");
        assert_eq!(put_view(&mut s, r#"{"view":"dashboard"}"#).status, 200);
        assert_eq!(s.controller.view(), View::Dashboard);
        assert_eq!(put_view(&mut s, r#"{"view":"settings"}"#).status, 400);
    }

    #[test]
    fn clear_empties_session() {
        let mut s = state("[]");
        post_customers_csv(&mut s, "Customer ID\nA\n");
        let reply = post_clear(&mut s);
        assert!(reply.body["records"].as_array().unwrap().is_empty());
    }

    #[test]
    fn health_reports_credential_and_counts() {
        let mut s = state("[]");
        post_customers_csv(&mut s, "Customer ID\nA\n");
        let reply = get_health(&s);
        assert_eq!(reply.body["model"], "canned");
        assert_eq!(reply.body["apiKeyConfigured"], true);
        assert_eq!(reply.body["highChurnThreshold"], 60.0);
        assert_eq!(reply.body["records"], 1);
    }
}

/// Gemini `generateContent` client.
///
/// Sends one user turn per call with a JSON response MIME type and a low
/// temperature, then concatenates the text parts of the first candidate.
/// Uses the synchronous `ureq` client; the caller blocks until the service
/// answers or the configured timeout elapses.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::InferenceService;
use crate::config::schema::AnalysisConfig;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f64,
    /// `None` leaves the request bounded only by the transport.
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key().map(str::to_string),
            temperature: config.temperature,
            timeout: (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms)),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
            },
        }
    }
}

impl InferenceService for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(AnalysisError::Configuration);
        };

        let mut request = ureq::post(&self.endpoint()).set("x-goog-api-key", key);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send_json(self.request_body(prompt)) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp
                    .into_json::<ErrorEnvelope>()
                    .map(|e| e.error.message)
                    .unwrap_or_default();
                return Err(AnalysisError::Service(status_message(code, &detail)));
            }
            Err(e) => {
                return Err(AnalysisError::Service(format!("request failed: {e}")));
            }
        };

        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| AnalysisError::Service(format!("unreadable response body: {e}")))?;

        response_text(&parsed)
            .ok_or_else(|| AnalysisError::Service("the service returned no text".to_string()))
    }
}

fn status_message(code: u16, detail: &str) -> String {
    if detail.trim().is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {}", detail.trim())
    }
}

/// Concatenated text parts of the first candidate, if any is non-blank.
fn response_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            api_key: Some("k".to_string()),
            base_url: "https://example.test/".to_string(),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn endpoint_includes_model_and_trims_slash() {
        let client = GeminiClient::from_config(&config());
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let client = GeminiClient::from_config(&config());
        assert!(client.timeout.is_none());

        let mut cfg = config();
        cfg.timeout_ms = 30_000;
        let client = GeminiClient::from_config(&cfg);
        assert_eq!(client.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn credential_follows_config() {
        assert!(GeminiClient::from_config(&config()).has_credential());
        let mut cfg = config();
        cfg.api_key = Some("  ".to_string());
        assert!(!GeminiClient::from_config(&cfg).has_credential());
    }

    #[test]
    fn request_body_shape() {
        let client = GeminiClient::from_config(&config());
        let body = serde_json::to_value(client.request_body("hello")).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[{\"a\":"},{"text":"1}]"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(&parsed).as_deref(), Some("[{\"a\":1}]"));
    }

    #[test]
    fn blank_or_missing_text_is_none() {
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(response_text(&empty).is_none());

        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .unwrap();
        assert!(response_text(&blank).is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(response_text(&blocked).is_none());
    }

    #[test]
    fn status_message_includes_detail_when_present() {
        assert_eq!(status_message(403, ""), "HTTP 403");
        assert_eq!(
            status_message(400, " API key not valid "),
            "HTTP 400: API key not valid"
        );
    }
}

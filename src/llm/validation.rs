/// Validation for analysis responses.
///
/// The service is asked for a bare JSON array, but the response is still
/// treated as untrusted text:
///
/// 1. **Unwrap** - trim, and strip a surrounding ```` ``` ```` /
///    ```` ```json ```` fence if the model added one anyway.
/// 2. **Parse** - malformed JSON is a [`AnalysisError::ResponseFormat`].
/// 3. **Shape** - the value must be an array, and *every* element must be an
///    object carrying all five result fields.
/// 4. **Reconcile** - result IDs must cover the submitted batch exactly,
///    with no strangers and no repeats.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::AnalysisResult;
use super::prompts::RESULT_FIELDS;
use crate::error::{AnalysisError, ResponseShapeError};
use crate::records::CustomerRecord;

/// A whole-response code fence with an optional `json` tag.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*\n?(.*?)\n?\s*```\s*$").expect("fence regex must compile")
});

/// Trim the response and remove a surrounding code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim(),
        _ => trimmed,
    }
}

/// Parse and shape-check a raw response into results.
pub fn parse_response(raw: &str) -> Result<Vec<AnalysisResult>, AnalysisError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)?;

    let items = value.as_array().ok_or(ResponseShapeError::NotAnArray)?;
    let results = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

fn parse_item(index: usize, item: &Value) -> Result<AnalysisResult, ResponseShapeError> {
    let obj = item
        .as_object()
        .ok_or(ResponseShapeError::NotAnObject { index })?;

    let missing: Vec<String> = RESULT_FIELDS
        .iter()
        .filter(|key| field_text(obj, key).is_none())
        .map(|key| key.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ResponseShapeError::MissingFields {
            index,
            customer_id: field_text(obj, "customerId").unwrap_or_else(|| "?".to_string()),
            missing,
        });
    }

    let get = |key: &str| field_text(obj, key).unwrap_or_default();
    Ok(AnalysisResult {
        customer_id: get("customerId"),
        purchase_score: get("purchaseScore"),
        churn_risk: get("churnRisk"),
        segment: get("segment"),
        next_best_action: get("nextBestAction"),
    })
}

/// A field's value as text. Strings pass through; bare numbers (a common
/// slip for the percentage fields) are rendered. Anything else is missing.
fn field_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Check that results and the submitted batch describe the same customers.
///
/// A submitted ID with no result is *missing*; a result ID that was never
/// submitted is *unexpected*; an ID returned more often than it was
/// submitted is *duplicated*. Each list is in first-seen order.
pub fn reconcile(records: &[CustomerRecord], results: &[AnalysisResult]) -> Result<(), AnalysisError> {
    let mut submitted: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *submitted.entry(record.customer_id.as_str()).or_default() += 1;
    }
    let mut returned: HashMap<&str, usize> = HashMap::new();
    for result in results {
        *returned.entry(result.customer_id.as_str()).or_default() += 1;
    }

    let mut missing = Vec::new();
    for record in records {
        let id = record.customer_id.as_str();
        if !returned.contains_key(id) && !missing.iter().any(|m: &String| m == id) {
            missing.push(id.to_string());
        }
    }

    let mut unexpected = Vec::new();
    let mut duplicates = Vec::new();
    for result in results {
        let id = result.customer_id.as_str();
        match submitted.get(id) {
            None => {
                if !unexpected.iter().any(|u: &String| u == id) {
                    unexpected.push(id.to_string());
                }
            }
            Some(&expected) => {
                if returned[id] > expected && !duplicates.iter().any(|d: &String| d == id) {
                    duplicates.push(id.to_string());
                }
            }
        }
    }

    if missing.is_empty() && unexpected.is_empty() && duplicates.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::Reconciliation {
            missing,
            unexpected,
            duplicates,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

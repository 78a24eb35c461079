//! Prompt construction for batch customer analysis.
//!
//! The prompt has three parts:
//!
//! - fixed task instructions (what to predict per customer)
//! - the sanitized customer array, pretty-printed JSON
//! - output-format constraints (a bare JSON array of flat string objects)

use serde_json::{Map, Value};

use crate::records::{Column, CustomerRecord};

/// The five keys every result object must carry.
pub const RESULT_FIELDS: [&str; 5] = [
    "customerId",
    "purchaseScore",
    "churnRisk",
    "segment",
    "nextBestAction",
];

const TASK: &str = "\
You are an analytics assistant producing predictive customer-behavior scores.
Act as a trained classification model (for example logistic regression or
gradient-boosted trees) would. For every customer in the input, predict:

1. purchaseScore: likelihood of a purchase in the near term, 0-100%.
2. churnRisk: probability that the customer stops buying, 0-100%.
3. segment: one label such as Loyal Buyer, At-Risk, New Shopper,
   Potential Spender, Window Shopper or High Value.
4. nextBestAction: one proactive step, such as recommending new arrivals,
   sending a discount code, a welcome campaign, personalized
   recommendations, a re-engagement email or an exclusive offer.

Weigh recency, frequency and monetary value, engagement signals (site
visits, pages viewed, email opens) and stated product preferences. Some
optional fields such as age or gender may be missing; base the prediction
on what is present.";

const OUTPUT_RULES: &str = r#"Output rules:
- Respond with a JSON array and nothing else: the first character is '[' and the last is ']'.
- One flat object per input customer with exactly these string-valued keys: "customerId", "purchaseScore", "churnRisk", "segment", "nextBestAction".
- Every key and every string value is enclosed in double quotes. Escape quotes, backslashes and newlines inside values.
- "purchaseScore" and "churnRisk" are quoted percentages such as "82%" or "15%".
- "customerId" is copied exactly from the input customer it describes.
- No explanations, no prose, no markdown code fences before or after the array.
Example element:
{"customerId": "CUST123", "purchaseScore": "75%", "churnRisk": "20%", "segment": "Potential Spender", "nextBestAction": "Send a personalized discount code for \"New Arrivals\""}"#;

/// Reduce a record to the fields that are actually present.
///
/// Numeric columns are emitted as JSON numbers (integers when integral),
/// text columns only when non-empty.
pub fn sanitize(record: &CustomerRecord) -> Map<String, Value> {
    let mut out = Map::new();
    for column in Column::ALL {
        let value = if column.is_numeric() {
            record.number(column).and_then(number_value)
        } else {
            let text = record.text(column);
            (!text.is_empty()).then(|| Value::String(text))
        };
        if let Some(value) = value {
            out.insert(column.key().to_string(), value);
        }
    }
    out
}

fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

/// Build the full analysis prompt for a batch.
pub fn build_prompt(records: &[CustomerRecord]) -> String {
    let customers = Value::Array(records.iter().map(|r| Value::Object(sanitize(r))).collect());
    let customers_json =
        serde_json::to_string_pretty(&customers).unwrap_or_else(|_| customers.to_string());

    format!("{TASK}\n\nInput customer data:\n{customers_json}\n\n{OUTPUT_RULES}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CustomerRecord {
        CustomerRecord {
            age: Some(41.0),
            gender: Some("Female".to_string()),
            total_purchase_amount: Some(1250.75),
            product_preferences: Some("shoes, bags".to_string()),
            ..CustomerRecord::new("CUST9")
        }
    }

    #[test]
    fn sanitize_keeps_only_present_fields() {
        let map = sanitize(&sample());
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys.len(),
            5,
            "unexpected keys: {keys:?}"
        );
        assert!(!map.contains_key("visitFrequency"));
        assert!(!map.contains_key("lastPurchaseDate"));
    }

    #[test]
    fn sanitize_emits_numbers_not_strings() {
        let map = sanitize(&sample());
        assert_eq!(map["age"], Value::from(41));
        assert!(map["age"].is_number());
        assert_eq!(map["totalPurchaseAmount"].as_f64(), Some(1250.75));
        assert_eq!(map["gender"], Value::from("Female"));
    }

    #[test]
    fn sanitize_drops_empty_text() {
        let record = CustomerRecord {
            gender: Some(String::new()),
            ..CustomerRecord::new("C1")
        };
        let map = sanitize(&record);
        assert_eq!(map.len(), 1);
        assert_eq!(map["customerId"], Value::from("C1"));
    }

    #[test]
    fn prompt_embeds_every_customer_and_output_rules() {
        let records = vec![sample(), CustomerRecord::new("CUST10")];
        let prompt = build_prompt(&records);
        assert!(prompt.contains("\"customerId\": \"CUST9\""));
        assert!(prompt.contains("\"customerId\": \"CUST10\""));
        assert!(prompt.contains("\"82%\""));
        for field in RESULT_FIELDS {
            assert!(prompt.contains(field), "prompt missing {field}");
        }
        assert!(prompt.contains("no markdown code fences"));
    }
}

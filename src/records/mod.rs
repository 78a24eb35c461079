//! Customer records and the two ways they enter the system.
//!
//! - [`csv`] turns uploaded delimited text into records.
//! - [`manual`] turns a draft form (all strings) into a record.
//!
//! A [`CustomerRecord`] is the committed representation: numbers are typed,
//! absent values are `None`, and `customer_id` is never empty.

pub mod csv;
pub mod manual;

use serde::{Deserialize, Serialize};

pub use manual::{CustomerDraft, ManualEntryForm};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// The recognized input columns, in canonical header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    CustomerId,
    Age,
    Gender,
    LastPurchaseDate,
    TotalPurchaseAmount,
    VisitFrequency,
    LastActiveDate,
    PagesVisited,
    EmailOpens,
    ProductPreferences,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::CustomerId,
        Column::Age,
        Column::Gender,
        Column::LastPurchaseDate,
        Column::TotalPurchaseAmount,
        Column::VisitFrequency,
        Column::LastActiveDate,
        Column::PagesVisited,
        Column::EmailOpens,
        Column::ProductPreferences,
    ];

    /// Canonical CSV header text.
    pub fn header(self) -> &'static str {
        match self {
            Self::CustomerId => "Customer ID",
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::LastPurchaseDate => "Last Purchase Date",
            Self::TotalPurchaseAmount => "Total Purchase Amount",
            Self::VisitFrequency => "Visit Frequency",
            Self::LastActiveDate => "Last Active Date",
            Self::PagesVisited => "Pages Visited",
            Self::EmailOpens => "Email Opens",
            Self::ProductPreferences => "Product Preferences",
        }
    }

    /// Wire/form key (camelCase).
    pub fn key(self) -> &'static str {
        match self {
            Self::CustomerId => "customerId",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::LastPurchaseDate => "lastPurchaseDate",
            Self::TotalPurchaseAmount => "totalPurchaseAmount",
            Self::VisitFrequency => "visitFrequency",
            Self::LastActiveDate => "lastActiveDate",
            Self::PagesVisited => "pagesVisited",
            Self::EmailOpens => "emailOpens",
            Self::ProductPreferences => "productPreferences",
        }
    }

    /// Columns converted to numbers on input.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Age
                | Self::TotalPurchaseAmount
                | Self::VisitFrequency
                | Self::PagesVisited
                | Self::EmailOpens
        )
    }

    /// Case-insensitive header lookup. Surrounding whitespace is ignored.
    pub fn from_header(header: &str) -> Option<Self> {
        let wanted = header.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(wanted))
    }

    /// Lookup by header text or camelCase key, used by the CLI and web form.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::from_header(wanted).or_else(|| {
            Self::ALL
                .into_iter()
                .find(|c| c.key().eq_ignore_ascii_case(wanted))
        })
    }

    /// Lower-cased header names joined for error messages.
    pub fn expected_headers() -> String {
        Self::ALL
            .iter()
            .map(|c| c.header().to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

// ---------------------------------------------------------------------------
// Committed record
// ---------------------------------------------------------------------------

/// One customer, as held by the controller and sent for analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_purchase_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_purchase_amount: Option<f64>,
    /// Visits per period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_frequency: Option<f64>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_visited: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_opens: Option<f64>,
    /// Comma-separated free-text tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_preferences: Option<String>,
}

impl CustomerRecord {
    /// A record with only the required ID set.
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Self::default()
        }
    }

    /// Numeric value of a numeric column, `None` for absent or text columns.
    pub fn number(&self, column: Column) -> Option<f64> {
        match column {
            Column::Age => self.age,
            Column::TotalPurchaseAmount => self.total_purchase_amount,
            Column::VisitFrequency => self.visit_frequency,
            Column::PagesVisited => self.pages_visited,
            Column::EmailOpens => self.email_opens,
            _ => None,
        }
    }

    /// Display text of any column; empty when absent.
    pub fn text(&self, column: Column) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        match column {
            Column::CustomerId => self.customer_id.clone(),
            Column::Age => num(self.age),
            Column::Gender => text(&self.gender),
            Column::LastPurchaseDate => text(&self.last_purchase_date),
            Column::TotalPurchaseAmount => num(self.total_purchase_amount),
            Column::VisitFrequency => num(self.visit_frequency),
            Column::LastActiveDate => text(&self.last_active_date),
            Column::PagesVisited => num(self.pages_visited),
            Column::EmailOpens => num(self.email_opens),
            Column::ProductPreferences => text(&self.product_preferences),
        }
    }

    /// Store an already-converted value while a record is being built.
    ///
    /// Empty text becomes `None`; the caller decides how numbers are parsed.
    pub(crate) fn assign(&mut self, column: Column, text: &str, number: Option<f64>) {
        let text = (!text.is_empty()).then(|| text.to_string());
        match column {
            Column::CustomerId => self.customer_id = text.unwrap_or_default(),
            Column::Age => self.age = number,
            Column::Gender => self.gender = text,
            Column::LastPurchaseDate => self.last_purchase_date = text,
            Column::TotalPurchaseAmount => self.total_purchase_amount = number,
            Column::VisitFrequency => self.visit_frequency = number,
            Column::LastActiveDate => self.last_active_date = text,
            Column::PagesVisited => self.pages_visited = number,
            Column::EmailOpens => self.email_opens = number,
            Column::ProductPreferences => self.product_preferences = text,
        }
    }
}

/// Parse a finite number; anything else is treated as absent.
pub(crate) fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        assert_eq!(Column::from_header("customer id"), Some(Column::CustomerId));
        assert_eq!(
            Column::from_header("  TOTAL PURCHASE AMOUNT "),
            Some(Column::TotalPurchaseAmount)
        );
        assert_eq!(Column::from_header("zip"), None);
    }

    #[test]
    fn name_lookup_accepts_camel_case_keys() {
        assert_eq!(Column::from_name("emailOpens"), Some(Column::EmailOpens));
        assert_eq!(Column::from_name("Email Opens"), Some(Column::EmailOpens));
    }

    #[test]
    fn parse_finite_rejects_nan_and_text() {
        assert_eq!(parse_finite("12.5"), Some(12.5));
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("inf"), None);
        assert_eq!(parse_finite("twelve"), None);
        assert_eq!(parse_finite(""), None);
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_fields() {
        let mut record = CustomerRecord::new("C1");
        record.total_purchase_amount = Some(120.5);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"customerId":"C1","totalPurchaseAmount":120.5}"#);
    }

    #[test]
    fn text_renders_integral_numbers_without_fraction() {
        let mut record = CustomerRecord::new("C1");
        record.age = Some(34.0);
        assert_eq!(record.text(Column::Age), "34");
        assert_eq!(record.text(Column::Gender), "");
    }
}

//! Manual entry: a draft form of plain strings, committed into a record.

use serde::{Deserialize, Serialize};

use super::{Column, CustomerRecord, parse_finite};
use crate::error::ValidationError;

/// The form representation of a customer. Every field is text; an empty
/// string means "not filled in".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDraft {
    pub customer_id: String,
    pub age: String,
    pub gender: String,
    pub last_purchase_date: String,
    pub total_purchase_amount: String,
    pub visit_frequency: String,
    pub last_active_date: String,
    pub pages_visited: String,
    pub email_opens: String,
    pub product_preferences: String,
}

impl CustomerDraft {
    /// Build a draft from `name=value` pairs. Names may be header text
    /// (`"Email Opens"`) or form keys (`"emailOpens"`).
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut draft = Self::default();
        for (name, value) in pairs {
            let column =
                Column::from_name(name).ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
            *draft.field_mut(column) = value.to_string();
        }
        Ok(draft)
    }

    /// Parse a `name=value;name=value` string as accepted by `--customer`.
    ///
    /// Pairs are separated by `;` so preference tags can keep their commas.
    pub fn parse_inline(text: &str) -> Result<Self, ValidationError> {
        let pairs = text
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => Ok((k.trim(), v.trim())),
                None => Err(ValidationError::UnknownField(part.trim().to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }

    fn field(&self, column: Column) -> &str {
        match column {
            Column::CustomerId => &self.customer_id,
            Column::Age => &self.age,
            Column::Gender => &self.gender,
            Column::LastPurchaseDate => &self.last_purchase_date,
            Column::TotalPurchaseAmount => &self.total_purchase_amount,
            Column::VisitFrequency => &self.visit_frequency,
            Column::LastActiveDate => &self.last_active_date,
            Column::PagesVisited => &self.pages_visited,
            Column::EmailOpens => &self.email_opens,
            Column::ProductPreferences => &self.product_preferences,
        }
    }

    fn field_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::CustomerId => &mut self.customer_id,
            Column::Age => &mut self.age,
            Column::Gender => &mut self.gender,
            Column::LastPurchaseDate => &mut self.last_purchase_date,
            Column::TotalPurchaseAmount => &mut self.total_purchase_amount,
            Column::VisitFrequency => &mut self.visit_frequency,
            Column::LastActiveDate => &mut self.last_active_date,
            Column::PagesVisited => &mut self.pages_visited,
            Column::EmailOpens => &mut self.email_opens,
            Column::ProductPreferences => &mut self.product_preferences,
        }
    }

    /// Convert the draft into a committed record.
    ///
    /// Customer ID is the only required field. Numeric fields are converted
    /// only when non-empty.
    pub fn commit(&self) -> Result<CustomerRecord, ValidationError> {
        if self.customer_id.trim().is_empty() {
            return Err(ValidationError::MissingCustomerId);
        }

        let mut record = CustomerRecord::default();
        for column in Column::ALL {
            let value = self.field(column).trim();
            let number = if column.is_numeric() && !value.is_empty() {
                Some(parse_finite(value).ok_or_else(|| ValidationError::InvalidNumber {
                    field: column.header().to_string(),
                    value: value.to_string(),
                })?)
            } else {
                None
            };
            record.assign(column, value, number);
        }
        Ok(record)
    }
}

/// Manual-entry form state: the current draft plus its inline error.
#[derive(Debug, Clone, Default)]
pub struct ManualEntryForm {
    pub draft: CustomerDraft,
    pub error: Option<String>,
}

impl ManualEntryForm {
    pub fn new(draft: CustomerDraft) -> Self {
        Self { draft, error: None }
    }

    /// Commit the draft. On success the form resets to blank; on failure
    /// the entered values stay and the error is shown inline.
    pub fn submit(&mut self) -> Result<CustomerRecord, ValidationError> {
        match self.draft.commit() {
            Ok(record) => {
                self.draft = CustomerDraft::default();
                self.error = None;
                Ok(record)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

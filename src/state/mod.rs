//! Session state: the records awaiting analysis, the latest results, the
//! active view and the request status.
//!
//! [`Controller`] is the single owner. Every front end (CLI, web) goes
//! through it, and it is the only place an [`AnalysisError`] is turned into
//! user-facing text.

use serde::{Deserialize, Serialize};

use crate::analytics::reporter::{self, Dashboard, DashboardOptions, ResultRow};
use crate::config::schema::LoggingConfig;
use crate::error::{AnalysisError, ParseError, ValidationError};
use crate::llm::{self, AnalysisResult, InferenceService};
use crate::records::{CustomerRecord, ManualEntryForm, csv};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Input,
    Dashboard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Serializable picture of the whole session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub view: View,
    pub status: RequestStatus,
    pub records: Vec<CustomerRecord>,
    pub results: Vec<AnalysisResult>,
    /// Rows for the results table under the input view.
    pub previous_results: Vec<ResultRow>,
    pub can_analyze: bool,
    pub error: Option<String>,
    pub upload_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Controller {
    records: Vec<CustomerRecord>,
    results: Vec<AnalysisResult>,
    view: View,
    status: RequestStatus,
    /// Analysis banner.
    error: Option<String>,
    /// Inline error of the last CSV upload.
    upload_error: Option<String>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    // -- adding data --------------------------------------------------------

    /// Append parsed records to the batch.
    pub fn add_records(&mut self, records: Vec<CustomerRecord>) {
        let mut next = Vec::with_capacity(self.records.len() + records.len());
        next.extend(self.records.iter().cloned());
        next.extend(records);
        self.records = next;
        self.error = None;
        self.upload_error = None;
        self.view = View::Input;
    }

    /// Append one manually entered record.
    pub fn add_customer(&mut self, record: CustomerRecord) {
        self.add_records(vec![record]);
    }

    /// Parse CSV text and append its rows. On failure the records are left
    /// untouched and the message is kept as the upload error.
    pub fn load_csv(&mut self, text: &str) -> Result<usize, ParseError> {
        match csv::parse_csv(text) {
            Ok(records) => {
                let count = records.len();
                self.add_records(records);
                Ok(count)
            }
            Err(e) => {
                self.upload_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Commit the form's draft and append it. A validation failure stays on
    /// the form.
    pub fn submit_manual(&mut self, form: &mut ManualEntryForm) -> Result<(), ValidationError> {
        let record = form.submit()?;
        self.add_customer(record);
        Ok(())
    }

    /// Drop everything and return to a fresh input view.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // -- analysis -----------------------------------------------------------

    pub fn can_analyze(&self) -> bool {
        if self.status == RequestStatus::Running {
            return false;
        }
        !(self.view == View::Input && self.records.is_empty())
    }

    /// Mark a request as running and hand back the batch to submit.
    pub fn begin_analysis(&mut self) -> Result<Vec<CustomerRecord>, AnalysisError> {
        if self.status == RequestStatus::Running {
            return Err(AnalysisError::AnalysisInFlight);
        }
        if self.records.is_empty() {
            self.error = Some(AnalysisError::EmptyBatch.to_string());
            return Err(AnalysisError::EmptyBatch);
        }
        self.status = RequestStatus::Running;
        self.error = None;
        Ok(self.records.clone())
    }

    /// Apply the outcome of a request started with [`begin_analysis`].
    ///
    /// [`begin_analysis`]: Self::begin_analysis
    pub fn finish_analysis(&mut self, outcome: Result<Vec<AnalysisResult>, AnalysisError>) {
        match outcome {
            Ok(results) => {
                self.results = results;
                self.error = None;
                self.view = View::Dashboard;
                self.status = RequestStatus::Succeeded;
            }
            Err(e) => self.record_failure(&e),
        }
    }

    fn record_failure(&mut self, error: &AnalysisError) {
        self.error = Some(banner_text(error));
        self.view = View::Input;
        self.status = RequestStatus::Failed;
    }

    /// Run one analysis end to end. The error is also reflected in the
    /// banner; callers may ignore the return value.
    pub fn run_analysis(
        &mut self,
        service: &dyn InferenceService,
        logging: &LoggingConfig,
    ) -> Result<(), AnalysisError> {
        let batch = self.begin_analysis()?;
        match llm::analyze_and_log(service, &batch, logging) {
            Ok(results) => {
                self.finish_analysis(Ok(results));
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    // -- navigation ---------------------------------------------------------

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Results from an earlier run, shown under the input view while no
    /// request is running.
    pub fn previous_results(&self) -> &[AnalysisResult] {
        if self.view == View::Input && self.status != RequestStatus::Running {
            &self.results
        } else {
            &[]
        }
    }

    pub fn dashboard(&self, options: &DashboardOptions) -> Dashboard {
        reporter::build_dashboard(&self.records, &self.results, options)
    }

    pub fn snapshot(&self, high_churn_threshold: f64) -> Snapshot {
        Snapshot {
            view: self.view,
            status: self.status,
            records: self.records.clone(),
            results: self.results.clone(),
            previous_results: reporter::results_joined(
                &self.records,
                self.previous_results(),
                high_churn_threshold,
            ),
            can_analyze: self.can_analyze(),
            error: self.error.clone(),
            upload_error: self.upload_error.clone(),
        }
    }
}

/// The banner shown for a failed analysis.
pub fn banner_text(error: &AnalysisError) -> String {
    match error {
        AnalysisError::EmptyBatch => error.to_string(),
        other => format!(
            "Failed to analyze data: {other}. Ensure your API key is correctly configured."
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

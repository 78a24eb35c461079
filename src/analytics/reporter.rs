//! Dashboard aggregation - KPIs and chart series.
//!
//! Everything here is a pure function of the current record list and the
//! current result list. Records and results are correlated by
//! `customer_id` only; result order is whatever the service returned.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::histogram::{self, Bin};
use crate::llm::AnalysisResult;
use crate::records::{Column, CustomerRecord};

/// Churn risk above this percentage counts as "high".
pub const HIGH_CHURN_THRESHOLD: f64 = 60.0;

/// How many preference tags the preferences chart shows.
pub const TOP_PREFERENCES: usize = 10;

/// Knobs for [`build_dashboard`], normally taken from `[dashboard]` config.
#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    pub bins: usize,
    pub top_preferences: usize,
    pub high_churn_threshold: f64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            bins: histogram::DEFAULT_BINS,
            top_preferences: TOP_PREFERENCES,
            high_churn_threshold: HIGH_CHURN_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// KPI summary
// ---------------------------------------------------------------------------

/// Headline figures for the KPI cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub analyzed_count: usize,
    pub avg_purchase_value: Option<f64>,
    pub avg_visit_frequency: Option<f64>,
    /// Percentage (0-100) of results above the churn threshold.
    pub high_churn_share: Option<f64>,
}

impl KpiSummary {
    /// Two decimals, or `"N/A"`.
    pub fn avg_purchase_display(&self) -> String {
        self.avg_purchase_value
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(na)
    }

    /// One decimal, or `"N/A"`.
    pub fn avg_visits_display(&self) -> String {
        self.avg_visit_frequency
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(na)
    }

    /// One decimal with a percent sign, or `"N/A"`.
    pub fn high_churn_display(&self) -> String {
        self.high_churn_share
            .map(|v| format!("{v:.1}%"))
            .unwrap_or_else(na)
    }

    /// The card texts, formatted for display.
    pub fn display(&self) -> KpiDisplay {
        KpiDisplay {
            analyzed_count: self.analyzed_count.to_string(),
            avg_purchase_value: self.avg_purchase_display(),
            avg_visit_frequency: self.avg_visits_display(),
            high_churn_share: self.high_churn_display(),
        }
    }
}

/// [`KpiSummary`] as the text shown on each card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDisplay {
    pub analyzed_count: String,
    pub avg_purchase_value: String,
    pub avg_visit_frequency: String,
    pub high_churn_share: String,
}

fn na() -> String {
    "N/A".to_string()
}

/// Compute the KPI cards.
pub fn kpi_summary(
    records: &[CustomerRecord],
    results: &[AnalysisResult],
    high_churn_threshold: f64,
) -> KpiSummary {
    let analyzed: HashSet<&str> = results.iter().map(|r| r.customer_id.as_str()).collect();
    let analyzed_records: Vec<&CustomerRecord> = records
        .iter()
        .filter(|r| analyzed.contains(r.customer_id.as_str()))
        .collect();

    let high_churn_share = if results.is_empty() {
        None
    } else {
        let high = results
            .iter()
            .filter(|r| r.churn_risk_value() > high_churn_threshold)
            .count();
        Some(high as f64 / results.len() as f64 * 100.0)
    };

    KpiSummary {
        analyzed_count: results.len(),
        avg_purchase_value: mean(analyzed_records.iter().filter_map(|r| r.total_purchase_amount)),
        avg_visit_frequency: mean(analyzed_records.iter().filter_map(|r| r.visit_frequency)),
        high_churn_share,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Categorical tallies
// ---------------------------------------------------------------------------

/// A label and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Count occurrences keeping first-encounter order.
fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<LabelCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<LabelCount> = Vec::new();
    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label, counts.len());
                counts.push(LabelCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts
}

/// Most common product-preference tags, highest count first.
///
/// Tags are lower-cased and trimmed; ties keep the order in which the tag
/// first appeared.
pub fn top_preferences(records: &[CustomerRecord], limit: usize) -> Vec<LabelCount> {
    let tags: Vec<String> = records
        .iter()
        .filter_map(|r| r.product_preferences.as_deref())
        .flat_map(|prefs| prefs.split(','))
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();

    let mut counts = tally(tags.iter().map(String::as_str));
    // stable sort keeps encounter order among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Label used for a result whose segment is blank.
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// The segment a result is grouped under in every chart.
pub fn segment_label(result: &AnalysisResult) -> &str {
    if result.segment.trim().is_empty() {
        UNKNOWN_SEGMENT
    } else {
        result.segment.as_str()
    }
}

/// Number of results per segment, in first-encounter order.
pub fn segment_distribution(results: &[AnalysisResult]) -> Vec<LabelCount> {
    tally(results.iter().map(segment_label))
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    /// Purchase score (percent).
    pub x: f64,
    /// Churn risk (percent).
    pub y: f64,
    pub customer_id: String,
}

/// One colored series of the score/risk scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub segment: String,
    pub points: Vec<ScatterPoint>,
}

/// Purchase score vs. churn risk, grouped by segment.
pub fn score_risk_scatter(results: &[AnalysisResult]) -> Vec<ScatterSeries> {
    let mut series: Vec<ScatterSeries> = Vec::new();
    for result in results {
        let segment = segment_label(result);
        let point = ScatterPoint {
            x: result.purchase_score_value(),
            y: result.churn_risk_value(),
            customer_id: result.customer_id.clone(),
        };
        match series.iter_mut().find(|s| s.segment == segment) {
            Some(s) => s.points.push(point),
            None => series.push(ScatterSeries {
                segment: segment.to_string(),
                points: vec![point],
            }),
        }
    }
    series
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub title: String,
    pub bins: Vec<Bin>,
}

/// Histograms of purchase amount, visit frequency and pages visited over
/// every loaded record, analyzed or not.
pub fn behavior_distributions(records: &[CustomerRecord], bins: usize) -> Vec<Distribution> {
    [
        (Column::TotalPurchaseAmount, "Total Purchase Amount Distribution"),
        (Column::VisitFrequency, "Visit Frequency Distribution"),
        (Column::PagesVisited, "Pages Visited Distribution"),
    ]
    .into_iter()
    .map(|(column, title)| {
        let sample: Vec<Option<f64>> = records.iter().map(|r| r.number(column)).collect();
        Distribution {
            title: title.to_string(),
            bins: histogram::bin(&sample, bins),
        }
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Results table
// ---------------------------------------------------------------------------

/// A result row next to the record it was produced for, if still loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// Churn risk above the configured threshold.
    pub high_churn: bool,
    pub record: Option<CustomerRecord>,
}

/// Join results to records by customer ID, in result order.
pub fn results_joined(
    records: &[CustomerRecord],
    results: &[AnalysisResult],
    high_churn_threshold: f64,
) -> Vec<ResultRow> {
    let by_id: HashMap<&str, &CustomerRecord> = records
        .iter()
        .map(|r| (r.customer_id.as_str(), r))
        .collect();
    results
        .iter()
        .map(|result| ResultRow {
            result: result.clone(),
            high_churn: result.churn_risk_value() > high_churn_threshold,
            record: by_id.get(result.customer_id.as_str()).map(|r| (*r).clone()),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Whole dashboard
// ---------------------------------------------------------------------------

/// Everything the dashboard view renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub kpis: KpiSummary,
    pub kpi_display: KpiDisplay,
    pub segments: Vec<LabelCount>,
    pub scatter: Vec<ScatterSeries>,
    pub top_preferences: Vec<LabelCount>,
    pub distributions: Vec<Distribution>,
    pub results: Vec<ResultRow>,
}

pub fn build_dashboard(
    records: &[CustomerRecord],
    results: &[AnalysisResult],
    options: &DashboardOptions,
) -> Dashboard {
    let kpis = kpi_summary(records, results, options.high_churn_threshold);
    Dashboard {
        kpi_display: kpis.display(),
        kpis,
        segments: segment_distribution(results),
        scatter: score_risk_scatter(results),
        top_preferences: top_preferences(records, options.top_preferences),
        distributions: behavior_distributions(records, options.bins),
        results: results_joined(records, results, options.high_churn_threshold),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! custpulse: customer behavior analytics with a generative-AI scoring step.
//!
//! Customers are loaded from CSV or entered by hand, sent in one batch to an
//! inference service for purchase-score, churn-risk and segment predictions,
//! and summarized into dashboard KPIs and chart series.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod records;
pub mod state;
pub mod web;

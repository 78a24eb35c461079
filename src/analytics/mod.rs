//! Dashboard analytics and the run log.
//!
//! - [`histogram`] - binning for the distribution charts
//! - [`reporter`] - KPIs, tallies, scatter series and the assembled dashboard
//! - [`logger`] - JSONL log of analysis attempts

pub mod histogram;
pub mod logger;
pub mod reporter;

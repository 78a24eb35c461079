//! Histogram binning for the behavior distribution charts.
//!
//! Produces a compact list of contiguous `(label, count)` bins. Leading and
//! trailing empty bins are trimmed; interior empty bins are kept so the
//! shape of the distribution stays visible.

use serde::Serialize;

/// Default number of bins requested by the dashboard.
pub const DEFAULT_BINS: usize = 5;

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bin {
    /// `"start-end"`, or the single value when all samples are equal.
    pub label: String,
    pub count: usize,
}

/// Bucket a sample into at most `bins` contiguous ranges starting at the
/// sample minimum.
///
/// Absent and non-finite values are ignored. An empty sample gives an
/// empty result. When the integer range `max - min + 1` is narrower than
/// the requested bin count, fewer bins are used so no bin is degenerate.
pub fn bin(sample: &[Option<f64>], bins: usize) -> Vec<Bin> {
    let values: Vec<f64> = sample
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    let Some((min, max)) = bounds(&values) else {
        return Vec::new();
    };

    if min == max {
        return vec![Bin {
            label: min.to_string(),
            count: values.len(),
        }];
    }

    let span = max - min + 1.0;
    let requested = bins.max(1);
    let effective = if span < requested as f64 {
        (span.floor() as usize).max(1)
    } else {
        requested
    };
    let width = (span / effective as f64).ceil().max(1.0);

    let mut counts = vec![0usize; effective];
    for v in &values {
        let idx = ((v - min) / width).floor() as usize;
        counts[idx.min(effective - 1)] += 1;
    }

    let Some(first) = counts.iter().position(|&c| c > 0) else {
        return Vec::new();
    };
    let last = counts.iter().rposition(|&c| c > 0).unwrap_or(first);

    (first..=last)
        .map(|i| {
            let start = min + i as f64 * width;
            let end = (start + width - 1.0).min(max);
            Bin {
                label: format!("{start}-{end}"),
                count: counts[i],
            }
        })
        .collect()
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Histogram bucketing and per-disposition statistics.
//!
//! Every function here skips records whose input field is missing or not
//! finite. Nothing is rejected loudly: a dataset with gaps simply yields
//! smaller counts.

use crate::models::{
    BinScale, CategoryValue, DatasetRecord, Disposition, HistogramBin, NumericField,
    ScatterPoint, Statistic,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Bucket indices from 2^53 up are not exactly representable as `f64`.
const MAX_BIN_INDEX: f64 = 9_007_199_254_740_992.0;

/// Bucket index of `value` for half-open buckets `[i*step, (i+1)*step)`.
///
/// Returns `None` for non-finite values, for a step that is not finite
/// and strictly positive, and for values too far from zero to get a
/// bucket of their own.
pub fn linear_bin_index(value: f64, step: f64) -> Option<i64> {
    if !value.is_finite() || !valid_step(step) {
        return None;
    }
    let index = (value / step).floor();
    (index.abs() < MAX_BIN_INDEX).then_some(index as i64)
}

/// Bucket index of `log10(value)` in log space.
///
/// Values `<= 0` have no logarithm and are dropped.
pub fn log_bin_index(value: f64, step: f64) -> Option<i64> {
    linear_bin_index(value.log10(), step)
}

/// Index `i` of the interval `[edges[i], edges[i+1])` holding `value`.
///
/// The last interval is closed on the right, so a value equal to the final
/// edge lands in it. Values outside `[edges[0], edges[n-1]]` are dropped.
pub fn edge_bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    if !value.is_finite() || !valid_edges(edges) {
        return None;
    }
    let first = edges[0];
    let last = edges[edges.len() - 1];
    if value < first || value > last {
        return None;
    }
    if value == last {
        return Some(edges.len() - 2);
    }
    // Number of edges <= value, minus one, is the interval index.
    Some(edges.partition_point(|edge| *edge <= value) - 1)
}

/// Arithmetic mean, `NaN` when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median, `NaN` when empty. Even counts average the two central values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Apply a [`Statistic`] to a slice of values.
pub fn central_tendency(values: &[f64], statistic: Statistic) -> f64 {
    match statistic {
        Statistic::Mean => mean(values),
        Statistic::Median => median(values),
    }
}

/// Histogram of `field` with fixed-width linear buckets, per disposition.
pub fn linear_histogram(
    records: &[DatasetRecord],
    field: NumericField,
    step: f64,
) -> Vec<HistogramBin> {
    if !valid_step(step) {
        warn!("Ignoring histogram of {} with invalid step {}", field.column(), step);
        return Vec::new();
    }
    let counts = count_by(records, field, |v| linear_bin_index(v, step));
    stepped_bins(counts, step, BinScale::Linear)
}

/// Histogram of `log10(field)` with fixed-width buckets in log space.
pub fn log_histogram(
    records: &[DatasetRecord],
    field: NumericField,
    step: f64,
) -> Vec<HistogramBin> {
    if !valid_step(step) {
        warn!("Ignoring log histogram of {} with invalid step {}", field.column(), step);
        return Vec::new();
    }
    let counts = count_by(records, field, |v| log_bin_index(v, step));
    stepped_bins(counts, step, BinScale::Log10)
}

/// Histogram of `field` over explicit ascending bucket edges.
pub fn edge_histogram(
    records: &[DatasetRecord],
    field: NumericField,
    edges: &[f64],
) -> Vec<HistogramBin> {
    if !valid_edges(edges) {
        warn!(
            "Ignoring histogram of {}: edges must be at least two strictly ascending finite values",
            field.column()
        );
        return Vec::new();
    }
    let decimals = edges.iter().map(|e| decimals_for(*e)).max().unwrap_or(0);
    count_by(records, field, |v| edge_bin_index(v, edges))
        .into_iter()
        .map(|((disposition, index), count)| {
            let (start, end) = (edges[index], edges[index + 1]);
            HistogramBin {
                start,
                end,
                label: range_label(start, end, decimals),
                count,
                disposition,
                scale: BinScale::Linear,
            }
        })
        .collect()
}

/// Mean or median of `field` for every disposition present in `records`.
///
/// A disposition whose rows all lack the field reports `NaN` with zero
/// samples.
pub fn aggregate_by_disposition(
    records: &[DatasetRecord],
    field: NumericField,
    statistic: Statistic,
) -> Vec<CategoryValue> {
    let mut grouped: BTreeMap<Disposition, Vec<f64>> = BTreeMap::new();

    for record in records {
        let values = grouped.entry(record.koi_disposition).or_default();
        if let Some(v) = record.field(field).filter(|v| v.is_finite()) {
            values.push(v);
        }
    }

    grouped
        .into_iter()
        .map(|(disposition, values)| CategoryValue {
            disposition,
            value: central_tendency(&values, statistic),
            statistic,
            samples: values.len(),
        })
        .collect()
}

/// Points of `x` against `y` for records where both are finite.
pub fn scatter(records: &[DatasetRecord], x: NumericField, y: NumericField) -> Vec<ScatterPoint> {
    records
        .iter()
        .filter_map(|r| {
            let px = r.field(x).filter(|v| v.is_finite())?;
            let py = r.field(y).filter(|v| v.is_finite())?;
            Some(ScatterPoint {
                x: px,
                y: py,
                disposition: r.koi_disposition,
            })
        })
        .collect()
}

/// Count of records per disposition.
pub fn disposition_counts(records: &[DatasetRecord]) -> BTreeMap<Disposition, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.koi_disposition).or_insert(0) += 1;
    }
    counts
}

fn valid_step(step: f64) -> bool {
    step.is_finite() && step > 0.0
}

fn valid_edges(edges: &[f64]) -> bool {
    edges.len() >= 2
        && edges.iter().all(|e| e.is_finite())
        && edges.windows(2).all(|w| w[0] < w[1])
}

fn count_by<K, F>(
    records: &[DatasetRecord],
    field: NumericField,
    index: F,
) -> BTreeMap<(Disposition, K), usize>
where
    K: Ord,
    F: Fn(f64) -> Option<K>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        let Some(bucket) = record.field(field).and_then(&index) else {
            continue;
        };
        *counts.entry((record.koi_disposition, bucket)).or_insert(0) += 1;
    }
    counts
}

fn stepped_bins(
    counts: BTreeMap<(Disposition, i64), usize>,
    step: f64,
    scale: BinScale,
) -> Vec<HistogramBin> {
    let decimals = decimals_for(step);
    counts
        .into_iter()
        .map(|((disposition, index), count)| {
            let start = index as f64 * step;
            let end = (index as f64 + 1.0) * step;
            HistogramBin {
                start,
                end,
                label: range_label(start, end, decimals),
                count,
                disposition,
                scale,
            }
        })
        .collect()
}

/// Fractional digits needed to print `value` exactly (capped at 6).
fn decimals_for(value: f64) -> usize {
    (0..6)
        .find(|d| {
            let scaled = value * 10f64.powi(*d as i32);
            (scaled - scaled.round()).abs() < 1e-9
        })
        .unwrap_or(6)
}

fn range_label(start: f64, end: f64, decimals: usize) -> String {
    // Avoid printing "-0.0" for the bucket right below zero.
    let clean = |v: f64| if v == 0.0 { 0.0 } else { v };
    format!(
        "{:.*}–{:.*}",
        decimals,
        clean(start),
        decimals,
        clean(end)
    )
}

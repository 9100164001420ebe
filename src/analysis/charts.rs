//! The dashboard chart suite and the per-snapshot chart cache.

use crate::analysis::aggregator::{
    aggregate_by_disposition, disposition_counts, edge_histogram, linear_histogram,
    log_histogram, scatter,
};
use crate::config::ChartsConfig;
use crate::models::{
    CategoryValue, DatasetRecord, Disposition, HistogramBin, NumericField, ScatterPoint,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Every chart shown on the general dashboard, computed from one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSet {
    /// Parameters the charts were computed with.
    pub params: ChartsConfig,
    pub record_count: usize,
    pub dispositions: BTreeMap<Disposition, usize>,
    /// Stellar temperature against stellar radius.
    pub steff_vs_srad: Vec<ScatterPoint>,
    pub duration_by_disposition: Vec<CategoryValue>,
    pub steff_histogram: Vec<HistogramBin>,
    pub slogg_histogram: Vec<HistogramBin>,
    pub snr_histogram: Vec<HistogramBin>,
    /// In log10(depth) space.
    pub depth_histogram: Vec<HistogramBin>,
    /// In log10(period) space.
    pub period_histogram: Vec<HistogramBin>,
}

impl ChartSet {
    /// Compute all charts for `records`.
    pub fn compute(records: &[DatasetRecord], params: &ChartsConfig) -> Self {
        debug!("Computing charts for {} records", records.len());
        Self {
            params: params.clone(),
            record_count: records.len(),
            dispositions: disposition_counts(records),
            steff_vs_srad: scatter(records, NumericField::Steff, NumericField::Srad),
            duration_by_disposition: aggregate_by_disposition(
                records,
                NumericField::Duration,
                params.duration_statistic,
            ),
            steff_histogram: linear_histogram(records, NumericField::Steff, params.steff_step),
            slogg_histogram: linear_histogram(records, NumericField::Slogg, params.slogg_step),
            snr_histogram: edge_histogram(records, NumericField::ModelSnr, &params.snr_edges),
            depth_histogram: log_histogram(records, NumericField::Depth, params.depth_log_step),
            period_histogram: log_histogram(
                records,
                NumericField::Period,
                params.period_log_step,
            ),
        }
    }

    /// Histograms with their titles, in dashboard order.
    pub fn histograms(&self) -> Vec<(&'static str, &[HistogramBin])> {
        vec![
            ("Stellar Effective Temperature (K)", self.steff_histogram.as_slice()),
            ("Stellar Surface Gravity (log g)", self.slogg_histogram.as_slice()),
            ("Model SNR", self.snr_histogram.as_slice()),
            ("Transit Depth, log10(ppm)", self.depth_histogram.as_slice()),
            ("Orbital Period, log10(days)", self.period_histogram.as_slice()),
        ]
    }
}

/// An immutable copy of the currently selected dataset.
///
/// Charts are computed the first time they are asked for and kept until
/// the snapshot itself is dropped.
#[derive(Debug)]
pub struct DatasetSnapshot {
    source: String,
    records: Vec<DatasetRecord>,
    params: ChartsConfig,
    charts: OnceLock<ChartSet>,
}

impl DatasetSnapshot {
    pub fn new(
        source: impl Into<String>,
        records: Vec<DatasetRecord>,
        params: ChartsConfig,
    ) -> Self {
        Self {
            source: source.into(),
            records,
            params,
            charts: OnceLock::new(),
        }
    }

    /// Where the records came from (service URL or file path).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find rows by KOI designation, ignoring case and surrounding blanks.
    pub fn find_by_kepoi(&self, kepoi_name: &str) -> Vec<&DatasetRecord> {
        let key = kepoi_name.trim().to_uppercase();
        self.records
            .iter()
            .filter(|r| {
                r.kepoi_name
                    .as_deref()
                    .is_some_and(|k| k.trim().to_uppercase() == key)
            })
            .collect()
    }

    pub fn charts(&self) -> &ChartSet {
        self.charts
            .get_or_init(|| ChartSet::compute(&self.records, &self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_records() -> Vec<DatasetRecord> {
        serde_json::from_value(json!([
            {
                "kepid": 1234567, "kepler_name": "Kepler-22 b", "kepoi_name": "K02200.01",
                "koi_steff": 5778, "koi_disposition": "CANDIDATE", "koi_duration": 3.7,
                "koi_srad": 1.02, "koi_slogg": 4.44, "koi_model_snr": 12.3,
                "koi_depth": 850.0, "koi_period": 12.345
            },
            {
                "kepid": "9876543", "kepler_name": null, "kepoi_name": "KOI-351.01",
                "koi_steff": 6100, "koi_disposition": "CONFIRMED", "koi_duration": 5.1,
                "koi_srad": 1.3, "koi_slogg": 4.2, "koi_model_snr": 18.9,
                "koi_depth": 520.0, "koi_period": 331.6
            },
            {
                "kepid": 42, "kepoi_name": "K00042.01", "koi_disposition": "FALSE POSITIVE",
                "koi_steff": null, "koi_duration": 2.0
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_chart_set_uses_default_params() {
        let records = sample_records();
        let charts = ChartSet::compute(&records, &ChartsConfig::default());

        assert_eq!(charts.record_count, 3);
        assert_eq!(charts.dispositions.get(&Disposition::Confirmed), Some(&1));
        assert_eq!(charts.steff_vs_srad.len(), 2);
        assert_eq!(charts.duration_by_disposition.len(), 3);
        assert_eq!(charts.steff_histogram.len(), 2);
        assert_eq!(charts.steff_histogram[0].label, "6000–6250");
        assert_eq!(charts.snr_histogram.len(), 2);
        assert_eq!(charts.snr_histogram[0].label, "10.0–30.0");
        assert_eq!(charts.depth_histogram.len(), 2);
        assert_eq!(charts.period_histogram.len(), 2);
        assert_eq!(charts.histograms().len(), 5);
    }

    #[test]
    fn test_snapshot_caches_charts() {
        let snapshot = DatasetSnapshot::new("test", sample_records(), ChartsConfig::default());
        let first = snapshot.charts() as *const ChartSet;
        let second = snapshot.charts() as *const ChartSet;
        assert_eq!(first, second);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.source(), "test");
    }

    #[test]
    fn test_find_by_kepoi_ignores_case() {
        let snapshot = DatasetSnapshot::new("test", sample_records(), ChartsConfig::default());
        let found = snapshot.find_by_kepoi(" koi-351.01 ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kepid, "9876543");
        assert!(snapshot.find_by_kepoi("K99999.01").is_empty());
    }
}

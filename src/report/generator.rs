//! Markdown and JSON chart reports.
//!
//! A report is the chart suite of one dataset snapshot plus the metadata
//! needed to reproduce it (source, record count, chart parameters).

use crate::analysis::{ChartSet, DatasetSnapshot};
use crate::models::{CategoryValue, Disposition, HistogramBin, ScatterPoint};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a rendered report is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartReport {
    /// Where the dataset came from (service URL or file path).
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub charts: ChartSet,
}

impl ChartReport {
    pub fn from_snapshot(snapshot: &DatasetSnapshot) -> Self {
        Self {
            source: snapshot.source().to_string(),
            generated_at: Utc::now(),
            charts: snapshot.charts().clone(),
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ChartReport) -> String {
    let mut output = String::new();

    output.push_str("# Exoscope Chart Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_table_of_contents(&report.charts));
    output.push_str(&generate_dispositions_section(&report.charts));
    output.push_str(&generate_duration_section(&report.charts.duration_by_disposition));
    output.push_str(&generate_scatter_section(&report.charts.steff_vs_srad));

    output.push_str("## Histograms\n\n");
    for (title, bins) in report.charts.histograms() {
        output.push_str(&generate_histogram_section(title, bins));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ChartReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_metadata_section(report: &ChartReport) -> String {
    let params = &report.charts.params;
    let edges: Vec<String> = params.snr_edges.iter().map(|e| e.to_string()).collect();

    let mut section = String::new();
    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", report.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", report.charts.record_count));
    section.push_str(&format!(
        "- **Bins:** steff {} K, slogg {}, SNR edges [{}], depth {} dex, period {} dex\n",
        params.steff_step,
        params.slogg_step,
        edges.join(", "),
        params.depth_log_step,
        params.period_log_step
    ));
    section.push_str(&format!(
        "- **Duration statistic:** {}\n\n",
        params.duration_statistic
    ));
    section
}

fn generate_table_of_contents(charts: &ChartSet) -> String {
    let mut toc = String::new();
    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Dispositions](#dispositions)\n");
    toc.push_str("- [Transit Duration](#transit-duration)\n");
    toc.push_str("- [Temperature vs Radius](#temperature-vs-radius)\n");
    toc.push_str("- [Histograms](#histograms)\n");
    for (title, _) in charts.histograms() {
        toc.push_str(&format!("  - [{}](#{})\n", title, anchor(title)));
    }
    toc.push('\n');
    toc
}

fn generate_dispositions_section(charts: &ChartSet) -> String {
    let mut section = String::new();
    section.push_str("## Dispositions\n\n");

    if charts.record_count == 0 {
        section.push_str("The dataset is empty.\n\n");
        return section;
    }

    section.push_str("| Disposition | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for disposition in Disposition::ALL {
        let count = charts.dispositions.get(&disposition).copied().unwrap_or(0);
        let share = count as f64 * 100.0 / charts.record_count as f64;
        section.push_str(&format!("| {} | {} | {:.1}% |\n", disposition, count, share));
    }
    section.push_str(&format!("| **Total** | **{}** | |\n\n", charts.record_count));
    section
}

fn generate_duration_section(values: &[CategoryValue]) -> String {
    let mut section = String::new();
    section.push_str("## Transit Duration\n\n");

    let statistic = values
        .first()
        .map(|v| v.statistic.to_string())
        .unwrap_or_else(|| "mean".to_string());
    section.push_str(&format!("| Disposition | {} (hours) | Samples |\n", statistic));
    section.push_str("|:---|:---:|:---:|\n");
    for value in values {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            value.disposition,
            format_value(value.value),
            value.samples
        ));
    }
    section.push('\n');
    section
}

fn generate_scatter_section(points: &[ScatterPoint]) -> String {
    let mut section = String::new();
    section.push_str("## Temperature vs Radius\n\n");

    if points.is_empty() {
        section.push_str("No records carry both a temperature and a radius.\n\n");
        return section;
    }

    section.push_str("| Disposition | Points | Teff range (K) | Radius range (R☉) |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for disposition in Disposition::ALL {
        let group: Vec<&ScatterPoint> = points
            .iter()
            .filter(|p| p.disposition == disposition)
            .collect();
        if group.is_empty() {
            continue;
        }
        let (x_min, x_max) = min_max(group.iter().map(|p| p.x));
        let (y_min, y_max) = min_max(group.iter().map(|p| p.y));
        section.push_str(&format!(
            "| {} | {} | {:.0}–{:.0} | {:.2}–{:.2} |\n",
            disposition,
            group.len(),
            x_min,
            x_max,
            y_min,
            y_max
        ));
    }
    section.push('\n');
    section
}

/// One table per histogram: a row per bucket, a column per disposition.
fn generate_histogram_section(title: &str, bins: &[HistogramBin]) -> String {
    let mut section = String::new();
    section.push_str(&format!("### {}\n\n", title));

    if bins.is_empty() {
        section.push_str("*No data.*\n\n");
        return section;
    }

    section.push_str("| Range |");
    for disposition in Disposition::ALL {
        section.push_str(&format!(" {} |", disposition));
    }
    section.push_str("\n|:---|");
    for _ in Disposition::ALL {
        section.push_str(":---:|");
    }
    section.push('\n');

    for row in histogram_rows(bins) {
        section.push_str(&format!("| {} |", row.label));
        for count in row.counts {
            section.push_str(&format!(" {} |", count));
        }
        section.push('\n');
    }
    section.push('\n');
    section
}

struct HistogramRow {
    start: f64,
    label: String,
    counts: [usize; 3],
}

fn histogram_rows(bins: &[HistogramBin]) -> Vec<HistogramRow> {
    let mut rows: Vec<HistogramRow> = Vec::new();
    for bin in bins {
        let column = Disposition::ALL
            .iter()
            .position(|d| *d == bin.disposition)
            .unwrap_or(0);
        match rows.iter_mut().find(|r| r.label == bin.label) {
            Some(row) => row.counts[column] += bin.count,
            None => {
                let mut counts = [0; 3];
                counts[column] = bin.count;
                rows.push(HistogramRow {
                    start: bin.start,
                    label: bin.label.clone(),
                    counts,
                });
            }
        }
    }
    rows.sort_by(|a, b| a.start.total_cmp(&b.start));
    rows
}

fn generate_footer() -> String {
    let mut footer = String::new();
    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by exoscope v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));
    footer
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "n/a".to_string()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChartsConfig;
    use crate::models::{BinScale, DatasetRecord};

    fn record(disposition: Disposition, steff: f64, srad: f64, duration: f64) -> DatasetRecord {
        DatasetRecord {
            kepid: "1".to_string(),
            kepler_name: None,
            kepoi_name: None,
            name: None,
            koi_steff: Some(steff),
            koi_disposition: disposition,
            koi_duration: Some(duration),
            koi_srad: Some(srad),
            koi_slogg: Some(4.4),
            koi_model_snr: Some(12.0),
            koi_depth: Some(500.0),
            koi_period: Some(10.0),
        }
    }

    fn create_test_report() -> ChartReport {
        let records = vec![
            record(Disposition::Confirmed, 5800.0, 1.0, 3.0),
            record(Disposition::Confirmed, 5900.0, 1.1, 5.0),
            record(Disposition::FalsePositive, 6100.0, 1.4, 2.0),
        ];
        let snapshot = DatasetSnapshot::new("fixture.json", records, ChartsConfig::default());
        ChartReport::from_snapshot(&snapshot)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Exoscope Chart Report"));
        assert!(markdown.contains("- **Source:** fixture.json"));
        assert!(markdown.contains("- **Records:** 3"));
        assert!(markdown.contains("## Dispositions"));
        assert!(markdown.contains("| CONFIRMED | 2 | 66.7% |"));
        assert!(markdown.contains("### Model SNR"));
        assert!(markdown.contains("| 10.0–30.0 | 2 | 0 | 1 |"));
    }

    #[test]
    fn test_duration_section_marks_empty_category() {
        let report = create_test_report();
        let mut values = report.charts.duration_by_disposition.clone();
        values.push(CategoryValue {
            disposition: Disposition::Candidate,
            value: f64::NAN,
            statistic: values[0].statistic,
            samples: 0,
        });
        let section = generate_duration_section(&values);

        assert!(section.contains("mean (hours)"));
        assert!(section.contains("| CONFIRMED | 4.00 | 2 |"));
        assert!(section.contains("| FALSE POSITIVE | 2.00 | 1 |"));
        assert!(section.contains("| CANDIDATE | n/a | 0 |"));
    }

    #[test]
    fn test_histogram_rows_merge_dispositions() {
        let bin = |start: f64, label: &str, count, disposition| HistogramBin {
            start,
            end: start + 250.0,
            label: label.to_string(),
            count,
            disposition,
            scale: BinScale::Linear,
        };
        let bins = vec![
            bin(6000.0, "6000–6250", 1, Disposition::Confirmed),
            bin(5750.0, "5750–6000", 2, Disposition::Confirmed),
            bin(5750.0, "5750–6000", 4, Disposition::FalsePositive),
        ];

        let rows = histogram_rows(&bins);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "5750–6000");
        assert_eq!(rows[0].counts, [2, 0, 4]);
        assert_eq!(rows[1].counts, [1, 0, 0]);
    }

    #[test]
    fn test_empty_dataset() {
        let snapshot = DatasetSnapshot::new("empty", Vec::new(), ChartsConfig::default());
        let markdown = generate_markdown_report(&ChartReport::from_snapshot(&snapshot));

        assert!(markdown.contains("The dataset is empty."));
        assert!(markdown.contains("*No data.*"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"source\""));
        assert!(json.contains("\"steff_histogram\""));
        assert!(json.contains("\"record_count\": 3"));
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("Orbital Period, log10(days)"), "orbital-period-log10days");
    }
}

//! Data models for the KOI dataset and the ML service payloads.
//!
//! This module contains the dataset record decoded from the ML service,
//! the chart data structures produced by the aggregator, and the typed
//! request/response bodies exchanged with the service.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Classification label of a KOI.
///
/// Variant order is the order charts list the categories in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Disposition {
    Confirmed,
    Candidate,
    FalsePositive,
}

impl Disposition {
    /// All dispositions in display order.
    pub const ALL: [Disposition; 3] = [
        Disposition::Confirmed,
        Disposition::Candidate,
        Disposition::FalsePositive,
    ];

    /// The label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Confirmed => "CONFIRMED",
            Disposition::Candidate => "CANDIDATE",
            Disposition::FalsePositive => "FALSE POSITIVE",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CONFIRMED" => Ok(Disposition::Confirmed),
            "CANDIDATE" => Ok(Disposition::Candidate),
            "FALSE POSITIVE" | "FALSE_POSITIVE" => Ok(Disposition::FalsePositive),
            other => Err(format!(
                "unknown disposition '{}', expected CONFIRMED, CANDIDATE or FALSE POSITIVE",
                other
            )),
        }
    }
}

impl Serialize for Disposition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Disposition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `kepid` as it may arrive on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawKepid {
    Int(i64),
    Text(String),
}

fn deserialize_kepid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match RawKepid::deserialize(deserializer) {
        Ok(RawKepid::Int(id)) => Ok(id.to_string()),
        Ok(RawKepid::Text(id)) => Ok(id.trim().to_string()),
        Err(_) => Err(serde::de::Error::custom(
            "invalid type for kepid, expected an integer or a string",
        )),
    }
}

/// Treat empty strings as absent.
fn deserialize_name<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// One KOI row of the dataset as served by `/GeneralData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Kepler input catalog identifier, normalized to a string.
    #[serde(deserialize_with = "deserialize_kepid")]
    pub kepid: String,
    /// Official catalog name (e.g. "Kepler-22 b"), when confirmed.
    #[serde(default, deserialize_with = "deserialize_name")]
    pub kepler_name: Option<String>,
    /// KOI designation (e.g. "K02200.01").
    #[serde(default, deserialize_with = "deserialize_name")]
    pub kepoi_name: Option<String>,
    /// Explicit display name chosen by the service.
    #[serde(default, deserialize_with = "deserialize_name")]
    pub name: Option<String>,
    /// Stellar effective temperature (K).
    #[serde(default)]
    pub koi_steff: Option<f64>,
    pub koi_disposition: Disposition,
    /// Transit duration (hours).
    #[serde(default)]
    pub koi_duration: Option<f64>,
    /// Stellar radius (solar radii).
    #[serde(default)]
    pub koi_srad: Option<f64>,
    /// Stellar surface gravity, log10(cm/s^2).
    #[serde(default)]
    pub koi_slogg: Option<f64>,
    /// Transit signal-to-noise ratio.
    #[serde(default)]
    pub koi_model_snr: Option<f64>,
    /// Transit depth (ppm).
    #[serde(default)]
    pub koi_depth: Option<f64>,
    /// Orbital period (days).
    #[serde(default)]
    pub koi_period: Option<f64>,
}

impl DatasetRecord {
    /// Name shown to the user: explicit name, then catalog name, then KOI
    /// designation, then the numeric identifier.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.kepler_name.as_deref())
            .or(self.kepoi_name.as_deref())
            .unwrap_or(&self.kepid)
    }

    /// Read one numeric field.
    pub fn field(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Steff => self.koi_steff,
            NumericField::Duration => self.koi_duration,
            NumericField::Srad => self.koi_srad,
            NumericField::Slogg => self.koi_slogg,
            NumericField::ModelSnr => self.koi_model_snr,
            NumericField::Depth => self.koi_depth,
            NumericField::Period => self.koi_period,
        }
    }
}

/// Numeric observational columns of a [`DatasetRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Steff,
    Duration,
    Srad,
    Slogg,
    ModelSnr,
    Depth,
    Period,
}

impl NumericField {
    /// Column name in the dataset.
    pub fn column(&self) -> &'static str {
        match self {
            NumericField::Steff => "koi_steff",
            NumericField::Duration => "koi_duration",
            NumericField::Srad => "koi_srad",
            NumericField::Slogg => "koi_slogg",
            NumericField::ModelSnr => "koi_model_snr",
            NumericField::Depth => "koi_depth",
            NumericField::Period => "koi_period",
        }
    }
}

/// Coordinate space of a histogram bucket's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinScale {
    Linear,
    Log10,
}

/// One histogram bucket for one disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower bound (in `scale` space).
    pub start: f64,
    /// Upper bound (in `scale` space).
    pub end: f64,
    pub label: String,
    pub count: usize,
    pub disposition: Disposition,
    pub scale: BinScale,
}

/// Central-tendency statistic selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Median => write!(f, "median"),
        }
    }
}

impl FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "media" | "average" => Ok(Statistic::Mean),
            "median" | "mediana" => Ok(Statistic::Median),
            other => Err(format!("unknown statistic '{}', expected mean or median", other)),
        }
    }
}

/// Aggregated value of one field for one disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub disposition: Disposition,
    pub value: f64,
    pub statistic: Statistic,
    /// Number of valid values that went into `value`.
    pub samples: usize,
}

/// A point of a two-field scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub disposition: Disposition,
}

// === ML service payloads ===

/// RandomForest hyperparameters. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mxdepth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randstate: Option<u32>,
}

impl Hyperparams {
    pub fn is_empty(&self) -> bool {
        self.numest.is_none() && self.mxdepth.is_none() && self.randstate.is_none()
    }
}

/// Answer of a hyperparameter update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    #[serde(default)]
    pub updated: BTreeMap<String, serde_json::Value>,
    pub train: bool,
    #[serde(default)]
    pub model_info: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvListing {
    pub csvs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSelection {
    pub selected: String,
    #[serde(default)]
    pub retrain: Option<bool>,
    #[serde(default)]
    pub model_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvUpload {
    pub saved: String,
    #[serde(default)]
    pub retrain: Option<bool>,
    #[serde(default)]
    pub model_info: Option<serde_json::Value>,
}

/// Model output for one KOI row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(flatten)]
    pub record: DatasetRecord,
    pub prediction: String,
    #[serde(default)]
    pub probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    /// Probability of the predicted class, if the service reported it.
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities.get(&self.prediction).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResults {
    pub results: Vec<Prediction>,
}

/// Per-class scores of the trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrecision {
    pub accuracy: f64,
    #[serde(default)]
    pub aggregates: BTreeMap<String, f64>,
    #[serde(default)]
    pub per_class: BTreeMap<String, ClassStats>,
}

impl ModelPrecision {
    pub fn class(&self, disposition: Disposition) -> Option<&ClassStats> {
        self.per_class.get(disposition.as_str())
    }

    pub fn macro_avg(&self) -> Option<&ClassStats> {
        self.per_class.get("macro avg")
    }

    pub fn weighted_avg(&self) -> Option<&ClassStats> {
        self.per_class.get("weighted avg")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub path: String,
}

/// Body of `/GeneratePlanetImage`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub kepoi_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_extra: Option<String>,
}

//! Client for the remote ML inference/training service.
//!
//! The service trains a classifier on a Kepler KOI CSV and exposes the
//! processed dataset, per-KOI predictions, CSV management, model scores,
//! server-side explanations and generated planet images.

use crate::client::{read_json, read_success_bytes, read_value, ClientError};
use crate::models::{
    CsvListing, CsvSelection, CsvUpload, DatasetRecord, Explanation, GeneratedImage,
    Hyperparams, ImageRequest, ModelPrecision, PredictionResults, TrainingOutcome,
};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Header carrying the file name of a raw CSV upload.
pub const FILENAME_HEADER: &str = "X-Filename";

/// An image downloaded from the service.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageBytes {
    /// File extension matching the content type, `png` when unknown.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_deref() {
            Some(ct) if ct.contains("jpeg") || ct.contains("jpg") => "jpg",
            Some(ct) if ct.contains("webp") => "webp",
            _ => "png",
        }
    }
}

/// Typed client for the ML service.
#[derive(Debug, Clone)]
pub struct MlClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MlClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a client sharing an existing connection pool.
    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url)?;
        info!("ML service at {}", base_url);
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `base_url/segment/segment...`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<reqwest::Response, ClientError> {
        request
            .send()
            .await
            .map_err(|e| ClientError::network(context, &e))
    }

    /// Processed dataset of the current CSV (`GET /GeneralData`).
    pub async fn general_data(&self) -> Result<Vec<DatasetRecord>, ClientError> {
        let context = "loading the dataset";
        let url = self.endpoint(&["GeneralData"])?;
        let response = self.send(self.http.get(url), context).await?;
        let records: Vec<DatasetRecord> = read_json(response, context).await?;
        debug!("Loaded {} records", records.len());
        Ok(records)
    }

    /// Rows matching a KOI designation (`GET /planet/kepoi/{koi}`).
    pub async fn planet_by_kepoi(
        &self,
        kepoi_name: &str,
    ) -> Result<Vec<DatasetRecord>, ClientError> {
        let context = format!("fetching planet {}", kepoi_name);
        let url = self.endpoint(&["planet", "kepoi", kepoi_name])?;
        let response = self.send(self.http.get(url), &context).await?;
        read_json(response, &context).await
    }

    /// CSV files stored on the service (`GET /csvs`).
    pub async fn list_csvs(&self) -> Result<Vec<String>, ClientError> {
        let context = "listing datasets";
        let url = self.endpoint(&["csvs"])?;
        let response = self.send(self.http.get(url), context).await?;
        let listing: CsvListing = read_json(response, context).await?;
        Ok(listing.csvs)
    }

    /// Make a stored CSV the current dataset (`POST /csvs/select/{name}.csv`).
    pub async fn select_csv(&self, name: &str, retrain: bool) -> Result<CsvSelection, ClientError> {
        let file_name = csv_file_name(name);
        let context = format!("selecting dataset {}", file_name);
        let mut url = self.endpoint(&["csvs", "select", &file_name])?;
        if retrain {
            url.query_pairs_mut().append_pair("retrain", "1");
        }
        let response = self.send(self.http.post(url), &context).await?;
        read_json(response, &context).await
    }

    /// Upload a local CSV as the current dataset (`POST /upload_raw`).
    pub async fn upload_csv(&self, path: &Path, retrain: bool) -> Result<CsvUpload, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
            })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.upload_csv_bytes(&file_name, bytes, retrain).await
    }

    /// Upload raw CSV content under `file_name`.
    pub async fn upload_csv_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        retrain: bool,
    ) -> Result<CsvUpload, ClientError> {
        let context = format!("uploading {}", file_name);
        let mut url = self.endpoint(&["upload_raw"])?;
        if retrain {
            url.query_pairs_mut().append_pair("retrain", "1");
        }
        let name_header = HeaderValue::from_str(file_name).map_err(|_| ClientError::Io {
            path: file_name.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file name is not a valid header value",
            ),
        })?;
        info!("Uploading {} ({} bytes)", file_name, bytes.len());
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(FILENAME_HEADER, name_header)
            .body(bytes);
        let response = self.send(request, &context).await?;
        read_json(response, &context).await
    }

    /// Update hyperparameters and retrain (`POST /config/hyperparams`).
    pub async fn update_hyperparams(
        &self,
        params: &Hyperparams,
    ) -> Result<TrainingOutcome, ClientError> {
        let context = "updating hyperparameters";
        let url = self.endpoint(&["config", "hyperparams"])?;
        let response = self.send(self.http.post(url).json(params), context).await?;
        read_json(response, context).await
    }

    /// Model prediction for one KOI (`GET /predict/{kepid}`).
    pub async fn predict(&self, kepid: &str) -> Result<PredictionResults, ClientError> {
        let context = format!("predicting kepid {}", kepid);
        let url = self.endpoint(&["predict", kepid])?;
        let response = self.send(self.http.get(url), &context).await?;
        read_json(response, &context).await
    }

    /// Precision/recall scores of the trained model (`GET /model_precision`).
    pub async fn model_precision(&self) -> Result<ModelPrecision, ClientError> {
        let context = "fetching model precision";
        let url = self.endpoint(&["model_precision"])?;
        let response = self.send(self.http.get(url), context).await?;
        read_json(response, context).await
    }

    /// Service-side explanation of the whole model (`GET /Gemini/ExplainGeneral`).
    pub async fn explain_general(&self) -> Result<String, ClientError> {
        let context = "asking for the general explanation";
        let url = self.endpoint(&["Gemini", "ExplainGeneral"])?;
        let response = self.send(self.http.get(url), context).await?;
        let explanation: Explanation = read_json(response, context).await?;
        Ok(explanation.explanation)
    }

    /// Service-side explanation of one KOI (`GET /Gemini/ExplainSpecific/{koi}`).
    pub async fn explain_specific(&self, kepoi_name: &str) -> Result<String, ClientError> {
        let context = format!("asking for the explanation of {}", kepoi_name);
        let url = self.endpoint(&["Gemini", "ExplainSpecific", kepoi_name])?;
        let response = self.send(self.http.get(url), &context).await?;
        let explanation: Explanation = read_json(response, &context).await?;
        Ok(explanation.explanation)
    }

    /// Render a planet image on the service (`POST /GeneratePlanetImage`).
    pub async fn generate_planet_image(
        &self,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, ClientError> {
        let context = format!("generating an image of {}", request.kepoi_name);
        let url = self.endpoint(&["GeneratePlanetImage"])?;
        let response = self.send(self.http.post(url).json(request), &context).await?;
        read_json(response, &context).await
    }

    /// Download a generated planet image (`GET /ExoplanetImage/{koi}`).
    pub async fn exoplanet_image(&self, kepoi_name: &str) -> Result<ImageBytes, ClientError> {
        let context = format!("downloading the image of {}", kepoi_name);
        let url = self.endpoint(&["ExoplanetImage", kepoi_name])?;
        let response = self.send(self.http.get(url), &context).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = read_success_bytes(response, &context).await?;
        Ok(ImageBytes {
            content_type,
            bytes,
        })
    }

    /// Forward a JSON request unchanged and return the JSON answer.
    pub async fn forward_json(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(segments)?;
        let context = format!("forwarding {} {}", method, url.path());
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(request, &context).await?;
        read_value(response, &context).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim()).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(url)
}

/// Stored datasets are addressed by file name; accept names with or
/// without the `.csv` suffix.
fn csv_file_name(name: &str) -> String {
    let name = name.trim();
    if name.to_lowercase().ends_with(".csv") {
        name.to_string()
    } else {
        format!("{}.csv", name)
    }
}

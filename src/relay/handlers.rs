//! Relay route handlers.

use crate::client::ExplanationSubject;
use crate::relay::{AppState, RelayError};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::Method;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /
pub async fn root() -> &'static str {
    "Hello World from the exoscope relay!"
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "exoscope-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "modelId", default)]
    pub model_id: Option<Value>,
    #[serde(default)]
    pub input: Value,
}

/// KOI identifier carried by a predict input: a bare integer or string,
/// or an object with a `kepid` field.
pub fn kepid_from_input(input: &Value) -> Option<String> {
    match input {
        Value::Number(n) => n
            .as_u64()
            .map(|id| id.to_string())
            .or_else(|| n.as_i64().map(|id| id.to_string())),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Object(map) => match map.get("kepid") {
            Some(inner @ (Value::Number(_) | Value::String(_))) => kepid_from_input(inner),
            _ => None,
        },
        _ => None,
    }
}

/// POST /predict
///
/// Forwards to `GET {ml}/predict/{kepid}` and echoes the input next to the
/// service's answer.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(request) = payload?;
    let kepid = kepid_from_input(&request.input).ok_or_else(|| {
        RelayError::BadRequest("Missing 'input' with a kepid to predict".to_string())
    })?;
    debug!("Predict kepid {} (model {:?})", kepid, request.model_id);

    let response = state
        .ml
        .forward_json(Method::GET, &["predict", &kepid], None)
        .await?;

    Ok(Json(json!({
        "response": response,
        "input": request.input,
    })))
}

/// POST /tune
///
/// Forwards the hyperparameters to `POST {ml}/config/hyperparams`.
pub async fn tune(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(body) = payload?;
    info!("Forwarding hyperparameter update");
    let response = state
        .ml
        .forward_json(Method::POST, &["config", "hyperparams"], Some(&body))
        .await?;
    Ok(Json(response))
}

/// POST /upload-csv
///
/// Forwards `{csv, filename, retrain}` to `POST {ml}/upload_csv`.
pub async fn upload_csv(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(body) = payload?;
    info!("Forwarding CSV upload");
    let response = state
        .ml
        .forward_json(Method::POST, &["upload_csv"], Some(&body))
        .await?;
    Ok(Json(response))
}

/// GET /gemini/explain, subject overrides in the query string.
pub async fn explain_query(
    State(state): State<AppState>,
    Query(subject): Query<ExplanationSubject>,
) -> Result<Json<Value>, RelayError> {
    explain(&state, &subject).await
}

/// POST /gemini/explain, subject overrides in an optional JSON body.
///
/// An empty body explains the default subject; a body that is not a JSON
/// subject answers 400.
pub async fn explain_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let subject = if body.iter().all(u8::is_ascii_whitespace) {
        ExplanationSubject::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            RelayError::BadRequest(format!("Invalid explanation subject: {}", e))
        })?
    };
    explain(&state, &subject).await
}

async fn explain(
    state: &AppState,
    subject: &ExplanationSubject,
) -> Result<Json<Value>, RelayError> {
    let explanation = state
        .gemini
        .explain(subject)
        .await
        .map_err(RelayError::Explanation)?;
    Ok(Json(json!({ "explanation": explanation })))
}

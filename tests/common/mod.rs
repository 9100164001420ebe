//! In-process stand-ins for the ML service and the Gemini API.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use exoscope::client::{GeminiClient, MlClient};
use exoscope::config::GeminiConfig;
use exoscope::relay::{build_router, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const GENERAL_DATA: &str = include_str!("../../fixtures/general_data.json");
pub const GEMINI_KEY: &str = "test-key";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fixture_rows() -> Vec<Value> {
    serde_json::from_str(GENERAL_DATA).unwrap()
}

fn retrain_flag(query: &HashMap<String, String>) -> bool {
    query.get("retrain").map(|v| v == "1").unwrap_or(false)
}

async fn select_csv(
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if name == "missing.csv" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "CSV not found"})));
    }
    let retrain = retrain_flag(&query);
    (
        StatusCode::OK,
        Json(json!({"selected": name, "retrain": retrain})),
    )
}

async fn upload_raw(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<Value> {
    let name = headers
        .get("X-Filename")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload.csv")
        .to_string();
    Json(json!({
        "saved": name,
        "retrain": retrain_flag(&query),
        "model_info": {"bytes": body.len()},
    }))
}

/// A fake ML service answering from `fixtures/general_data.json`.
///
/// kepid `0` answers 404 and kepid `500` answers a 200 carrying an
/// `{"error": ...}` body.
pub fn fake_ml_service() -> Router {
    Router::new()
        .route(
            "/GeneralData",
            get(|| async { ([(CONTENT_TYPE, "application/json")], GENERAL_DATA) }),
        )
        .route(
            "/planet/kepoi/:koi",
            get(|Path(koi): Path<String>| async move {
                let rows: Vec<Value> = fixture_rows()
                    .into_iter()
                    .filter(|r| r["kepoi_name"] == koi.as_str())
                    .collect();
                Json(Value::Array(rows))
            }),
        )
        .route(
            "/csvs",
            get(|| async { Json(json!({"csvs": ["cumulative.csv", "k2.csv"]})) }),
        )
        .route("/csvs/select/:name", post(select_csv))
        .route("/upload_raw", post(upload_raw))
        .route(
            "/upload_csv",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "saved": body.get("filename").cloned().unwrap_or(json!("uploaded.csv")),
                    "retrain": body.get("retrain").cloned().unwrap_or(json!(false)),
                }))
            }),
        )
        .route(
            "/predict/:kepid",
            get(|Path(kepid): Path<String>| async move {
                match kepid.as_str() {
                    "0" => (StatusCode::NOT_FOUND, Json(json!({"error": "kepid not found"}))),
                    "500" => (StatusCode::OK, Json(json!({"error": "model not trained"}))),
                    _ => {
                        let results: Vec<Value> = fixture_rows()
                            .into_iter()
                            .filter(|r| r["kepid"].to_string().trim_matches('"') == kepid)
                            .map(|mut r| {
                                r["prediction"] = json!("CONFIRMED");
                                r["probabilities"] = json!({
                                    "CONFIRMED": 0.9,
                                    "CANDIDATE": 0.07,
                                    "FALSE POSITIVE": 0.03,
                                });
                                r
                            })
                            .collect();
                        (StatusCode::OK, Json(json!({"results": results})))
                    }
                }
            }),
        )
        .route(
            "/config/hyperparams",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "updated": body,
                    "train": true,
                    "model_info": {"accuracy": 0.91},
                }))
            }),
        )
        .route(
            "/model_precision",
            get(|| async {
                Json(json!({
                    "accuracy": 0.9,
                    "aggregates": {"macro_f1": 0.88},
                    "per_class": {
                        "CONFIRMED": {
                            "precision": 0.92, "recall": 0.9, "f1-score": 0.91, "support": 10
                        },
                        "FALSE POSITIVE": {
                            "precision": 0.85, "recall": 0.88, "f1-score": 0.86, "support": 8
                        },
                        "macro avg": {
                            "precision": 0.88, "recall": 0.89, "f1-score": 0.88, "support": 18
                        }
                    }
                }))
            }),
        )
        .route(
            "/Gemini/ExplainGeneral",
            get(|| async { Json(json!({"explanation": "The model weighs transit depth."})) }),
        )
        .route(
            "/Gemini/ExplainSpecific/:koi",
            get(|Path(koi): Path<String>| async move {
                Json(json!({"explanation": format!("{} looks like a planet.", koi)}))
            }),
        )
        .route(
            "/GeneratePlanetImage",
            post(|Json(body): Json<Value>| async move {
                let koi = body["kepoi_name"].as_str().unwrap_or("unknown").to_string();
                Json(json!({"path": format!("images/{}.png", koi)}))
            }),
        )
        .route(
            "/ExoplanetImage/:koi",
            get(|Path(_koi): Path<String>| async move {
                ([(CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G'])
            }),
        )
        .route(
            "/broken",
            get(|| async { ([(CONTENT_TYPE, "application/json")], "{not json") }),
        )
}

/// A fake `generateContent` endpoint that answers with the prompt it got.
pub fn fake_gemini() -> Router {
    Router::new().route(
        "/models/:call",
        post(
            |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
                if key != Some(GEMINI_KEY) {
                    return (StatusCode::FORBIDDEN, Json(json!({"error": {"message": "bad key"}})))
                        .into_response();
                }
                if !call.ends_with(":generateContent") {
                    return StatusCode::NOT_FOUND.into_response();
                }
                let prompt = body["contents"][0]["parts"][0]["text"].clone();
                Json(json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": prompt}]}}]
                }))
                .into_response()
            },
        ),
    )
}

pub fn gemini_config(api_url: &str, api_key: Option<&str>) -> GeminiConfig {
    GeminiConfig {
        api_url: api_url.to_string(),
        api_key: api_key.map(str::to_string),
        ..Default::default()
    }
}

/// Relay router wired to the given upstreams.
pub fn relay(ml_url: &str, gemini: GeminiConfig) -> Router {
    let state = AppState::new(MlClient::new(ml_url).unwrap(), GeminiClient::new(gemini));
    build_router(state)
}

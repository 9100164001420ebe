//! ML and Gemini client tests against in-process fake services.

mod common;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use common::{fake_gemini, fake_ml_service, gemini_config, spawn, GEMINI_KEY};
use exoscope::client::{
    ClientError, Dashboard, DecodeErrorKind, ExplanationSubject, GeminiClient, MlClient,
};
use exoscope::config::ChartsConfig;
use exoscope::models::{Disposition, Hyperparams, ImageRequest};
use reqwest::Method;
use std::io::Write;
use std::path::Path;

async fn ml() -> MlClient {
    MlClient::new(&spawn(fake_ml_service()).await).unwrap()
}

#[tokio::test]
async fn test_general_data_normalizes_records() {
    let records = ml().await.general_data().await.unwrap();

    assert_eq!(records.len(), 8);
    assert_eq!(records[0].display_name(), "Kepler-227 b");
    // String kepid and empty catalog name.
    assert_eq!(records[2].kepid, "10811496");
    assert_eq!(records[2].display_name(), "K00753.01");
    assert_eq!(records[3].koi_disposition, Disposition::FalsePositive);
    assert_eq!(records[7].koi_duration, None);
}

#[tokio::test]
async fn test_planet_by_kepoi() {
    let rows = ml().await.planet_by_kepoi("K00752.02").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kepler_name.as_deref(), Some("Kepler-227 c"));

    let none = ml().await.planet_by_kepoi("K99999.01").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_csv_management() {
    let client = ml().await;

    let csvs = client.list_csvs().await.unwrap();
    assert_eq!(csvs, vec!["cumulative.csv", "k2.csv"]);

    let selection = client.select_csv("cumulative", true).await.unwrap();
    assert_eq!(selection.selected, "cumulative.csv");
    assert_eq!(selection.retrain, Some(true));

    let err = client.select_csv("missing", false).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("CSV not found"));
}

#[tokio::test]
async fn test_upload_csv_sends_file_name() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(b"kepid,koi_disposition\n1,CONFIRMED\n").unwrap();
    let expected_name = file.path().file_name().unwrap().to_str().unwrap().to_string();

    let upload = ml().await.upload_csv(file.path(), false).await.unwrap();
    assert_eq!(upload.saved, expected_name);
    assert_eq!(upload.retrain, Some(false));
    assert_eq!(upload.model_info.unwrap()["bytes"], 34);
}

#[tokio::test]
async fn test_predict_and_scores() {
    let client = ml().await;

    let predictions = client.predict("10854555").await.unwrap();
    assert_eq!(predictions.results.len(), 1);
    let result = &predictions.results[0];
    assert_eq!(result.record.kepoi_name.as_deref(), Some("K00755.01"));
    assert_eq!(result.prediction, "CONFIRMED");
    assert_eq!(result.confidence(), Some(0.9));

    let precision = client.model_precision().await.unwrap();
    assert_eq!(precision.accuracy, 0.9);
    assert_eq!(precision.class(Disposition::Confirmed).unwrap().support, 10);
    assert!(precision.class(Disposition::Candidate).is_none());
    assert_eq!(precision.macro_avg().unwrap().f1_score, 0.88);
}

#[tokio::test]
async fn test_service_error_body() {
    let err = ml().await.predict("500").await.unwrap_err();
    match err {
        ClientError::Service { message, .. } => assert_eq!(message, "model not trained"),
        other => panic!("expected a service error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_hyperparams() {
    let params = Hyperparams {
        numest: Some(250),
        mxdepth: None,
        randstate: Some(7),
    };
    let outcome = ml().await.update_hyperparams(&params).await.unwrap();

    assert!(outcome.train);
    assert_eq!(outcome.updated.get("numest"), Some(&serde_json::json!(250)));
    assert!(!outcome.updated.contains_key("mxdepth"));
}

#[tokio::test]
async fn test_explanations_and_images() {
    let client = ml().await;

    assert_eq!(
        client.explain_general().await.unwrap(),
        "The model weighs transit depth."
    );
    assert_eq!(
        client.explain_specific("K00752.01").await.unwrap(),
        "K00752.01 looks like a planet."
    );

    let generated = client
        .generate_planet_image(&ImageRequest {
            kepoi_name: "K00752.01".to_string(),
            prompt_extra: Some("blue oceans".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(generated.path, "images/K00752.01.png");

    let image = client.exoplanet_image("K00752.01").await.unwrap();
    assert_eq!(image.extension(), "png");
    assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_decode_failures_are_classified() {
    let malformed = ml()
        .await
        .forward_json(Method::GET, &["broken"], None)
        .await
        .unwrap_err();
    assert_eq!(malformed.decode_kind(), Some(DecodeErrorKind::MalformedJson));

    let app = Router::new()
        .route("/GeneralData", get(|| async { axum::Json(serde_json::json!([{"kepid": 1}])) }))
        .route(
            "/csvs",
            get(|| async { axum::Json(serde_json::json!({"csvs": "cumulative.csv"})) }),
        );
    let client = MlClient::new(&spawn(app).await).unwrap();

    let missing = client.general_data().await.unwrap_err();
    assert_eq!(missing.decode_kind(), Some(DecodeErrorKind::MissingKey));

    let mismatch = client.list_csvs().await.unwrap_err();
    assert_eq!(mismatch.decode_kind(), Some(DecodeErrorKind::TypeMismatch));
}

#[tokio::test]
async fn test_unknown_route_reports_status() {
    let err = ml()
        .await
        .forward_json(Method::GET, &["nowhere"], None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_dashboard_refresh_after_select() {
    let mut dashboard = Dashboard::new(ml().await, ChartsConfig::default());
    assert!(dashboard.snapshot().is_none());

    dashboard.select_csv("k2", false).await.unwrap();
    let snapshot = dashboard.snapshot().unwrap();
    assert_eq!(snapshot.len(), 8);

    let charts = dashboard.cached_charts().unwrap();
    assert_eq!(charts.dispositions.get(&Disposition::Confirmed), Some(&4));
    assert_eq!(charts.dispositions.get(&Disposition::Candidate), Some(&2));
    assert_eq!(charts.dispositions.get(&Disposition::FalsePositive), Some(&2));
}

#[tokio::test]
async fn test_dashboard_clears_snapshot_when_reload_fails() {
    let app = Router::new()
        .route(
            "/csvs/select/:name",
            post(|| async { axum::Json(serde_json::json!({"selected": "k2.csv"})) }),
        )
        .route(
            "/upload_raw",
            post(|| async { axum::Json(serde_json::json!({"saved": "mine.csv"})) }),
        )
        .route(
            "/GeneralData",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "dataset unavailable") }),
        );
    let client = MlClient::new(&spawn(app).await).unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/general_data.json");

    let mut dashboard = Dashboard::new(client, ChartsConfig::default());
    dashboard.load_file(&fixture).unwrap();
    let err = dashboard.select_csv("k2", false).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(dashboard.snapshot().is_none());
    assert!(dashboard.cached_charts().is_none());

    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    csv.write_all(b"kepid,koi_disposition\n1,CONFIRMED\n").unwrap();
    dashboard.load_file(&fixture).unwrap();
    let err = dashboard.upload_csv(csv.path(), false).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(dashboard.snapshot().is_none());
}

#[test]
fn test_dataset_file_lookup_by_kepoi() {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/general_data.json");
    let mut dashboard = Dashboard::new(
        MlClient::new("http://127.0.0.1:9").unwrap(),
        ChartsConfig::default(),
    );
    let snapshot = dashboard.load_file(&fixture).unwrap();
    assert!(!snapshot.is_empty());

    let rows = snapshot.find_by_kepoi("k00753.01");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kepid, "10811496");
    assert_eq!(rows[0].koi_disposition, Disposition::Candidate);
}

#[tokio::test]
async fn test_gemini_generate() {
    let url = spawn(fake_gemini()).await;

    let client = GeminiClient::new(gemini_config(&url, Some(GEMINI_KEY)));
    assert!(client.has_api_key());
    assert_eq!(client.generate("hola").await.unwrap(), "hola");

    let subject = ExplanationSubject {
        object_name: "K00755.01".to_string(),
        ..Default::default()
    };
    assert!(client.explain(&subject).await.unwrap().contains("K00755.01"));

    let rejected = GeminiClient::new(gemini_config(&url, Some("nope")));
    assert_eq!(rejected.generate("hola").await.unwrap_err().status(), Some(403));

    let keyless = GeminiClient::new(gemini_config(&url, Some("   ")));
    assert!(!keyless.has_api_key());
    assert!(matches!(
        keyless.generate("hola").await,
        Err(ClientError::MissingApiKey)
    ));
}

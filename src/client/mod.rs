//! HTTP clients for the remote services.
//!
//! - `ml`: the ML inference/training service (datasets, predictions, images)
//! - `gemini`: the generative-language API used for explanations
//! - `dashboard`: the in-memory dataset snapshot built on top of `ml`

pub mod dashboard;
pub mod error;
pub mod gemini;
pub mod ml;

pub use dashboard::{read_dataset_file, Dashboard};
pub use error::{ClientError, DecodeErrorKind};
pub use gemini::{build_explanation_prompt, ExplanationSubject, GeminiClient};
pub use ml::{ImageBytes, MlClient};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Longest slice of an error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 300;

/// Check the status of `response` and decode its JSON body as `T`.
///
/// A successful body that is an object carrying a string `error` field is
/// reported as [`ClientError::Service`]; the ML service answers some
/// failures that way with a 200 status.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, ClientError> {
    let value = read_value(response, context).await?;
    serde_json::from_value(value).map_err(|e| ClientError::decode(context, &e))
}

/// Like [`read_json`] but keeps the body as an untyped JSON value.
pub(crate) async fn read_value(
    response: reqwest::Response,
    context: &str,
) -> Result<Value, ClientError> {
    let bytes = read_success_bytes(response, context).await?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(context, &e))?;

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(ClientError::Service {
            context: context.to_string(),
            message: message.to_string(),
        });
    }

    Ok(value)
}

/// Return the body of a 2xx response, or a [`ClientError::Status`].
pub(crate) async fn read_success_bytes(
    response: reqwest::Response,
    context: &str,
) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    debug!("{} -> {}", context, status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            context: context.to_string(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::network(context, &e))?;
    Ok(bytes.to_vec())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

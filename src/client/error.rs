//! Error type shared by the service clients.
//!
//! Failures fall in two families: the body could not be decoded
//! ([`ClientError::Decode`]) or the exchange itself failed (network,
//! status, service-reported errors). Every variant renders as a sentence
//! that can be shown to a user as-is.

use serde_json::error::Category;
use std::fmt;
use thiserror::Error;

/// Why a JSON body could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Not JSON, or truncated JSON.
    MalformedJson,
    /// A required key is absent.
    MissingKey,
    /// A value has the wrong type or an unexpected content.
    TypeMismatch,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::MalformedJson => write!(f, "malformed JSON"),
            DecodeErrorKind::MissingKey => write!(f, "missing key"),
            DecodeErrorKind::TypeMismatch => write!(f, "type mismatch"),
        }
    }
}

impl DecodeErrorKind {
    /// Classify a `serde_json` error.
    pub fn classify(err: &serde_json::Error) -> Self {
        match err.classify() {
            Category::Io | Category::Syntax | Category::Eof => DecodeErrorKind::MalformedJson,
            Category::Data => {
                if err.to_string().starts_with("missing field") {
                    DecodeErrorKind::MissingKey
                } else {
                    DecodeErrorKind::TypeMismatch
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error while {context}: {message}")]
    Network { context: String, message: String },

    #[error("HTTP error {status} while {context}{}", body_suffix(.body))]
    Status {
        status: u16,
        context: String,
        body: String,
    },

    #[error("Could not decode the answer while {context} ({kind}): {message}")]
    Decode {
        context: String,
        kind: DecodeErrorKind,
        message: String,
    },

    #[error("The service reported an error while {context}: {message}")]
    Service { context: String, message: String },

    #[error("No Gemini API key configured; set GEMINI_API_KEY or gemini.api_key")]
    MissingApiKey,

    #[error("Empty answer while {0}")]
    EmptyResponse(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

impl ClientError {
    pub fn decode(context: &str, err: &serde_json::Error) -> Self {
        ClientError::Decode {
            context: context.to_string(),
            kind: DecodeErrorKind::classify(err),
            message: err.to_string(),
        }
    }

    pub fn network(context: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            match err.url() {
                Some(url) => format!("cannot connect to {}", url.origin().ascii_serialization()),
                None => "cannot connect to the service".to_string(),
            }
        } else {
            err.to_string()
        };
        ClientError::Network {
            context: context.to_string(),
            message,
        }
    }

    /// HTTP status of the failed exchange, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decode failure kind, if this is a decode error.
    pub fn decode_kind(&self) -> Option<DecodeErrorKind> {
        match self {
            ClientError::Decode { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetRecord;

    fn decode_err(input: &str) -> ClientError {
        let err = serde_json::from_str::<DatasetRecord>(input).unwrap_err();
        ClientError::decode("loading the dataset", &err)
    }

    #[test]
    fn test_classify_malformed_json() {
        assert_eq!(
            decode_err("{not json").decode_kind(),
            Some(DecodeErrorKind::MalformedJson)
        );
        assert_eq!(
            decode_err("{\"kepid\": 1,").decode_kind(),
            Some(DecodeErrorKind::MalformedJson)
        );
    }

    #[test]
    fn test_classify_missing_key() {
        assert_eq!(
            decode_err(r#"{"kepid": 1}"#).decode_kind(),
            Some(DecodeErrorKind::MissingKey)
        );
    }

    #[test]
    fn test_classify_type_mismatch() {
        assert_eq!(
            decode_err(r#"{"kepid": 1, "koi_disposition": "CONFIRMED", "koi_steff": "hot"}"#)
                .decode_kind(),
            Some(DecodeErrorKind::TypeMismatch)
        );
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = ClientError::Status {
            status: 404,
            context: "fetching planet K1".to_string(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP error 404 while fetching planet K1");
        assert_eq!(err.status(), Some(404));

        let err = decode_err(r#"{"kepid": 1}"#);
        let text = err.to_string();
        assert!(text.contains("missing key"), "{}", text);
        assert!(text.contains("koi_disposition"), "{}", text);
    }
}

//! Gemini `generateContent` client and the plain-language explanation prompt.

use crate::client::{read_json, ClientError};
use crate::config::GeminiConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// What the explanation is about. Every field has a default so callers can
/// override only part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationSubject {
    pub object_name: String,
    pub prediction: String,
    pub confidence: String,
    pub key_factors: String,
}

impl Default for ExplanationSubject {
    fn default() -> Self {
        Self {
            object_name: "Kepler-452b".to_string(),
            prediction: "Likely Exoplanet".to_string(),
            confidence: "92%".to_string(),
            key_factors: "Orbital period matches expected range, consistent transit signals, \
                          and minimal noise in the data."
                .to_string(),
        }
    }
}

/// Prompt asking for a jargon-free, three-section explanation of a model
/// result, written in `language`.
pub fn build_explanation_prompt(subject: &ExplanationSubject, language: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert science communicator with the goal of making complex \
         astronomy topics easy to understand.\n\n",
    );
    prompt.push_str(
        "A machine learning model analyzed data for a potential exoplanet and produced \
         the following result. Explain this result for a user on a dashboard. Avoid \
         technical jargon and focus on the meaning of the prediction.\n\n",
    );
    prompt.push_str("Here is the data from the model:\n\n");
    prompt.push_str(&format!("- **Object Name:** {}\n", subject.object_name));
    prompt.push_str(&format!("- **Model Prediction:** {}\n", subject.prediction));
    prompt.push_str(&format!("- **Confidence Score:** {}\n", subject.confidence));
    prompt.push_str(&format!(
        "- **Most Important Reasons for this Prediction:** {}\n\n",
        subject.key_factors
    ));
    prompt.push_str(
        "Please provide a long but simple explanation divided in these three sections: \
         1) Overview, 2) Key Details, 3) Conclusion. Each section should go deep into \
         the topic.\n",
    );
    prompt.push_str(&format!(
        "Your answer should be in {} and only contain the three sections mentioned, \
         do not add anything else.",
        language
    ));
    prompt
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Client for the Gemini generative-language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    pub fn with_http(http: reqwest::Client, config: GeminiConfig) -> Self {
        info!("Gemini model {} at {}", config.model, config.api_url);
        Self { http, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Whether an API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send `prompt` and return the generated text.
    pub async fn generate(&self, prompt: &str) -> Result<String, ClientError> {
        let context = "asking Gemini for an explanation";
        let api_key = self.api_key().ok_or(ClientError::MissingApiKey)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.config.thinking_budget,
                },
            },
        };

        debug!("Sending {} prompt characters to {}", prompt.len(), self.config.model);
        let response = self
            .http
            .post(self.generate_url())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::network(context, &e))?;

        let answer: GenerateContentResponse = read_json(response, context).await?;
        answer
            .text()
            .ok_or_else(|| ClientError::EmptyResponse(context.to_string()))
    }

    /// Plain-language explanation of a model result.
    pub async fn explain(&self, subject: &ExplanationSubject) -> Result<String, ClientError> {
        let prompt = build_explanation_prompt(subject, &self.config.language);
        let text = self.generate(&prompt).await?;
        info!("Received explanation for {}", subject.object_name);
        Ok(text)
    }
}

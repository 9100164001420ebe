//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.exoscope.toml` files.

use crate::models::Statistic;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".exoscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Relay server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// ML service settings.
    #[serde(default)]
    pub ml: MlConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Chart parameters.
    #[serde(default)]
    pub charts: ChartsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Relay HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Remote ML inference/training service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    /// Base URL of the service, e.g. `http://10.0.0.5`.
    #[serde(default = "default_ml_url")]
    pub base_url: String,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            base_url: default_ml_url(),
        }
    }
}

fn default_ml_url() -> String {
    "http://localhost:80".to_string()
}

/// Generative-language (Gemini) API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API root, without the `/models/...` suffix.
    #[serde(default = "default_gemini_url")]
    pub api_url: String,

    /// Model name.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key. Usually left out of the file and given via `GEMINI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Language the explanation is written in.
    #[serde(default = "default_language")]
    pub language: String,

    /// Thinking token budget; 0 disables thinking.
    #[serde(default)]
    pub thinking_budget: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: default_gemini_url(),
            model: default_gemini_model(),
            api_key: None,
            language: default_language(),
            thinking_budget: 0,
        }
    }
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_language() -> String {
    "Spanish".to_string()
}

/// Parameters of the dashboard charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartsConfig {
    /// Bucket width of the temperature histogram (K).
    #[serde(default = "default_steff_step")]
    pub steff_step: f64,

    /// Bucket width of the surface gravity histogram.
    #[serde(default = "default_slogg_step")]
    pub slogg_step: f64,

    /// Ascending bucket edges of the SNR histogram.
    #[serde(default = "default_snr_edges")]
    pub snr_edges: Vec<f64>,

    /// Bucket width of the depth histogram, in log10 space.
    #[serde(default = "default_depth_log_step")]
    pub depth_log_step: f64,

    /// Bucket width of the period histogram, in log10 space.
    #[serde(default = "default_period_log_step")]
    pub period_log_step: f64,

    /// Statistic of the duration-by-disposition chart.
    #[serde(default)]
    pub duration_statistic: Statistic,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            steff_step: default_steff_step(),
            slogg_step: default_slogg_step(),
            snr_edges: default_snr_edges(),
            depth_log_step: default_depth_log_step(),
            period_log_step: default_period_log_step(),
            duration_statistic: Statistic::Mean,
        }
    }
}

fn default_steff_step() -> f64 {
    250.0
}

fn default_slogg_step() -> f64 {
    0.2
}

fn default_snr_edges() -> Vec<f64> {
    vec![0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0]
}

fn default_depth_log_step() -> f64 {
    0.5
}

fn default_period_log_step() -> f64 {
    0.3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence over
    /// config file settings. Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.ml_url {
            self.ml.base_url = url.clone();
        }

        if let Some(ref key) = args.gemini_api_key {
            self.gemini.api_key = Some(key.clone());
        }

        if let Some(ref model) = args.gemini_model {
            self.gemini.model = model.clone();
        }

        if let crate::cli::Command::Serve(ref serve) = args.command {
            if let Some(port) = serve.port {
                self.server.port = port;
            }
            if let Some(ref host) = serve.host {
                self.server.host = host.clone();
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

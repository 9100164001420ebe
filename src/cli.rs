//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Hyperparams;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Exoscope - Kepler KOI dashboard, ML-service client and relay
///
/// Browse the KOI dataset served by the ML service, compute the dashboard
/// charts, manage training CSVs, and run the HTTP relay in front of the
/// service and the Gemini API.
///
/// Examples:
///   exoscope serve --port 8080
///   exoscope charts --format json --output charts.json
///   exoscope charts --input fixtures/general_data.json
///   exoscope datasets select cumulative --retrain
///   exoscope predict 10797460
///   exoscope init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .exoscope.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base URL of the ML service
    #[arg(long, value_name = "URL", env = "EXOSCOPE_ML_URL", global = true)]
    pub ml_url: Option<String>,

    /// Gemini API key
    #[arg(long, value_name = "KEY", env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, value_name = "MODEL", env = "GEMINI_MODEL", global = true)]
    pub gemini_model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP relay
    Serve(ServeArgs),

    /// Compute the dashboard charts
    Charts(ChartsArgs),

    /// List, select or upload training CSVs
    #[command(subcommand)]
    Datasets(DatasetsCommand),

    /// Show the dataset rows of one KOI
    Planet {
        /// KOI name, e.g. K00752.01
        kepoi_name: String,

        /// Look the KOI up in a dataset JSON file instead of the ML service
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Ask the model for a prediction
    Predict {
        /// Kepler input catalog id
        kepid: String,
    },

    /// Update RandomForest hyperparameters and retrain
    Tune(TuneArgs),

    /// Show precision/recall of the trained model
    Precision,

    /// Ask the service to explain the model, or one KOI
    Explain {
        /// KOI name; explains the whole model when omitted
        kepoi_name: Option<String>,
    },

    /// Download (or generate) an artist's image of a KOI
    Image(ImageArgs),

    /// Generate a default .exoscope.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ChartsArgs {
    /// Read the dataset from a JSON file instead of the ML service
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DatasetsCommand {
    /// List CSVs stored on the service
    List,

    /// Make a stored CSV the active dataset
    Select {
        /// CSV name, with or without the .csv extension
        name: String,

        /// Retrain the model on the selected CSV
        #[arg(long)]
        retrain: bool,
    },

    /// Upload a local CSV and make it the active dataset
    Upload {
        /// CSV file to upload
        file: PathBuf,

        /// Retrain the model on the uploaded CSV
        #[arg(long)]
        retrain: bool,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TuneArgs {
    /// Number of trees
    #[arg(long, value_name = "N")]
    pub numest: Option<u32>,

    /// Maximum tree depth
    #[arg(long, value_name = "N")]
    pub mxdepth: Option<u32>,

    /// Random seed
    #[arg(long, value_name = "N")]
    pub randstate: Option<u32>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ImageArgs {
    /// KOI name, e.g. K00752.01
    pub kepoi_name: String,

    /// Render a new image before downloading it
    #[arg(long)]
    pub generate: bool,

    /// Extra prompt text for the image generator
    #[arg(long, value_name = "TEXT", requires = "generate")]
    pub prompt_extra: Option<String>,

    /// Where to save the image (default: <kepoi_name>.<ext>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl TuneArgs {
    /// The hyperparameters to send; unset flags stay unchanged on the service.
    pub fn hyperparams(&self) -> Hyperparams {
        Hyperparams {
            numest: self.numest,
            mxdepth: self.mxdepth,
            randstate: self.randstate,
        }
    }
}

/// Output format for the chart report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Skip the rest for init-config
        if matches!(self.command, Command::InitConfig) {
            return Ok(());
        }

        if let Some(ref url) = self.ml_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("ML service URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            Command::Serve(serve) => {
                if serve.port == Some(0) {
                    return Err("Port must be between 1 and 65535".to_string());
                }
            }
            Command::Charts(ChartsArgs {
                input: Some(input),
                ..
            })
            | Command::Planet {
                input: Some(input),
                ..
            } => {
                if !input.is_file() {
                    return Err(format!("Input file does not exist: {}", input.display()));
                }
            }
            Command::Datasets(DatasetsCommand::Select { name, .. }) => {
                if name.trim().is_empty() {
                    return Err("CSV name must not be empty".to_string());
                }
            }
            Command::Datasets(DatasetsCommand::Upload { file, .. }) => {
                if !file.is_file() {
                    return Err(format!("CSV file does not exist: {}", file.display()));
                }
            }
            Command::Predict { kepid } => {
                if kepid.trim().is_empty() {
                    return Err("kepid must not be empty".to_string());
                }
            }
            Command::Tune(tune) => {
                if tune.hyperparams().is_empty() {
                    return Err(
                        "Give at least one of --numest, --mxdepth, --randstate".to_string(),
                    );
                }
                if tune.numest == Some(0) || tune.mxdepth == Some(0) {
                    return Err("--numest and --mxdepth must be at least 1".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

//! Exoscope - Kepler KOI dashboard toolkit
//!
//! A CLI that talks to the KOI ML service, renders the dashboard charts,
//! and runs the HTTP relay in front of the service and the Gemini API.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, service failure, etc.)

use anyhow::{Context, Result};
use exoscope::analysis::DatasetSnapshot;
use exoscope::cli::{
    Args, ChartsArgs, Command, DatasetsCommand, ImageArgs, OutputFormat, TuneArgs,
};
use exoscope::client::{Dashboard, MlClient};
use exoscope::config::{Config, CONFIG_FILE};
use exoscope::models::{ClassStats, DatasetRecord, Disposition, ImageRequest};
use exoscope::{relay, report};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config)?;

    info!("Exoscope v{}", env!("CARGO_PKG_VERSION"));
    source.log();
    debug!("Command: {:?}", args.command);

    if let Err(e) = run(args, config).await {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .exoscope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the ML service URL, relay port, Gemini model and chart bins.");
    Ok(())
}

/// Initialize logging based on verbosity settings; `RUST_LOG` wins when set.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Where the configuration came from, logged once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Invalid(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::Invalid(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, since the file may turn on verbose
/// output.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    Ok(match Config::load_default() {
        Ok(Some(config)) => (config, ConfigSource::DefaultFile),
        Ok(None) => (Config::default(), ConfigSource::Defaults),
        Err(e) => (Config::default(), ConfigSource::Invalid(e)),
    })
}

async fn run(args: Args, config: Config) -> Result<()> {
    let quiet = args.quiet;

    match args.command {
        Command::Serve(_) => {
            println!("🛰️  Starting relay on {}:{}", config.server.host, config.server.port);
            println!("   ML service: {}", config.ml.base_url);
            println!("   Gemini model: {}", config.gemini.model);
            relay::serve(&config).await
        }
        Command::Charts(charts) => run_charts(&config, &charts, quiet).await,
        Command::Datasets(command) => run_datasets(&config, command, quiet).await,
        Command::Planet { kepoi_name, input } => {
            run_planet(&config, &kepoi_name, input.as_deref(), quiet).await
        }
        Command::Predict { kepid } => run_predict(&config, &kepid, quiet).await,
        Command::Tune(tune) => run_tune(&config, &tune, quiet).await,
        Command::Precision => run_precision(&config, quiet).await,
        Command::Explain { kepoi_name } => {
            run_explain(&config, kepoi_name.as_deref(), quiet).await
        }
        Command::Image(image) => run_image(&config, &image, quiet).await,
        Command::InitConfig => handle_init_config(),
    }
}

fn ml_client(config: &Config) -> Result<MlClient> {
    MlClient::new(&config.ml.base_url).context("Invalid ML service URL")
}

/// Show a spinner while `fut` runs, unless quiet.
async fn with_spinner<T, F>(quiet: bool, message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = (!quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = fut.await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

async fn run_charts(config: &Config, args: &ChartsArgs, quiet: bool) -> Result<()> {
    let mut dashboard = Dashboard::new(ml_client(config)?, config.charts.clone());

    let snapshot = match args.input {
        Some(ref input) => dashboard.load_file(input)?,
        None => with_spinner(quiet, "Fetching dataset...", dashboard.refresh()).await?,
    };

    let chart_report = report::ChartReport::from_snapshot(&snapshot);
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&chart_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&chart_report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                print_snapshot_summary(&snapshot);
                println!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }
    Ok(())
}

fn print_snapshot_summary(snapshot: &DatasetSnapshot) {
    let charts = snapshot.charts();
    println!("\n📊 Dataset Summary:");
    println!("   Source: {}", snapshot.source());
    println!("   Records: {}", charts.record_count);
    for disposition in Disposition::ALL {
        println!(
            "   - {}: {}",
            disposition,
            charts.dispositions.get(&disposition).copied().unwrap_or(0)
        );
    }
}

async fn run_datasets(config: &Config, command: DatasetsCommand, quiet: bool) -> Result<()> {
    let mut dashboard = Dashboard::new(ml_client(config)?, config.charts.clone());

    match command {
        DatasetsCommand::List => {
            let csvs = with_spinner(quiet, "Listing CSVs...", dashboard.ml().list_csvs()).await?;
            if csvs.is_empty() {
                println!("No CSVs stored on the service.");
            }
            for csv in csvs {
                println!("📄 {}", csv);
            }
        }
        DatasetsCommand::Select { name, retrain } => {
            let message = format!("Selecting {}...", name);
            let selection =
                with_spinner(quiet, &message, dashboard.select_csv(&name, retrain)).await?;
            println!("✅ Selected {}", selection.selected);
            print_retrain(selection.retrain, selection.model_info.as_ref());
        }
        DatasetsCommand::Upload { file, retrain } => {
            let message = format!("Uploading {}...", file.display());
            let upload = with_spinner(quiet, &message, dashboard.upload_csv(&file, retrain)).await?;
            println!("✅ Saved as {}", upload.saved);
            print_retrain(upload.retrain, upload.model_info.as_ref());
        }
    }

    if let Some(snapshot) = dashboard.snapshot() {
        if !quiet {
            print_snapshot_summary(&snapshot);
        }
    }
    Ok(())
}

fn print_retrain(retrain: Option<bool>, model_info: Option<&serde_json::Value>) {
    if retrain == Some(true) {
        println!("   Model retrained.");
    }
    if let Some(info) = model_info.filter(|v| !v.is_null()) {
        println!("   Model info: {}", info);
    }
}

async fn run_planet(
    config: &Config,
    kepoi_name: &str,
    input: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let records: Vec<DatasetRecord> = match input {
        Some(path) => {
            let mut dashboard = Dashboard::new(ml_client(config)?, config.charts.clone());
            let snapshot = dashboard.load_file(path)?;
            if snapshot.is_empty() {
                warn!("{} holds no dataset rows", path.display());
            }
            snapshot.find_by_kepoi(kepoi_name).into_iter().cloned().collect()
        }
        None => {
            let ml = ml_client(config)?;
            with_spinner(quiet, "Fetching KOI...", ml.planet_by_kepoi(kepoi_name)).await?
        }
    };

    if records.is_empty() {
        println!("No rows for {}.", kepoi_name);
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &DatasetRecord) {
    let field = |v: Option<f64>| v.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string());

    println!("\n🪐 {}", record.display_name());
    println!("   kepid: {}", record.kepid);
    if let Some(ref koi) = record.kepoi_name {
        println!("   KOI: {}", koi);
    }
    println!("   Disposition: {}", record.koi_disposition);
    println!("   Stellar Teff (K): {}", field(record.koi_steff));
    println!("   Stellar radius (R☉): {}", field(record.koi_srad));
    println!("   Stellar log g: {}", field(record.koi_slogg));
    println!("   Orbital period (days): {}", field(record.koi_period));
    println!("   Transit duration (hours): {}", field(record.koi_duration));
    println!("   Transit depth (ppm): {}", field(record.koi_depth));
    println!("   Model SNR: {}", field(record.koi_model_snr));
}

async fn run_predict(config: &Config, kepid: &str, quiet: bool) -> Result<()> {
    let ml = ml_client(config)?;
    let predictions = with_spinner(quiet, "Predicting...", ml.predict(kepid)).await?;

    if predictions.results.is_empty() {
        println!("No rows for kepid {}.", kepid);
        return Ok(());
    }
    for result in &predictions.results {
        print_record(&result.record);
        match result.confidence() {
            Some(p) => println!("   🤖 Prediction: {} ({:.1}%)", result.prediction, p * 100.0),
            None => println!("   🤖 Prediction: {}", result.prediction),
        }
        for (class, p) in &result.probabilities {
            println!("      {}: {:.1}%", class, p * 100.0);
        }
    }
    Ok(())
}

async fn run_tune(config: &Config, args: &TuneArgs, quiet: bool) -> Result<()> {
    let ml = ml_client(config)?;
    let params = args.hyperparams();
    let outcome = with_spinner(quiet, "Retraining...", ml.update_hyperparams(&params)).await?;

    println!("✅ Hyperparameters updated");
    for (name, value) in &outcome.updated {
        println!("   {}: {}", name, value);
    }
    if outcome.train {
        println!("   Model retrained.");
    }
    if !outcome.model_info.is_null() {
        println!("   Model info: {}", outcome.model_info);
    }
    Ok(())
}

async fn run_precision(config: &Config, quiet: bool) -> Result<()> {
    let ml = ml_client(config)?;
    let precision = with_spinner(quiet, "Fetching scores...", ml.model_precision()).await?;

    println!("📈 Accuracy: {:.1}%", precision.accuracy * 100.0);
    println!(
        "\n   {:<16} {:>9} {:>9} {:>9} {:>8}",
        "Class", "Precision", "Recall", "F1", "Support"
    );
    for disposition in Disposition::ALL {
        if let Some(stats) = precision.class(disposition) {
            print_class_row(disposition.as_str(), stats);
        }
    }
    if let Some(stats) = precision.macro_avg() {
        print_class_row("macro avg", stats);
    }
    if let Some(stats) = precision.weighted_avg() {
        print_class_row("weighted avg", stats);
    }
    Ok(())
}

fn print_class_row(class: &str, stats: &ClassStats) {
    println!(
        "   {:<16} {:>9.3} {:>9.3} {:>9.3} {:>8}",
        class, stats.precision, stats.recall, stats.f1_score, stats.support
    );
}

async fn run_explain(config: &Config, kepoi_name: Option<&str>, quiet: bool) -> Result<()> {
    let ml = ml_client(config)?;
    let message = "Asking for an explanation...";
    let explanation = match kepoi_name {
        Some(koi) => with_spinner(quiet, message, ml.explain_specific(koi)).await?,
        None => with_spinner(quiet, message, ml.explain_general()).await?,
    };
    println!("{}", explanation);
    Ok(())
}

async fn run_image(config: &Config, args: &ImageArgs, quiet: bool) -> Result<()> {
    let ml = ml_client(config)?;

    if args.generate {
        let request = ImageRequest {
            kepoi_name: args.kepoi_name.clone(),
            prompt_extra: args.prompt_extra.clone(),
        };
        let generated =
            with_spinner(quiet, "Generating image...", ml.generate_planet_image(&request)).await?;
        info!("Image generated at {}", generated.path);
    }

    let image = with_spinner(
        quiet,
        "Downloading image...",
        ml.exoplanet_image(&args.kepoi_name),
    )
    .await?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", args.kepoi_name, image.extension())));
    std::fs::write(&path, &image.bytes)
        .with_context(|| format!("Failed to write image to {}", path.display()))?;

    println!("✅ Image saved to: {} ({} bytes)", path.display(), image.bytes.len());
    Ok(())
}

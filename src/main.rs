use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

use speech_emotion::classifier::OutputActivation;
use speech_emotion::config::{Config, OutputFormat};
use speech_emotion::pipeline::{EmotionPipeline, PipelineConfig};
use speech_emotion::PredictionResult;

/// Width of the probability bars in table output
const BAR_WIDTH: usize = 40;

/// Classify the emotion expressed in short speech recordings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Audio files to classify (WAV, FLAC, MP3, OGG, ...)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to the ONNX classifier
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to the label vocabulary (JSON or one label per line)
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Path to the config file (default: ~/.speech-emotion/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of threads for classifier inference
    #[arg(long)]
    threads: Option<usize>,

    /// The classifier emits logits; apply a softmax
    #[arg(long)]
    logits: bool,

    /// Only show the N most likely labels
    #[arg(long)]
    top: Option<usize>,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file was classified
fn run(args: Args) -> Result<bool> {
    let config = load_config(&args)?;
    let model_config = config.model_config()?;

    info!("Model: {:?}", model_config.model_path);
    info!("Labels: {:?}", model_config.labels_path);

    let pipeline = EmotionPipeline::new(PipelineConfig::default())
        .context("Failed to set up feature pipeline")?;
    let model = pipeline
        .load_model(&model_config)
        .with_context(|| format!("Failed to load classifier {:?}", model_config.model_path))?;

    let mut all_ok = true;
    for path in &args.files {
        debug!("Classifying {:?}", path);

        match pipeline.predict_file(&model, path) {
            Ok(result) => match config.output_format {
                OutputFormat::Json => print_json(path, &result, config.top_k)?,
                OutputFormat::Table => print_table(path, &result, config.top_k),
            },
            Err(e) => {
                all_ok = false;
                error!("{}: {}", path.display(), e);
                match config.output_format {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({
                            "file": path,
                            "error": e.kind().to_string(),
                            "message": e.to_string(),
                        })
                    ),
                    OutputFormat::Table => eprintln!("{}: {}: {}", path.display(), e.kind(), e),
                }
            }
        }
    }

    Ok(all_ok)
}

/// Config file values, overridden by command line flags
fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config {:?}", path))?;

    if let Some(model) = &args.model {
        config.model_path = Some(model.clone());
    }
    if let Some(labels) = &args.labels {
        config.labels_path = Some(labels.clone());
    }
    if let Some(threads) = args.threads {
        config.n_threads = threads;
    }
    if args.logits {
        config.activation = OutputActivation::Logits;
    }
    if args.top.is_some() {
        config.top_k = args.top;
    }
    if args.json {
        config.output_format = OutputFormat::Json;
    }

    Ok(config)
}

fn print_table(path: &std::path::Path, result: &PredictionResult, top_k: Option<usize>) {
    let rows = result.top_k(top_k.unwrap_or(result.ranked.len()));
    let label_width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0);

    println!("{}", path.display());
    println!("  Predicted emotion: {}", result.label.to_uppercase());
    for row in rows {
        let filled = (row.probability.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
        println!(
            "  {:<width$}  {:>6.2}%  {}",
            row.label,
            row.probability * 100.0,
            "#".repeat(filled),
            width = label_width
        );
    }
    println!();
}

fn print_json(path: &std::path::Path, result: &PredictionResult, top_k: Option<usize>) -> Result<()> {
    let ranked = result.top_k(top_k.unwrap_or(result.ranked.len()));
    let line = serde_json::json!({
        "file": path,
        "label": result.label,
        "confidence": result.confidence(),
        "ranked": ranked,
    });
    println!("{}", serde_json::to_string(&line).context("Failed to serialize result")?);
    Ok(())
}

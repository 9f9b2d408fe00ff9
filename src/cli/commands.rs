//! CLI command definitions for swipejury.
//!
//! Provides the one-shot pipeline runner (`run`) and the HTTP server
//! (`serve`).

use crate::llm::{resolve_api_key, ModelClient, OpenRouterClient};
use crate::panel::{
    default_panel, AggregatorConfig, ConsensusAggregator, ConsensusDirective, EvaluationGoal,
    EvaluationResult, EvaluatorConfig, ImageData, ImageSynthesizer, Persona, PersonaEvaluator,
    SynthesizerConfig, VerdictTally, DEFAULT_IMAGE_MIME, DEFAULT_IMAGE_MODEL, DEFAULT_JUDGE_MODEL,
    DEFAULT_SYNTHESIS_MODEL,
};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Default output directory for revised images and the run summary.
const DEFAULT_OUTPUT_DIR: &str = "./swipejury-output";

/// Default bind address for the server.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Panel-based profile photo evaluation and revision.
#[derive(Parser)]
#[command(name = "swipejury")]
#[command(about = "Swipe-test a profile photo against a panel of synthetic judges")]
#[command(version)]
#[command(
    long_about = "swipejury runs a profile photo past a panel of role-played judges, merges their\nfeedback into one improvement directive, and requests revised photos from an\nimage model.\n\nExample usage:\n  swipejury run --image photo.jpg --goal right --count 4 --output ./swipejury-output"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full pipeline over one photo: judge, combine, regenerate.
    Run(RunArgs),

    /// Serve the pipeline stages over HTTP.
    Serve(ServeArgs),
}

/// Arguments for the run command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the photo to evaluate.
    #[arg(short = 'i', long)]
    pub image: String,

    /// JSON file holding the judge panel (array of {id, name, bio}).
    /// Uses the built-in panel when omitted.
    #[arg(short = 'p', long)]
    pub personas: Option<String>,

    /// Swipe direction the photo owner wants more of (right or left).
    #[arg(short = 'g', long, default_value = "right")]
    pub goal: String,

    /// Number of revised images to request.
    #[arg(short = 'n', long, default_value = "4")]
    pub count: usize,

    /// Output directory for revised images and the run summary.
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: String,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY")]
    pub api_key: Option<String>,

    /// Model used for judge evaluations.
    #[arg(long, default_value = DEFAULT_JUDGE_MODEL)]
    pub judge_model: String,

    /// Model used for consensus synthesis.
    #[arg(long, default_value = DEFAULT_SYNTHESIS_MODEL)]
    pub synthesis_model: String,

    /// Model used for image generation.
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    pub image_model: String,

    /// Seed for the feedback shuffle (reproducible synthesis prompts).
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the serve command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind.
    #[arg(short = 'p', long, default_value = "8000")]
    pub port: u16,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_pipeline_command(args).await,
        Commands::Serve(args) => run_serve_command(args).await,
    }
}

// ============================================================================
// Run Command Implementation
// ============================================================================

/// JSON artifact describing one pipeline run, written next to the images.
#[derive(Debug, Clone, Serialize)]
struct RunSummary {
    run_id: String,
    finished_at: String,
    goal: String,
    judges: usize,
    right_swipes: usize,
    left_swipes: usize,
    results: Vec<EvaluationResult>,
    directive: ConsensusDirective,
    images_requested: usize,
    images_produced: usize,
    saved_files: Vec<String>,
    remote_urls: Vec<String>,
}

async fn run_pipeline_command(args: RunArgs) -> anyhow::Result<()> {
    let api_key = resolve_api_key(args.api_key.as_deref())?;
    let goal: EvaluationGoal = args
        .goal
        .parse()
        .map_err(|message: String| anyhow::anyhow!(message))?;

    let image_path = Path::new(&args.image);
    if !image_path.exists() {
        anyhow::bail!("Image file does not exist: {}", args.image);
    }
    let image = ImageData::new(fs::read(image_path)?, detect_mime(image_path));

    let personas = match args.personas.as_deref() {
        Some(path) => load_personas(Path::new(path))?,
        None => default_panel(),
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    info!(
        %run_id,
        judges = personas.len(),
        goal = %goal,
        image_bytes = image.len(),
        "starting pipeline run"
    );

    let client: Arc<dyn ModelClient> = Arc::new(OpenRouterClient::new(api_key));
    let evaluator = PersonaEvaluator::new(
        Arc::clone(&client),
        EvaluatorConfig::new().with_model(&args.judge_model),
    );
    let mut synthesis_config = AggregatorConfig::new().with_model(&args.synthesis_model);
    if let Some(seed) = args.seed {
        synthesis_config = synthesis_config.with_seed(seed);
    }
    let aggregator = ConsensusAggregator::new(Arc::clone(&client), synthesis_config);
    let synthesizer = ImageSynthesizer::new(
        Arc::clone(&client),
        SynthesizerConfig::new().with_model(&args.image_model),
    );

    let verdicts = futures::future::join_all(
        personas
            .iter()
            .map(|persona| evaluator.evaluate(&image, persona, goal)),
    )
    .await;

    let mut results = Vec::with_capacity(verdicts.len());
    for verdict in verdicts {
        results.push(verdict?);
    }

    let tally = VerdictTally::from_results(&results);
    println!("\n=== Judge verdicts ===");
    for result in &results {
        println!("  {} swiped {}", result.name, result.swipe.label());
        if !result.reason.is_empty() {
            println!("    {}", result.reason);
        }
    }
    println!(
        "  {} of {} swiped RIGHT, {} swiped LEFT",
        tally.right, tally.total, tally.left
    );

    let directive = aggregator.aggregate(&results, goal).await?;
    println!("\n=== Consensus directive ===");
    println!("{}", directive.image_prompt);
    if !directive.priority_changes.is_empty() {
        println!("  Priority changes:");
        for change in &directive.priority_changes {
            println!("    - {change}");
        }
    }

    let images = synthesizer
        .generate(&directive.image_prompt, &image, args.count)
        .await;

    let output_dir = Path::new(&args.output);
    fs::create_dir_all(output_dir)?;

    let mut saved_files = Vec::new();
    let mut remote_urls = Vec::new();
    for (index, generated) in images.iter().enumerate() {
        match generated.decode_data() {
            Some((mime, bytes)) => {
                let filename = format!("revision-{index}.{}", extension_for_mime(&mime));
                fs::write(output_dir.join(&filename), bytes)?;
                saved_files.push(filename);
            }
            None => remote_urls.push(generated.url.clone()),
        }
    }

    let summary = RunSummary {
        run_id,
        finished_at: chrono::Utc::now().to_rfc3339(),
        goal: goal.to_string(),
        judges: personas.len(),
        right_swipes: tally.right,
        left_swipes: tally.left,
        results,
        directive,
        images_requested: args.count,
        images_produced: images.len(),
        saved_files,
        remote_urls,
    };
    fs::write(
        output_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    println!("\n✓ Pipeline complete");
    println!("  Output dir: {}", args.output);
    println!(
        "  Images: {} of {} requested",
        summary.images_produced, summary.images_requested
    );
    if !summary.remote_urls.is_empty() {
        println!("  Remote urls (recorded in summary.json, not downloaded):");
        for url in &summary.remote_urls {
            println!("    {url}");
        }
    }

    Ok(())
}

/// Load a judge panel from a JSON file.
fn load_personas(path: &Path) -> anyhow::Result<Vec<Persona>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read personas file {}: {}", path.display(), e))?;
    let personas: Vec<Persona> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse personas file {}: {}", path.display(), e))?;
    if personas.is_empty() {
        anyhow::bail!("Personas file {} contains no judges", path.display());
    }
    Ok(personas)
}

/// Media type inferred from a file extension, defaulting to jpeg.
fn detect_mime(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png".to_string(),
        Some("webp") => "image/webp".to_string(),
        Some("gif") => "image/gif".to_string(),
        _ => DEFAULT_IMAGE_MIME.to_string(),
    }
}

/// File extension for a generated image's media type, defaulting to jpg.
fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

// ============================================================================
// Serve Command Implementation
// ============================================================================

async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    info!(host = %args.host, port = args.port, "starting server");
    crate::server::run_server(&args.host, args.port).await
}

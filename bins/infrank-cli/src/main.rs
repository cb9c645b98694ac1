//! infrank — command-line front end for the influencer scoring engine.
//!
//! Scores a single signal set, or a whole population loaded from a JSON file
//! (`{"<influencer id>": { ...signals... }, ...}`), using in-memory signal
//! and score stores. Weights and tiers are read from JSON files; engine
//! settings from an optional TOML file and `INFRANK_*` variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use infrank_core::tier::{Tier, TierTable};
use infrank_core::traits::ScoreCalculator;
use infrank_core::types::{BatchSummary, InfluencerId, SignalSet};
use infrank_core::weights::{WeightConfig, WeightSnapshot};
use infrank_engine::{cancel_pair, Engine, EngineConfig, MemoryScoreStore, MemorySignalSource};
use infrank_scoring::engine::{max_score, ScoringEngine};

/// Influencer ranking and scoring engine.
#[derive(Parser, Debug)]
#[command(name = "infrank", version, about = "Transparent, weighted influencer scoring")]
struct Cli {
    /// Engine configuration file (TOML). Defaults to the user config
    /// directory when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one signal set and print the breakdown.
    Score(ScoreArgs),
    /// Recalculate a whole population and print the batch summary.
    RecalcAll(PopulationArgs),
    /// Recalculate a population and print the top entries.
    Leaderboard(LeaderboardArgs),
    /// Validate a weight configuration and print its fingerprint.
    Weights(ScoringArgs),
}

#[derive(Args, Debug)]
struct ScoringArgs {
    /// Weight configuration (JSON). Defaults to the built-in weights.
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Tier thresholds (JSON array). Defaults to Bronze/Silver/Gold/Platinum.
    #[arg(long)]
    tiers: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Signal set (JSON).
    #[arg(long)]
    signals: PathBuf,

    /// Influencer id to stamp on the breakdown.
    #[arg(long, default_value = "influencer")]
    id: String,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Args, Debug)]
struct PopulationArgs {
    /// Population file: JSON object of influencer id to signal set.
    #[arg(long)]
    population: PathBuf,

    /// Concurrent recalculations (overrides the configuration file).
    #[arg(long)]
    workers: Option<usize>,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Args, Debug)]
struct LeaderboardArgs {
    #[command(flatten)]
    population: PopulationArgs,

    /// Number of entries to print.
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_engine_config(cli.config.as_deref())?;
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &cli.log_format);

    match cli.command {
        Commands::Score(args) => cmd_score(args),
        Commands::Weights(args) => cmd_weights(args),
        Commands::RecalcAll(args) => cmd_recalc_all(config, args).await,
        Commands::Leaderboard(args) => cmd_leaderboard(config, args).await,
    }
}

// --- Commands ---

fn cmd_score(args: ScoreArgs) -> Result<()> {
    let signals: SignalSet = read_json(&args.signals)?;
    let (weights, tiers) = load_scoring(&args.scoring)?;
    let snapshot = WeightSnapshot::new(weights, 1);

    let breakdown = ScoringEngine::new()
        .breakdown(&InfluencerId::new(args.id), &signals, &snapshot, &tiers)
        .context("scoring failed")?;
    print_json(&breakdown)
}

fn cmd_weights(args: ScoringArgs) -> Result<()> {
    let (weights, tiers) = load_scoring(&args)?;
    let report = serde_json::json!({
        "weights": weights,
        "fingerprint": weights.fingerprint(),
        "maxScore": max_score(&weights),
        "tiers": tiers,
    });
    print_json(&report)
}

async fn cmd_recalc_all(config: EngineConfig, args: PopulationArgs) -> Result<()> {
    let engine = build_engine(config, &args)?;
    let summary = run_batch(&engine).await;
    print_json(&summary)?;
    if !summary.is_complete() {
        bail!(
            "recalculation incomplete: {} failed, cancelled={}",
            summary.failed,
            summary.cancelled
        );
    }
    Ok(())
}

async fn cmd_leaderboard(config: EngineConfig, args: LeaderboardArgs) -> Result<()> {
    let engine = build_engine(config, &args.population)?;
    let summary = run_batch(&engine).await;
    if !summary.is_complete() {
        warn!(
            failed = summary.failed,
            cancelled = summary.cancelled,
            "leaderboard built from an incomplete recalculation"
        );
    }
    let board = engine
        .leaderboard(args.limit)
        .await
        .context("failed to read scores")?;
    print_json(&board)
}

// --- Helpers ---

fn build_engine(
    mut config: EngineConfig,
    args: &PopulationArgs,
) -> Result<Arc<Engine>> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate().context("invalid engine configuration")?;

    let population: BTreeMap<InfluencerId, SignalSet> = read_json(&args.population)?;
    info!(
        influencers = population.len(),
        workers = config.workers,
        "loaded population"
    );

    let (weights, tiers) = load_scoring(&args.scoring)?;
    let source = Arc::new(MemorySignalSource::from_map(population));
    let store = Arc::new(MemoryScoreStore::new());
    Engine::with_scoring(config, source, store, weights, tiers).context("failed to build engine")
}

/// Run one fleet-wide recalculation, cancelling it on Ctrl+C.
async fn run_batch(engine: &Arc<Engine>) -> BatchSummary {
    let (handle, signal) = cancel_pair();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling recalculation");
            handle.cancel();
        }
    });
    let summary = engine.recalculate_all(signal).await;
    watcher.abort();
    summary
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(Some(path))
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let default = EngineConfig::default_path();
            let file = default.exists().then_some(default.as_path());
            EngineConfig::load(file).context("failed to load engine configuration")
        }
    }
}

fn load_scoring(args: &ScoringArgs) -> Result<(WeightConfig, TierTable)> {
    let weights = match &args.weights {
        Some(path) => read_json::<WeightConfig>(path)?,
        None => WeightConfig::default(),
    };
    weights.validate().context("invalid weight configuration")?;

    let tiers = match &args.tiers {
        Some(path) => {
            let tiers: Vec<Tier> = read_json(path)?;
            TierTable::new(tiers).context("invalid tier thresholds")?
        }
        None => TierTable::default(),
    };
    Ok((weights, tiers))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr so stdout stays JSON.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

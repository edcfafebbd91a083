// crates/moetrace-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use moetrace_core::{
    generate_trace, read_trace_csv,
    summary::{DEFAULT_SUMMARY_LAYERS, DEFAULT_TOP_K},
    summarize, write_trace_csv, DistributionKind, GenerateParams, LayerAssignment,
};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output path when neither `--output` nor the profile names one.
const DEFAULT_OUTPUT: &str = "expert_routing_trace.csv";
/// Base probabilities listed before the "... more experts" line.
const BASE_PREVIEW: usize = 10;
/// Experts listed per layer in the generation report.
const RANKED_PREVIEW: usize = 5;
/// Experts listed per layer by `inspect`.
const INSPECT_PREVIEW: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "moetrace",
    about = "Generate MoE expert routing traces",
    long_about = "Generate MoE expert routing traces.\n\nWrites a CSV of per-token expert probabilities (layer_id, token_id, expert_0..expert_N-1) for offline MoE simulation. Use `inspect` to summarize an existing trace.",
    version = env!("CARGO_PKG_VERSION"),
    args_conflicts_with_subcommands = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    #[command(flatten)]
    args: GenerateArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of tokens per batch
    #[arg(long = "batch_size", default_value_t = 512, value_parser = clap::value_parser!(u32).range(1..))]
    batch_size: u32,

    /// Number of experts
    #[arg(long = "num_experts", default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    num_experts: u32,

    /// Number of transformer layers
    #[arg(long = "num_layers", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    num_layers: u32,

    /// Distribution type: uniform | zipf | power_law
    #[arg(long, default_value_t = DistributionKind::Zipf)]
    distribution: DistributionKind,

    /// Skew factor for zipf (recommended 0.5-0.95)
    #[arg(long, default_value_t = 0.8, allow_negative_numbers = true)]
    skew: f64,

    /// Concentration for power_law (recommended 1.0-3.0)
    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    concentration: f64,

    /// Per-token noise level (recommended 0.0-0.2; 0 disables noise)
    #[arg(long, default_value_t = 0.05, allow_negative_numbers = true)]
    noise: f64,

    /// Seed for the noise generator (random if omitted; the chosen seed is logged)
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path [default: expert_routing_trace.csv]
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML profile with the generation parameters (replaces the shape flags)
    #[arg(
        long,
        conflicts_with_all = [
            "batch_size", "num_experts", "num_layers", "distribution",
            "skew", "concentration", "noise",
        ]
    )]
    profile: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Summarize an existing routing trace with top-k selection per token
    Inspect {
        /// Trace CSV to read
        #[arg(long)]
        trace: PathBuf,

        /// Experts selected per token
        #[arg(long = "top_k", default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
        top_k: u32,

        /// Number of layers to summarize (from the lowest layer id)
        #[arg(long, default_value_t = 3)]
        layers: usize,

        /// Emit the summaries as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// On-disk profile: any subset of the generation parameters plus an output path.
#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(flatten)]
    params: GenerateParams,
    output: Option<PathBuf>,
}

/// JSON shape of one layer in `inspect --json`.
#[derive(Debug, Serialize)]
struct LayerReport<'a> {
    #[serde(flatten)]
    assignment: &'a LayerAssignment,
    total: u64,
    mean: f64,
    min: u64,
    max: u64,
    imbalance_ratio: f64,
}

impl<'a> From<&'a LayerAssignment> for LayerReport<'a> {
    fn from(a: &'a LayerAssignment) -> Self {
        Self {
            assignment: a,
            total: a.total(),
            mean: a.mean(),
            min: a.min(),
            max: a.max(),
            imbalance_ratio: a.imbalance_ratio(),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Some(Cmd::Inspect {
            trace,
            top_k,
            layers,
            json,
        }) => inspect(&trace, top_k as usize, layers, json),

        None => {
            let (params, output) = resolve(cli.args)?;
            generate(&params, &output)
        }
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn load_profile(path: &Path) -> Result<Profile> {
    let src =
        fs::read_to_string(path).with_context(|| format!("read profile {}", path.display()))?;
    toml::from_str(&src).with_context(|| format!("parse profile {}", path.display()))
}

/// Merge flags and an optional profile into the final parameters and output path.
///
/// `--seed` and `--output` given on the command line win over the profile.
fn resolve(args: GenerateArgs) -> Result<(GenerateParams, PathBuf)> {
    let GenerateArgs {
        batch_size,
        num_experts,
        num_layers,
        distribution,
        skew,
        concentration,
        noise,
        seed,
        output,
        profile,
    } = args;

    let (mut params, profile_output) = match profile {
        Some(path) => {
            let p = load_profile(&path)?;
            info!(profile = %path.display(), "loaded profile");
            (p.params, p.output)
        }
        None => (
            GenerateParams {
                batch_size,
                num_experts,
                num_layers,
                distribution,
                skew,
                concentration,
                noise,
                seed: None,
            },
            None,
        ),
    };

    if seed.is_some() {
        params.seed = seed;
    }
    let output = output
        .or(profile_output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    Ok((params, output))
}

fn generate(params: &GenerateParams, output: &Path) -> Result<()> {
    for w in params.validate().context("invalid parameters")? {
        warn!("{w}");
    }

    let seed = params.seed.unwrap_or_else(|| rand::rng().random());
    info!(
        batch_size = params.batch_size,
        num_experts = params.num_experts,
        num_layers = params.num_layers,
        distribution = %params.distribution,
        seed,
        "generating routing trace"
    );
    let mut rng = StdRng::seed_from_u64(seed);

    println!("Generating MoE routing trace:");
    println!("  Batch size: {}", params.batch_size);
    println!("  Num experts: {}", params.num_experts);
    println!("  Num layers: {}", params.num_layers);
    println!("  Distribution: {}", params.distribution);
    match params.distribution {
        DistributionKind::Zipf => println!("  Skew factor: {}", params.skew),
        DistributionKind::PowerLaw => println!("  Concentration: {}", params.concentration),
        DistributionKind::Uniform => {}
    }

    let trace = generate_trace(params, &mut rng).context("generating routing trace")?;
    if trace.fallback_rows > 0 {
        warn!(
            rows = trace.fallback_rows,
            "noisy rows degenerated to all-zero and fell back to uniform"
        );
    }

    println!("\nBase expert probabilities:");
    for (i, p) in trace.base.iter().take(BASE_PREVIEW).enumerate() {
        println!("  Expert {i}: {p:.4} ({:.1}%)", p * 100.0);
    }
    if trace.base.len() > BASE_PREVIEW {
        println!("  ... ({} more experts)", trace.base.len() - BASE_PREVIEW);
    }

    write_trace_csv(output, &trace.table)
        .with_context(|| format!("writing routing trace to {}", output.display()))?;
    let size = fs::metadata(output)
        .with_context(|| format!("stat {}", output.display()))?
        .len();

    println!("\nSaved routing trace to: {}", output.display());
    println!("  Total rows: {} (layers × tokens)", trace.table.len());
    println!("  File size: {:.1} KB", size as f64 / 1024.0);

    println!("\nToken Assignment Statistics:");
    for layer in summarize(&trace.table, DEFAULT_TOP_K, DEFAULT_SUMMARY_LAYERS) {
        println!("\n  Layer {} (top-{} selection):", layer.layer_id, layer.top_k);
        for (expert, count) in layer.ranked().into_iter().take(RANKED_PREVIEW) {
            println!(
                "    Expert {expert}: {count} assignments ({:.1}%)",
                layer.percent(expert)
            );
        }
    }

    println!("\nDone! Use this file in your config:");
    println!("   {}", config_snippet(output));
    Ok(())
}

/// `"moe_routing_trace_path": "./<path>"`; `./` is only prepended to plain
/// relative paths.
fn config_snippet(path: &Path) -> String {
    let shown = if matches!(path.components().next(), Some(Component::Normal(_))) {
        format!("./{}", path.display())
    } else {
        path.display().to_string()
    };
    format!("\"moe_routing_trace_path\": \"{shown}\"")
}

fn inspect(trace: &Path, top_k: usize, layers: usize, json: bool) -> Result<()> {
    info!(trace = %trace.display(), top_k, layers, "inspecting routing trace");
    let table =
        read_trace_csv(trace).with_context(|| format!("reading trace {}", trace.display()))?;
    let summaries = summarize(&table, top_k, layers);

    if json {
        let reports: Vec<LayerReport<'_>> = summaries.iter().map(LayerReport::from).collect();
        let text = serde_json::to_string_pretty(&reports).context("serialize summaries")?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "Trace {}: {} rows, {} experts, {} layers",
        trace.display(),
        table.len(),
        table.num_experts(),
        table.layer_ids().len()
    );
    for s in &summaries {
        println!(
            "\n========== MoE Token Distribution (Layer {}, top-{}) ==========",
            s.layer_id, s.top_k
        );
        println!("Tokens: {}", s.tokens);
        println!("Total token-expert assignments: {}", s.total());
        println!("Average tokens per expert: {:.1}", s.mean());
        println!("Min tokens: {} | Max tokens: {}", s.min(), s.max());
        println!("Load imbalance ratio: {:.2}x", s.imbalance_ratio());
        println!("Expert token counts:");
        for (e, c) in s.counts.iter().enumerate().take(INSPECT_PREVIEW) {
            println!("  Expert {e:2}: {c:3} tokens ({:5.2}%)", s.percent(e));
        }
    }
    Ok(())
}

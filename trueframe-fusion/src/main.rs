//! TrueFrame fusion CLI
//!
//! Reads one analysis request (JSON) from a file or stdin, fuses it and
//! prints the stamped outcome as JSON on stdout. Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use trueframe_common::config::ConfigResolver;
use trueframe_common::logging::{init_tracing, with_bootstrap_logging};
use trueframe_fusion::{AnalysisOutcome, AnalysisRequest, FusionEngine, FusionSettings, Profile};

/// Command-line arguments for trueframe-fusion
#[derive(Parser, Debug)]
#[command(name = "trueframe-fusion")]
#[command(about = "Fuse deepfake detector observations into a risk assessment")]
#[command(version)]
struct Args {
    /// Configuration file (overrides TRUEFRAME_CONFIG and the default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the profile named in the request
    #[arg(short, long)]
    profile: Option<Profile>,

    /// Include the narrative credibility report
    #[arg(long)]
    report: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Request file, or "-" for stdin
    #[arg(default_value = "-")]
    input: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Scoped subscriber until the configured level is known
    let resolver = ConfigResolver::new("trueframe-fusion").with_cli_path(args.config.clone());
    let config =
        with_bootstrap_logging(|| resolver.load()).context("Failed to load configuration")?;

    init_tracing(&config.logging).context("Failed to initialize logging")?;
    info!(log_level = %config.logging.level, "Logging initialized");

    let settings =
        FusionSettings::from_config(&config).context("Invalid fusion configuration")?;
    let engine = FusionEngine::with_settings(settings);

    let mut request = read_request(&args.input)?;
    if let Some(profile) = args.profile {
        request.profile = profile;
    }

    let outcome = AnalysisOutcome::analyze(&engine, &request, args.report)
        .context("Fusion failed")?;

    info!(
        analysis_id = %outcome.analysis_id,
        profile = %outcome.profile,
        final_score = outcome.result.final_score,
        confidence = outcome.result.confidence,
        risk_tier = %outcome.result.risk_tier,
        "Analysis complete"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string(&outcome)
    }
    .context("Failed to serialize outcome")?;
    println!("{}", json);

    Ok(())
}

fn read_request(input: &str) -> Result<AnalysisRequest> {
    let text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read request file: {}", input))?
    };

    serde_json::from_str(&text).context("Failed to parse analysis request")
}

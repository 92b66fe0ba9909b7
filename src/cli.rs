//! CLI interface for Sextant.
//!
//! One run drives one test case end to end: log in, upload the four
//! directional images, poll until the remote service finishes, print the
//! fix. Arguments in, plain output out; progress goes to stderr via
//! logging so stdout stays parseable.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::api::{self, ApiClient, Averaging};
use crate::bundle::Bundle;
use crate::config::{self, Config};
use crate::solve::{self, SolveOptions};

/// Sextant — fix your position from star sights.
///
/// Uploads a test case's four directional images (port, stern,
/// starboard, bow) to a remote plate-solving service and averages the
/// returned celestial coordinates into a latitude/longitude fix.
#[derive(Debug, Parser)]
#[command(name = "sextant", version)]
pub struct Cli {
    /// Test-case directory: the four directional images plus
    /// parameters.json and solution.txt.
    dir: PathBuf,

    /// API key for the plate-solving service.
    /// Falls back to SEXTANT_API_KEY, then ~/.sextant/config.toml.
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of the plate-solving service.
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds to pause between polls of the remote service.
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Give up if the solve has not finished after this many seconds.
    #[arg(long, default_value_t = 900)]
    deadline: u64,

    /// How per-direction coordinates are averaged into the fix.
    #[arg(long, value_enum, default_value_t = AveragingArg::Solved)]
    averaging: AveragingArg,
}

/// CLI-facing averaging mode, mapped to the domain `Averaging`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AveragingArg {
    /// Divide by the number of directions that solved (warns on partial).
    Solved,
    /// Divide by four regardless, matching earlier tooling's output.
    FixedFour,
}

impl AveragingArg {
    fn to_domain(self) -> Averaging {
        match self {
            Self::Solved => Averaging::Solved,
            Self::FixedFour => Averaging::FixedFour,
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let api_key = config::resolve_api_key(cli.api_key.as_deref(), &config)?;
    let base_url = cli
        .base_url
        .or(config.base_url)
        .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());

    let api = ApiClient::new(base_url).map_err(|e| format!("failed to set up client: {e}"))?;
    let session = api
        .login(&api_key)
        .map_err(|e| format!("login failed: {e}"))?;

    let bundle =
        Bundle::from_dir(&cli.dir).map_err(|e| format!("failed to load test case: {e}"))?;
    tracing::info!(
        captured = %bundle.params.timestamp,
        heading = bundle.params.heading,
        "loaded test case"
    );

    let options = SolveOptions {
        poll_interval: Duration::from_secs(cli.poll_interval),
        deadline: Duration::from_secs(cli.deadline),
        averaging: cli.averaging.to_domain(),
    };

    let fix = solve::solve_bundle(&api, bundle, &session, &options)
        .map_err(|e| format!("solve failed: {e}"))?;

    println!("latitude  {:>12.6}", fix.latitude);
    println!("longitude {:>12.6}", fix.longitude);
    println!("solved    {:>12}", format!("{}/4", fix.solved));
    Ok(())
}

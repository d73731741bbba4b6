//! avd-runner command-line entry point
//!
//! Inputs come from an optional TOML file, overridden by the
//! `INPUT_<NAME>` variables a pipeline runner exports.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use avd_runner::core::{ActionInputs, RunnerEnvironment, SystemRunner, APP_NAME, VERSION};
use avd_runner::Orchestrator;

/// Install Android SDK packages and create an AVD for CI emulator runs
#[derive(Debug, Parser)]
#[command(name = "avd-runner", version, about)]
struct Cli {
    /// TOML file with inputs, keyed by input name (e.g. `api-level = "30"`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Android SDK root [default: $ANDROID_HOME, then $ANDROID_SDK_ROOT]
    #[arg(long)]
    sdk_root: Option<PathBuf>,

    /// Directory holding AVDs [default: $ANDROID_AVD_HOME, then ~/.android/avd]
    #[arg(long)]
    avd_home: Option<PathBuf>,

    /// Log debug output, including external tool output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("{} v{} starting...", APP_NAME, VERSION);

    let mut inputs = match &cli.config {
        Some(path) => ActionInputs::load(path)?,
        None => ActionInputs::default(),
    };
    inputs.overlay_env();

    let env = RunnerEnvironment::resolve(cli.sdk_root, cli.avd_home, dirs::home_dir(), |key| {
        std::env::var(key).ok()
    })?;
    info!("Android SDK: {:?}", env.sdk_root);
    info!("AVD home: {:?}", env.avd_home);

    Orchestrator::new(env, Arc::new(SystemRunner)).run(&inputs).await?;
    Ok(())
}

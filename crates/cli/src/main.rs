//! modus-infra CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the environment TOML (or fall back to the
//!    built-in reference environment) and validate it.
//! 2. **Wire observability**: JSON or pretty `tracing-subscriber` output on
//!    stderr, plus OTLP span export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Build the environment**: declare every resource into a fresh graph
//!    through [`stacks::WebEnvironmentStack`].
//! 4. **Write the manifest**: to `--output` or stdout.
//!
//! Any construction error halts the run with a non-zero exit code. Nothing
//! is written when the build fails.

mod telemetry;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stacks::{EnvironmentConfig, WebEnvironmentStack};
use topology::SynthesisRunId;
use tracing::{error, info, info_span};

use telemetry::{LogFormat, Telemetry};

/// Synthesizes the infrastructure manifest for one environment.
#[derive(Parser, Debug)]
#[command(name = "modus-infra", author, version, about, long_about = None)]
struct Args {
    /// Environment configuration (TOML). The reference environment is used when omitted.
    #[arg(short, long, env = "MODUS_INFRA_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the manifest. Defaults to stdout.
    #[arg(short, long, env = "MODUS_INFRA_OUTPUT")]
    output: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "MODUS_INFRA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Print the reference configuration as TOML and exit.
    #[arg(long, conflicts_with_all = ["config", "output"])]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.print_default_config {
        return match toml::to_string_pretty(&EnvironmentConfig::default()) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Failed to render default configuration: {err}");
                ExitCode::FAILURE
            }
        };
    }

    let telemetry = match Telemetry::init(args.log_format) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Synthesis failed");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

fn run(args: &Args) -> Result<()> {
    let run_id = SynthesisRunId::new_random();
    let span = info_span!("synthesize", run_id = %run_id);
    let _guard = span.enter();

    let config = load_config(args.config.as_deref())?;
    let stack = WebEnvironmentStack::build(&config).context("Failed to build environment")?;
    let manifest = stack.synthesize(run_id)?;
    let json = manifest.to_json_pretty()?;
    write_manifest(args.output.as_deref(), &json)?;

    info!(
        environment = %manifest.environment,
        resources = manifest.resources.len(),
        grants = manifest.grants.len(),
        output = ?args.output,
        "Manifest written"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EnvironmentConfig> {
    let Some(path) = path else {
        info!("No configuration given, using the reference environment");
        return Ok(EnvironmentConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = EnvironmentConfig::from_toml_str(&text)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    info!(path = %path.display(), services = config.services.len(), "Configuration loaded");
    Ok(config)
}

fn write_manifest(path: Option<&Path>, json: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write manifest to stdout")
        }
    }
}

//! stackdenoise CLI - batch denoising of multi-frame image stacks.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackdenoise::model::log_device_info;
use stackdenoise::{run_batch, BatchConfig, OnnxDenoiser};

/// Denoise multi-frame image stacks with a pretrained model.
#[derive(Parser, Debug)]
#[command(name = "stackdenoise")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input root containing the image-stack-structured-noise directory.
    #[arg(long, default_value = "/input/images", value_name = "DIR")]
    input: PathBuf,

    /// Output root for the image-stack-denoised directory.
    #[arg(long, default_value = "/output/images", value_name = "DIR")]
    output: PathBuf,

    /// Path to the serialized ONNX model.
    #[arg(short, long, default_value = "resources/model.onnx", value_name = "FILE")]
    model: PathBuf,

    /// Stop at the first failed file instead of continuing the batch.
    #[arg(long)]
    halt_on_error: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stackdenoise={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    log_device_info();

    let mut model = OnnxDenoiser::load(&args.model).context("Failed to load model")?;

    let config = BatchConfig {
        input_root: args.input.clone(),
        output_root: args.output.clone(),
        halt_on_error: args.halt_on_error,
    };

    let summary = run_batch(&config, &mut model).context("Failed to run batch")?;

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} file(s) failed",
            summary.failed,
            summary.processed + summary.failed
        );
    }

    println!("Successfully processed {} file(s)", summary.processed);

    Ok(())
}

//! Shorts assembly CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shorts_llm::OpenAiClient;
use shorts_models::RenderSettings;
use shorts_worker::{CancelSignal, PipelineReport, PipelineRequest, ShortsPipeline, WorkerConfig};

/// Assemble a vertical short from a folder of images, videos and audio.
#[derive(Debug, Parser)]
#[command(name = "shorts-worker", version)]
struct Args {
    /// What the short should be about
    #[arg(short, long)]
    prompt: String,

    /// Target duration in seconds
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    duration: u32,

    /// Uploaded media directory
    #[arg(long, env = "SHORTS_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Results directory
    #[arg(long, env = "SHORTS_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Output file (defaults to a unique name in the results directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after timeline repair and print the canonical timeline
    #[arg(long)]
    skip_render: bool,
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("shorts=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();

    let mut config = WorkerConfig::from_env();
    if let Some(dir) = args.media_dir {
        config.media_dir = dir;
    }
    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }
    info!("Worker config: {:?}", config);

    let client = OpenAiClient::from_env().context("Failed to create LLM client")?;
    let pipeline = ShortsPipeline::from_config(config, Arc::new(client), RenderSettings::default());

    let mut request = PipelineRequest::new(args.prompt, args.duration);
    request.output = args.output;
    request.skip_render = args.skip_render;

    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling run");
            cancel_tx.send(true).ok();
        }
    });

    let report = pipeline.run(&request, &cancel).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );

    if let PipelineReport::Failed { .. } = report {
        std::process::exit(1);
    }
    Ok(())
}

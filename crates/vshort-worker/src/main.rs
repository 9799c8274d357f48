//! vshort command line entrypoint.
//!
//! Renders one short from a URL or local file and reports progress.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use vshort_models::{JobPhase, TOTAL_STEPS};
use vshort_worker::{init_tracing, DefaultCollaboratorFactory, JobController, WorkerConfig};

/// Turn a long video into a captioned vertical short.
#[derive(Debug, Parser)]
#[command(name = "vshort", version, about)]
struct Cli {
    /// Video URL (anything yt-dlp understands) or local file path
    url: String,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Directory the short is written to
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// TrueType font for captions
    #[arg(long)]
    font: Option<PathBuf>,

    /// UltraFace ONNX model for face tracking
    #[arg(long)]
    face_model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS connections
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&["vshort=info", "ort=warn"]);

    let mut config = WorkerConfig::from_env();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(font) = cli.font {
        config.font_path = font;
    }
    if let Some(model) = cli.face_model {
        config.face_model_path = model;
    }
    let config = Arc::new(config);

    let factory = DefaultCollaboratorFactory::new(Arc::clone(&config));
    let controller = JobController::new(Arc::clone(&config), Arc::new(factory));

    let job_id = controller
        .submit(&cli.url, &cli.api_key)
        .context("Failed to start job")?;
    info!(job_id = %job_id, "Processing {}", cli.url);

    let mut updates = controller.subscribe();
    let mut last_step = 0;
    loop {
        let status = updates.borrow_and_update().clone();
        if status.current_step != last_step {
            last_step = status.current_step;
            println!(
                "[{}/{}] {} ({}%)",
                status.current_step, TOTAL_STEPS, status.message, status.progress
            );
        }
        if !status.is_processing {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling job");
                if let Err(e) = controller.cancel() {
                    warn!("Nothing to cancel: {}", e);
                }
            }
        }
    }

    let status = controller.wait_until_idle().await;
    match status.phase {
        JobPhase::Done => {
            let output = controller.fetch_output().context("Output missing")?;
            println!("{}", status.message);
            println!("Saved to {}", output.display());
            Ok(())
        }
        JobPhase::Cancelled => bail!("Job cancelled"),
        _ => {
            let reason = status.error.unwrap_or(status.message);
            error!("Job failed: {}", reason);
            bail!(reason)
        }
    }
}

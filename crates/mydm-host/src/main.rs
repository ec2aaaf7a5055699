use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mydm_core::config::HostConfig;
use mydm_core::engine::DownloadManager;
use mydm_core::events::event_channel;
use mydm_core::logging;

mod host;

/// MyDM native messaging host: speaks length-framed JSON on stdin/stdout.
/// All flags are optional; the browser launches the binary with none.
#[derive(Debug, Parser)]
#[command(name = "mydm-host", version, about)]
struct HostArgs {
    /// Save downloads here instead of the configured directory.
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Range workers per download.
    #[arg(long)]
    segments: Option<usize>,
}

#[tokio::main]
async fn main() {
    // Logging must be up before anything else, and must never touch stdout.
    logging::init();

    let args = HostArgs::parse();
    if let Err(err) = run(args).await {
        tracing::error!(error = %format!("{err:#}"), "fatal");
        eprintln!("mydm-host error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: HostArgs) -> Result<()> {
    let mut cfg = HostConfig::load();
    if let Some(dir) = args.download_dir {
        cfg.download_dir = Some(dir);
    }
    if let Some(segments) = args.segments {
        cfg.segments = segments;
    }

    let (events, event_rx) = event_channel();
    let manager = DownloadManager::new(cfg.resolve_download_dir(), cfg.segments, events.clone())?;
    tracing::info!(
        download_dir = %manager.download_dir().display(),
        segments = cfg.segments,
        "mydm host started"
    );

    let emitter = tokio::spawn(host::emitter::run_emitter(tokio::io::stdout(), event_rx));

    host::run(tokio::io::stdin(), &manager, &events).await?;

    // Clean EOF: cancel whatever is still running so coordinators wind
    // down (and remove their sidecars), then let the emitter drain.
    manager.shutdown();
    drop(manager);
    drop(events);
    let _ = emitter.await;

    tracing::info!("mydm host stopped");
    Ok(())
}

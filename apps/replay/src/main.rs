//! Replays a captured notification stream through the reassembly engine.
//!
//! Usage: `bledrop-replay <capture-file>`
//!
//! Completed transfers are written to the configured output directory and
//! their paths printed on stdout, one per line.

mod capture;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bledrop_protocol::TransferEvent;
use bledrop_receiver::{DEFAULT_LINK_CAPACITY, LinkEvent, TransferReceiver, link_channel};
use bledrop_transfer::FileSink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::ReplayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bledrop=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let capture_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: bledrop-replay <capture-file>")?;

    let cfg = ReplayConfig::load().unwrap_or_default();
    let capture = capture::load(&capture_path)
        .with_context(|| format!("failed to read capture {}", capture_path.display()))?;
    info!(
        path = %capture_path.display(),
        events = capture.len(),
        output = %cfg.output_dir.display(),
        scope = ?cfg.transfer.digest_scope,
        "replaying capture"
    );

    let sink = Arc::new(FileSink::new(&cfg.output_dir, &cfg.file_prefix)?);
    let cancel = CancellationToken::new();
    let (receiver, mut events) = TransferReceiver::new(sink, cfg.transfer.clone(), cancel.clone());
    let (link, link_rx) = link_channel(DEFAULT_LINK_CAPACITY);

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let run = tokio::spawn(receiver.run(link_rx));
    let reporter = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            report(&event);
        }
    });

    for event in capture {
        match event {
            LinkEvent::Notification(data) => {
                if !link.notify(data).await {
                    break;
                }
            }
            LinkEvent::Disconnected => break,
        }
    }
    // The end of the capture is the end of the link session.
    link.disconnect().await;
    drop(link);

    let summary = run.await??;
    reporter.await?;
    info!(
        notifications = summary.notifications,
        bytes = summary.bytes,
        completed = summary.completed,
        failed = summary.failed,
        "replay finished"
    );
    Ok(())
}

fn report(event: &TransferEvent) {
    match event {
        TransferEvent::Started => info!("transfer started"),
        TransferEvent::Progress { bytes_received } => debug!(bytes_received, "progress"),
        TransferEvent::Completed { handle, size } => {
            info!(%handle, size, "transfer completed");
            println!("{handle}");
        }
        TransferEvent::Failed { kind } => warn!(?kind, "{}", kind.status_message()),
        TransferEvent::Rejected { kind } => debug!(?kind, "{}", kind.status_message()),
    }
}

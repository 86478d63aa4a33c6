mod bluetooth;
mod codec;
mod config;
mod error;
mod export;
mod models;
mod pipeline;
mod processing;
mod sample_log;
mod snapshot;
mod utils;

use log::{debug, error, info, warn};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use config::AppConfig;
use error::ExportError;
use models::{Channel, Notification};
use pipeline::Pipeline;
use snapshot::ChannelSnapshot;
use utils::format_datetime;

const NOTIFICATION_QUEUE: usize = 256;

type Snapshots = Arc<Vec<ChannelSnapshot>>;

/// Stand-in for the plot: logs a one-line summary of every published view.
async fn present(mut rx: watch::Receiver<Snapshots>) {
    while rx.changed().await.is_ok() {
        let snapshots = rx.borrow_and_update().clone();
        for view in snapshots.iter() {
            debug!(
                "{}: {} points over {:.1} s, last {:.3}, {} onsets in view",
                view.channel,
                view.len(),
                view.x_axis.last().copied().unwrap_or(0.0),
                view.smoothed.last().copied().unwrap_or(f32::NAN),
                view.detections.len()
            );
        }
    }
}

/// Ingest notifications and run the flush cycle until shutdown or until the
/// device stops sending.
async fn main_loop(
    config: &AppConfig,
    pipeline: &mut Pipeline,
    mut notifications: mpsc::Receiver<Notification>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshots::default());
    let presenter = tokio::spawn(present(snapshot_rx));

    let mut ticker = interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            received = notifications.recv() => match received {
                // Decode errors are already logged and counted
                Some(Notification { channel, bytes }) => {
                    let _ = pipeline.on_notification(channel, bytes);
                }
                None => {
                    warn!("Device stopped delivering notifications");
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Some(snapshots) = pipeline.tick() {
                    snapshot_tx.send_replace(Arc::new(snapshots));
                }
            }
            _ = &mut shutdown => {
                info!("Program terminated by user. Stopping acquisition.");
                break;
            }
        }
    }

    // Close the last cycle so its samples make it into the export
    if let Some(snapshots) = pipeline.tick() {
        snapshot_tx.send_replace(Arc::new(snapshots));
    }
    drop(snapshot_tx);
    let _ = presenter.await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        let _ = tx.send(());
    });

    let started = OffsetDateTime::now_utc();
    info!("Session started at: {}", format_datetime(&started));

    let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_QUEUE);
    let link = match bluetooth::connect(&config.device_name, notification_tx).await {
        Ok(link) => link,
        Err(e) => {
            error!("Bluetooth connection failed: {}", e);
            return Err(e);
        }
    };

    let mut pipeline = Pipeline::new(config.processing.clone());
    main_loop(&config, &mut pipeline, notification_rx, rx).await;
    link.close().await;

    match pipeline.export(&config.export_dir) {
        Ok(path) => info!("Data saved to {}", path.display()),
        Err(ExportError::Empty) => warn!("No data collected, nothing exported"),
        Err(e) => error!("Export failed: {}", e),
    }

    // Print summary
    let stats = pipeline.stats();
    info!(
        "Session {} - {}:",
        format_datetime(&started),
        format_datetime(&OffsetDateTime::now_utc())
    );
    info!("  Log entries: {}", stats.entries);
    for channel in Channel::ALL {
        info!("  {} samples: {}", channel, stats.samples[channel.index()]);
    }
    info!("  Frames received: {}", stats.frames);
    if stats.fallbacks > 0 {
        info!("  Values read as raw counts: {}", stats.fallbacks);
    }
    if stats.decode_errors > 0 {
        warn!("  Frames dropped as undecodable: {}", stats.decode_errors);
    }

    Ok(())
}

//! Async driver for the `live` command.
//!
//! A tokio interval stands in for the display refresh: it fires at ~60 Hz
//! and every firing is one [`ProcessingLoop::tick`]. The loop's own
//! target-FPS throttle decides which of those ticks render. Queued
//! [`LiveCommand`]s are applied before each tick, so a change always lands
//! on the next rendered frame.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use crate::camera::{CameraError, FrameSource};
use crate::canvas::CanvasError;
use crate::controls::LiveCommand;
use crate::processing_loop::{Clock, PerformanceStats, ProcessingLoop, TickOutcome};
use crate::settings::Session;

/// Interval between refresh ticks (60 Hz).
pub const REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Flag set by the Ctrl+C handler.
pub fn ctrlc_flag() -> &'static AtomicBool {
    &CTRLC_RECEIVED
}

/// Install a Ctrl+C handler that asks the live loop to stop.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Stop after this many rendered frames
    pub max_frames: Option<u64>,
    /// Export the last rendered frame here on exit. `/snapshot` also writes
    /// here, or to the working directory when unset.
    pub snapshot_dir: Option<PathBuf>,
    pub refresh: Duration,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            snapshot_dir: None,
            refresh: REFRESH_INTERVAL,
        }
    }
}

impl LiveOptions {
    fn snapshot_target(&self) -> &Path {
        self.snapshot_dir.as_deref().unwrap_or(Path::new("."))
    }
}

/// How a live session ended.
#[derive(Debug, Clone, Default)]
pub struct LiveReport {
    pub frames_rendered: u64,
    pub stats: PerformanceStats,
    /// Snapshots taken on request while running
    pub snapshots: Vec<PathBuf>,
    /// Snapshot written on exit
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Snapshot(#[from] CanvasError),
}

/// Run the loop until `stop` is set or the frame limit is reached.
///
/// Commands are drained from `commands` before every tick. A rejected
/// control event or a failed on-demand snapshot is logged and the loop
/// keeps going; a closed channel just means no more commands.
///
/// The source is released before this returns, including when the
/// exit snapshot fails.
pub async fn run<S, R, C>(
    processing: &mut ProcessingLoop<S, R, C>,
    session: &mut Session,
    commands: &mut mpsc::Receiver<LiveCommand>,
    options: &LiveOptions,
    stop: &AtomicBool,
) -> Result<LiveReport, LiveError>
where
    S: FrameSource,
    R: Rng,
    C: Clock,
{
    processing.start()?;

    let mut refresh = tokio::time::interval(options.refresh);
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut snapshots = Vec::new();
    let mut waiting_logged = false;
    loop {
        refresh.tick().await;

        if stop.load(Ordering::SeqCst) {
            break;
        }

        while let Ok(command) = commands.try_recv() {
            match command {
                LiveCommand::Control(event) => {
                    if let Err(e) = session.apply(event, processing.rng_mut()) {
                        log::warn!("Ignored control event: {}", e);
                    }
                }
                LiveCommand::Snapshot => {
                    match processing.canvas().export_snapshot(options.snapshot_target()) {
                        Ok(path) => snapshots.push(path),
                        Err(e) => log::warn!("Snapshot failed: {}", e),
                    }
                }
            }
        }

        match processing.tick(session) {
            TickOutcome::Rendered { summary, duration } => {
                log::trace!(
                    "Rendered {}x{} ({} blocks, {} flashed) in {:?}",
                    summary.width,
                    summary.height,
                    summary.blocks,
                    summary.flashed,
                    duration
                );
            }
            TickOutcome::NoFrame if !waiting_logged => {
                log::info!("Waiting for the first camera frame...");
                waiting_logged = true;
            }
            TickOutcome::Idle => break,
            _ => {}
        }

        if let Some(max) = options.max_frames {
            if processing.frames_rendered() >= max {
                break;
            }
        }
    }

    let snapshot = match &options.snapshot_dir {
        Some(dir) => match processing.canvas().export_snapshot(dir) {
            Ok(path) => Some(path),
            Err(e) => {
                processing.stop();
                return Err(e.into());
            }
        },
        None => None,
    };

    let report = LiveReport {
        frames_rendered: processing.frames_rendered(),
        stats: processing.stats(),
        snapshots,
        snapshot,
    };
    processing.stop();
    Ok(report)
}

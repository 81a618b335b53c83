//! Throttled, stoppable frame loop.
//!
//! The loop does no scheduling of its own. Whatever drives it (the `live`
//! command's refresh ticker, or a test) calls [`ProcessingLoop::tick`] as
//! often as it likes; the loop decides whether that tick does any work.
//!
//! ```text
//!        start() ok
//!  Idle ───────────────▶ Running ──┐ tick(): Throttled | NoFrame | Rendered
//!   ▲                       │  ▲    │
//!   └──────── stop() ───────┘  └────┘
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::camera::{CameraError, FrameSource};
use crate::canvas::Canvas;
use crate::poster::processor::{FrameProcessor, RenderSummary};
use crate::settings::Session;

/// Number of processing durations kept for the rolling average.
pub const PERFORMANCE_WINDOW_CAPACITY: usize = 60;

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the loop.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.nanos.store(duration_nanos(now), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(duration_nanos(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Bounded FIFO of recent per-frame processing durations.
#[derive(Debug, Clone, Default)]
pub struct PerformanceWindow {
    samples: VecDeque<Duration>,
}

impl PerformanceWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(PERFORMANCE_WINDOW_CAPACITY),
        }
    }

    /// Add a sample, evicting the oldest once the window is full.
    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() == PERFORMANCE_WINDOW_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }

    /// Mean duration in milliseconds, or 0 for an empty window.
    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Duration = self.samples.iter().sum();
        total.as_secs_f64() * 1000.0 / self.samples.len() as f64
    }
}

/// Rolling numbers shown to the user, refreshed once per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceStats {
    pub fps: u32,
    pub avg_processing_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// What a single call to [`ProcessingLoop::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The loop is stopped; nothing happened.
    Idle,
    /// Too soon after the last processed tick for the target frame rate.
    Throttled,
    /// The source had no frame to give.
    NoFrame,
    Rendered {
        summary: RenderSummary,
        duration: Duration,
    },
}

/// Drives a [`FrameSource`] through a [`FrameProcessor`] onto a [`Canvas`].
pub struct ProcessingLoop<S, R, C = SystemClock>
where
    S: FrameSource,
    R: Rng,
    C: Clock,
{
    source: S,
    processor: FrameProcessor<R>,
    canvas: Canvas,
    clock: C,
    state: LoopState,
    /// Clock reading at the start of the last processed tick
    last_processed: Option<Duration>,
    stats_since: Duration,
    frames_since_stats: u32,
    frames_rendered: u64,
    window: PerformanceWindow,
    stats: PerformanceStats,
}

impl<S, R, C> std::fmt::Debug for ProcessingLoop<S, R, C>
where
    S: FrameSource,
    R: Rng,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingLoop")
            .field("state", &self.state)
            .field("frames_rendered", &self.frames_rendered)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource, R: Rng> ProcessingLoop<S, R, SystemClock> {
    pub fn new(source: S, rng: R) -> Self {
        Self::with_clock(source, rng, SystemClock::new())
    }
}

impl<S, R, C> ProcessingLoop<S, R, C>
where
    S: FrameSource,
    R: Rng,
    C: Clock,
{
    pub fn with_clock(source: S, rng: R, clock: C) -> Self {
        Self {
            source,
            processor: FrameProcessor::new(rng),
            canvas: Canvas::new(),
            clock,
            state: LoopState::Idle,
            last_processed: None,
            stats_since: Duration::ZERO,
            frames_since_stats: 0,
            frames_rendered: 0,
            window: PerformanceWindow::new(),
            stats: PerformanceStats::default(),
        }
    }

    /// Acquire the source and begin accepting ticks.
    ///
    /// Starting a running loop does nothing. If the source fails to start
    /// the loop stays idle and the error is returned.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.state == LoopState::Running {
            return Ok(());
        }

        self.source.start()?;

        self.state = LoopState::Running;
        self.last_processed = None;
        self.stats_since = self.clock.now();
        self.frames_since_stats = 0;
        self.frames_rendered = 0;
        log::info!("Processing started");
        Ok(())
    }

    /// Stop processing and release the source.
    ///
    /// Every tick after this returns [`TickOutcome::Idle`] until the next
    /// successful `start()`.
    pub fn stop(&mut self) {
        if self.state == LoopState::Idle {
            return;
        }
        self.state = LoopState::Idle;
        self.last_processed = None;
        self.source.stop();
        log::info!("Processing stopped after {} frames", self.frames_rendered);
    }

    /// Run one scheduling opportunity.
    pub fn tick(&mut self, session: &Session) -> TickOutcome {
        if self.state == LoopState::Idle {
            return TickOutcome::Idle;
        }

        let started = self.clock.now();
        let interval = Duration::from_secs_f64(session.settings().frame_interval_ms() / 1000.0);
        if let Some(last) = self.last_processed {
            if started.saturating_sub(last) < interval {
                log::trace!("Tick throttled");
                return TickOutcome::Throttled;
            }
        }
        self.last_processed = Some(started);

        let Some(frame) = self.source.current_frame() else {
            return TickOutcome::NoFrame;
        };

        let summary = self.processor.render(
            &frame,
            session.settings(),
            session.steps(),
            &mut self.canvas,
        );

        let finished = self.clock.now();
        let duration = finished.saturating_sub(started);
        self.window.record(duration);
        self.frames_rendered += 1;
        self.update_stats(finished);

        TickOutcome::Rendered { summary, duration }
    }

    fn update_stats(&mut self, now: Duration) {
        self.frames_since_stats += 1;

        let elapsed = now.saturating_sub(self.stats_since);
        if elapsed < STATS_INTERVAL {
            return;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.stats = PerformanceStats {
            fps: (f64::from(self.frames_since_stats) * 1000.0 / elapsed_ms).round() as u32,
            avg_processing_ms: self.window.average_ms().round() as u32,
        };
        log::info!(
            "FPS: {}  Processing: {}ms",
            self.stats.fps,
            self.stats.avg_processing_ms
        );

        self.frames_since_stats = 0;
        self.stats_since = now;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn stats(&self) -> PerformanceStats {
        self.stats
    }

    pub fn window(&self) -> &PerformanceWindow {
        &self.window
    }

    /// The most recently rendered output.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Frames rendered since the last `start()`.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Random source for control events that need one (randomize).
    pub fn rng_mut(&mut self) -> &mut R {
        self.processor.rng_mut()
    }
}

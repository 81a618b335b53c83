//! Webcam frame source backed by nokhwa.
//!
//! The device is opened and read on a dedicated thread, which publishes
//! every decoded frame into a single-slot [`LatestFrame`]. The processing
//! loop only ever sees the newest frame; older ones are overwritten.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;

use super::device::list_devices;
use super::frame_utils::{convert_to_rgb, mirror_horizontal};
use super::source::FrameSource;
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Pause after a failed read before asking the device again.
const READ_RETRY: Duration = Duration::from_millis(5);

/// Formats asked for in order. `None` takes whatever the device offers at
/// its highest resolution.
const FORMAT_PREFERENCES: [(&str, Option<NokhwaFrameFormat>); 3] = [
    ("NV12", Some(NokhwaFrameFormat::NV12)),
    ("MJPEG", Some(NokhwaFrameFormat::MJPEG)),
    ("highest resolution", None),
];

/// The most recent frame, shared between the capture thread and the loop.
#[derive(Default)]
struct LatestFrame(Mutex<Option<Frame>>);

impl LatestFrame {
    fn publish(&self, frame: Frame) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(frame);
        }
    }

    fn snapshot(&self) -> Option<Frame> {
        self.0.lock().ok()?.clone()
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }
}

/// What the device agreed to once the stream opened.
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    resolution: Resolution,
    fps: u32,
}

struct Worker {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn join(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.handle.join().is_err() {
            log::warn!("Camera capture thread panicked");
        }
    }

    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// A webcam as a [`FrameSource`].
///
/// `open` only checks that the device exists. The stream is opened by
/// `start` and released by `stop` (or on drop).
pub struct CameraCapture {
    settings: CameraSettings,
    latest: Arc<LatestFrame>,
    worker: Option<Worker>,
    negotiated: Option<Negotiated>,
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("negotiated", &self.negotiated)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CameraCapture {
    /// # Errors
    /// * `CameraError::NoDevices` - If the system has no cameras at all
    /// * `CameraError::DeviceNotFound` - If the device index doesn't exist
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let devices = list_devices()?;
        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        if !devices.iter().any(|d| d.index == settings.device_index) {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }

        Ok(Self {
            settings,
            latest: Arc::new(LatestFrame::default()),
            worker: None,
            negotiated: None,
        })
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Resolution the camera actually negotiated, once started.
    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.negotiated.map(|n| n.resolution)
    }

    /// Frame rate the camera actually negotiated, once started.
    pub fn actual_fps(&self) -> Option<u32> {
        self.negotiated.map(|n| n.fps)
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(Worker::is_alive)
    }
}

impl FrameSource for CameraCapture {
    /// Open the stream and start the capture thread.
    ///
    /// Blocks until the device has opened (or failed to).
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - If capture is already running
    /// * `CameraError::PermissionDenied` - If camera access is denied
    /// * `CameraError::OpenFailed` - If no capture format could be opened
    /// * `CameraError::StreamFailed` - If the stream fails to start
    fn start(&mut self) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }
        // A worker that died on its own still needs joining
        if let Some(stale) = self.worker.take() {
            stale.join();
        }

        self.latest.clear();
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = {
            let settings = self.settings.clone();
            let latest = Arc::clone(&self.latest);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("camera-capture".to_string())
                .spawn(move || capture_frames(settings, latest, running, ready_tx))
                .map_err(|e| CameraError::StreamFailed(e.to_string()))?
        };
        let worker = Worker { handle, running };

        match ready_rx.recv() {
            Ok(Ok(negotiated)) => {
                log::info!(
                    "Camera {} streaming at {} @ {} fps",
                    self.settings.device_index,
                    negotiated.resolution,
                    negotiated.fps
                );
                self.negotiated = Some(negotiated);
                self.worker = Some(worker);
                Ok(())
            }
            Ok(Err(e)) => {
                worker.join();
                Err(e)
            }
            Err(_) => {
                worker.join();
                Err(CameraError::StreamFailed(
                    "capture thread exited before the stream opened".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join();
            log::info!("Camera {} released", self.settings.device_index);
        }
    }

    fn current_frame(&mut self) -> Option<Frame> {
        self.latest.snapshot()
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture thread body: open, report, then publish frames until told to stop.
fn capture_frames(
    settings: CameraSettings,
    latest: Arc<LatestFrame>,
    running: Arc<AtomicBool>,
    ready: SyncSender<Result<Negotiated, CameraError>>,
) {
    let opened = open_with_fallback(&settings).and_then(|mut camera| {
        camera
            .open_stream()
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;
        Ok(camera)
    });
    let mut camera = match opened {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let resolution = camera.resolution();
    let negotiated = Negotiated {
        resolution: Resolution::new(resolution.width(), resolution.height()),
        fps: camera.frame_rate(),
    };
    if ready.send(Ok(negotiated)).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    let mut undecodable = 0u64;
    while running.load(Ordering::Relaxed) {
        // Blocks until the device delivers the next frame
        match camera.frame() {
            Ok(raw) => match convert_to_rgb(&raw) {
                Some(mut frame) => {
                    if settings.mirror {
                        mirror_horizontal(&mut frame);
                    }
                    latest.publish(frame);
                }
                None => undecodable += 1,
            },
            Err(e) => {
                log::trace!("Camera read failed: {}", e);
                thread::sleep(READ_RETRY);
            }
        }
    }

    if undecodable > 0 {
        log::debug!("Dropped {} undecodable camera frames", undecodable);
    }
    if let Err(e) = camera.stop_stream() {
        log::debug!("Camera stream did not close cleanly: {}", e);
    }
}

fn requested_format(settings: &CameraSettings, format: Option<NokhwaFrameFormat>) -> RequestedFormat<'static> {
    let kind = match format {
        Some(format) => RequestedFormatType::Closest(CameraFormat::new(
            nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height),
            format,
            settings.fps,
        )),
        None => RequestedFormatType::AbsoluteHighestResolution,
    };
    RequestedFormat::new::<RgbFormat>(kind)
}

fn open_with_fallback(settings: &CameraSettings) -> Result<Camera, CameraError> {
    let index = CameraIndex::Index(settings.device_index);
    let mut last_error = String::new();

    for (label, format) in FORMAT_PREFERENCES {
        match Camera::new(index.clone(), requested_format(settings, format)) {
            Ok(camera) => {
                log::debug!("Opened camera {} as {}", settings.device_index, label);
                return Ok(camera);
            }
            Err(e) => {
                log::debug!("Camera {} refused {}: {}", settings.device_index, label, e);
                last_error = e.to_string();
            }
        }
    }

    Err(classify_open_error(&last_error))
}

/// Backends report missing camera access as free-form text.
fn classify_open_error(message: &str) -> CameraError {
    let lower = message.to_lowercase();
    let denied = ["permission", "denied", "authorization", "access"]
        .iter()
        .any(|word| lower.contains(word));
    if denied {
        CameraError::PermissionDenied
    } else {
        CameraError::OpenFailed(message.to_string())
    }
}

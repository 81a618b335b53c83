//! Frame sources the processing loop pulls from.

use std::path::Path;

use super::types::{CameraError, Frame};
use crate::canvas::{load_step_image, CanvasError};

/// Something that hands out the current video frame.
///
/// `start` acquires the underlying device and `stop` releases it. Between
/// the two, `current_frame` returns a snapshot of the most recent frame, or
/// `None` if nothing has arrived yet.
pub trait FrameSource {
    fn start(&mut self) -> Result<(), CameraError>;

    fn stop(&mut self);

    fn current_frame(&mut self) -> Option<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn start(&mut self) -> Result<(), CameraError> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn current_frame(&mut self) -> Option<Frame> {
        (**self).current_frame()
    }
}

/// A source that serves the same still image as every frame.
///
/// Stands in for a camera in the `render` command, in tests and on
/// machines without a webcam.
#[derive(Debug, Clone)]
pub struct StillSource {
    frame: Frame,
    running: bool,
}

impl StillSource {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            running: false,
        }
    }

    /// Decode an image file into a still source.
    pub fn open(path: &Path) -> Result<Self, CanvasError> {
        let image = load_step_image(path)?;
        let (width, height) = image.dimensions();
        Ok(Self::new(Frame::from_rgba(image.as_raw().clone(), width, height)))
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl FrameSource for StillSource {
    fn start(&mut self) -> Result<(), CameraError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn current_frame(&mut self) -> Option<Frame> {
        self.running.then(|| self.frame.clone())
    }
}

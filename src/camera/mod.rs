//! Camera capture module for webcam access and frame capture.
//!
//! This module provides the frame sources the processing loop reads from:
//! - [`FrameSource`], the narrow interface the loop depends on
//! - [`StillSource`], a single image served as every frame
//! - [`CameraCapture`] and [`list_devices`] (with the `camera` feature)
//! - Configuration via [`CameraSettings`] and [`Resolution`]

#[cfg(feature = "camera")]
mod capture;
#[cfg(feature = "camera")]
mod device;
mod frame_utils;
mod source;
mod types;

#[cfg(feature = "camera")]
pub use capture::CameraCapture;
#[cfg(feature = "camera")]
pub use device::list_devices;
pub use frame_utils::mirror_horizontal;
pub use source::{FrameSource, StillSource};
pub use types::{CameraError, CameraInfo, CameraSettings, Frame, FrameFormat, Resolution};

/// Device enumeration is unavailable without the `camera` feature.
#[cfg(not(feature = "camera"))]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    Err(CameraError::Unsupported)
}

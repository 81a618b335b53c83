//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Requested capture resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Low resolution (160x120) - chunky and very fast
    pub const LOW: Resolution = Resolution {
        width: 160,
        height: 120,
    };

    /// Medium resolution (320x240) - default
    pub const MEDIUM: Resolution = Resolution {
        width: 320,
        height: 240,
    };

    /// High resolution (640x480)
    pub const HIGH: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// Ultra resolution (1280x720) - use with larger pixel sizes
    pub const ULTRA: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// Look up a preset by name (`low`, `medium`, `high`, `ultra`).
    pub fn preset(name: &str) -> Option<Resolution> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(Self::LOW),
            "medium" => Some(Self::MEDIUM),
            "high" => Some(Self::HIGH),
            "ultra" => Some(Self::ULTRA),
            _ => None,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Accepts a preset name or `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = Resolution::preset(s) {
            return Ok(preset);
        }
        let (w, h) = s.split_once('x').ok_or_else(|| {
            format!(
                "Invalid resolution '{}'. Use low, medium, high, ultra or WIDTHxHEIGHT",
                s
            )
        })?;
        let width: u32 = w
            .parse()
            .map_err(|_| format!("Invalid width '{}' in resolution", w))?;
        let height: u32 = h
            .parse()
            .map_err(|_| format!("Invalid height '{}' in resolution", h))?;
        if width == 0 || height == 0 {
            return Err("Resolution width and height must be greater than 0".to_string());
        }
        Ok(Resolution { width, height })
    }
}

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
    /// RGBA format (4 bytes per pixel), alpha ignored
    Rgba,
}

/// A captured frame: raw pixels plus dimensions.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Wrap an RGBA buffer.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            format: FrameFormat::Rgba,
            timestamp: Instant::now(),
        }
    }

    /// Wrap an RGB buffer.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    /// Get the number of bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
            FrameFormat::Rgba => 4,
        }
    }

    /// True if `data` holds at least `width * height` pixels.
    pub fn is_complete(&self) -> bool {
        let needed = self.width as usize * self.height as usize * self.bytes_per_pixel();
        self.data.len() >= needed
    }

    /// RGB channels of the pixel at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = (y as usize * self.width as usize + x as usize) * self.bytes_per_pixel();
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }
}

/// Settings for camera capture.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera device index
    pub device_index: u32,
    /// Capture resolution
    pub resolution: Resolution,
    /// Requested capture FPS (actual may vary)
    pub fps: u32,
    /// Mirror horizontally (selfie mode)
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
            mirror: true, // Default to selfie mode
        }
    }
}

/// Errors that can occur while acquiring or reading a frame source.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// No cameras found on the system
    #[error("No cameras found")]
    NoDevices,
    /// Failed to query camera devices
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),
    /// Failed to open camera
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),
    /// Camera permission denied
    #[error("Could not access camera: permission denied. Grant camera access to this terminal and try again")]
    PermissionDenied,
    /// Camera device not found at specified index
    #[error("Camera device {0} not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(u32),
    /// Failed to start video stream
    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),
    /// Capture is already running
    #[error("Capture is already running")]
    AlreadyRunning,
    /// Camera support was not compiled in
    #[error("Camera support is not enabled in this build (rebuild with --features camera)")]
    Unsupported,
}

//! Processing settings and the session state mutated by control events.
//!
//! The control surface never touches settings or steps directly. It sends
//! [`ControlEvent`]s, which the session applies between frames, so a change
//! always takes effect on the next tick and never mid-frame.

use rand::Rng;

use crate::canvas::StepImage;
use crate::color::Hsb;
use crate::poster::steps::{AppearanceKind, StepError, StepModel, MIN_STEPS};

pub const MAX_COLOR_FLASH: u8 = 100;

/// Knobs that shape every rendered frame.
///
/// Fields are private so every value goes through a clamping setter; the
/// processor and loop can rely on `steps >= 2`, `pixel_size >= 1`,
/// `contrast >= 0` and `target_fps >= 1`. Only the flash percentage has an
/// upper bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSettings {
    steps: usize,
    pixel_size: u32,
    contrast: f32,
    target_fps: u32,
    color_flash: u8,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            steps: 4,
            pixel_size: 8,
            contrast: 1.0,
            target_fps: 30,
            color_flash: 0,
        }
    }
}

impl ProcessingSettings {
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Edge length of one block in source pixels.
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Percent chance per block per frame of a random step.
    pub fn color_flash(&self) -> u8 {
        self.color_flash
    }

    /// Minimum milliseconds between processed frames.
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / f64::from(self.target_fps)
    }

    pub fn set_steps(&mut self, steps: usize) {
        self.steps = steps.max(MIN_STEPS);
    }

    pub fn set_pixel_size(&mut self, pixel_size: u32) {
        self.pixel_size = pixel_size.max(1);
    }

    /// NaN falls back to neutral contrast.
    pub fn set_contrast(&mut self, contrast: f32) {
        self.contrast = if contrast.is_nan() {
            1.0
        } else {
            contrast.max(0.0)
        };
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps.max(1);
    }

    pub fn set_color_flash(&mut self, amount: u8) {
        self.color_flash = amount.min(MAX_COLOR_FLASH);
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.set_steps(steps);
        self
    }

    pub fn with_pixel_size(mut self, pixel_size: u32) -> Self {
        self.set_pixel_size(pixel_size);
        self
    }

    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.set_contrast(contrast);
        self
    }

    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.set_target_fps(fps);
        self
    }

    pub fn with_color_flash(mut self, amount: u8) -> Self {
        self.set_color_flash(amount);
        self
    }
}

/// A discrete update from the control surface.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    SetSteps(usize),
    SetPixelSize(u32),
    SetContrast(f32),
    SetTargetFps(u32),
    SetColorFlash(u8),
    SetStepColor { index: usize, hex: String },
    SetStepHsb { index: usize, hsb: Hsb },
    SetStepImage { index: usize, image: StepImage },
    SetStepKind { index: usize, kind: AppearanceKind },
    ResetStep(usize),
    ResetAllSteps,
    RandomizeSteps,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Step(#[from] StepError),
}

/// Settings plus step appearances: everything a frame render reads.
#[derive(Debug, Clone)]
pub struct Session {
    settings: ProcessingSettings,
    steps: StepModel,
}

impl Session {
    pub fn new(settings: ProcessingSettings) -> Result<Self, SessionError> {
        let steps = StepModel::new(settings.steps())?;
        Ok(Self { settings, steps })
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    pub fn steps(&self) -> &StepModel {
        &self.steps
    }

    /// Apply one control event.
    ///
    /// Numeric settings are clamped rather than rejected. Step edits with a
    /// bad index or color fail and leave the session unchanged.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        event: ControlEvent,
        rng: &mut R,
    ) -> Result<(), SessionError> {
        log::debug!("Control event: {:?}", event);
        match event {
            ControlEvent::SetSteps(count) => {
                self.settings.set_steps(count);
                self.steps.resize(self.settings.steps())?;
            }
            ControlEvent::SetPixelSize(size) => self.settings.set_pixel_size(size),
            ControlEvent::SetContrast(contrast) => self.settings.set_contrast(contrast),
            ControlEvent::SetTargetFps(fps) => self.settings.set_target_fps(fps),
            ControlEvent::SetColorFlash(amount) => self.settings.set_color_flash(amount),
            ControlEvent::SetStepColor { index, hex } => self.steps.set_color(index, &hex)?,
            ControlEvent::SetStepHsb { index, hsb } => self.steps.set_color_hsb(index, hsb)?,
            ControlEvent::SetStepImage { index, image } => self.steps.set_image(index, image)?,
            ControlEvent::SetStepKind { index, kind } => self.steps.set_kind(index, kind)?,
            ControlEvent::ResetStep(index) => self.steps.reset_one(index)?,
            ControlEvent::ResetAllSteps => self.steps.reset_all(),
            ControlEvent::RandomizeSteps => self.steps.randomize_all(rng),
        }
        Ok(())
    }
}

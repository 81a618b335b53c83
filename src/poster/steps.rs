//! Per-step appearance data (solid color or custom image).

use rand::Rng;

use crate::canvas::StepImage;
use crate::color::{hex_to_rgb, Hsb, Rgb};

/// Smallest step count the model accepts.
pub const MIN_STEPS: usize = 2;

/// Which appearance of a step is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppearanceKind {
    #[default]
    Color,
    Image,
}

/// One quantization level.
///
/// Only the field selected by `kind` is meaningful. Switching a step to
/// [`AppearanceKind::Image`] keeps its color around so switching back
/// restores it.
#[derive(Debug, Clone)]
pub struct Step {
    kind: AppearanceKind,
    color: Rgb,
    image: Option<StepImage>,
}

impl Step {
    fn gray(index: usize, count: usize) -> Self {
        Self {
            kind: AppearanceKind::Color,
            color: default_color(index, count),
            image: None,
        }
    }

    pub fn kind(&self) -> AppearanceKind {
        self.kind
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn color_hex(&self) -> String {
        self.color.to_hex()
    }

    pub fn image(&self) -> Option<&StepImage> {
        self.image.as_ref()
    }

    /// The image to draw for this step, if the step is in image mode and
    /// has one assigned. `None` means "fill with [`Step::color`]".
    pub fn active_image(&self) -> Option<&StepImage> {
        match self.kind {
            AppearanceKind::Image => self.image.as_ref(),
            AppearanceKind::Color => None,
        }
    }
}

/// Errors from step model operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("Step {index} is out of range (have {len} steps)")]
    OutOfRange { index: usize, len: usize },
    #[error("'{0}' is not a 6-digit hex color")]
    InvalidColor(String),
    #[error("At least 2 steps are required, got {0}")]
    InvalidStepCount(usize),
}

/// Default grayscale color for step `index` out of `count`.
///
/// Steps are spread evenly from black (index 0) to white (last index).
pub fn default_color(index: usize, count: usize) -> Rgb {
    if count < MIN_STEPS {
        return Rgb::BLACK;
    }
    let level = (index as f64 * 255.0 / (count - 1) as f64).round();
    Rgb::gray(level.clamp(0.0, 255.0) as u8)
}

/// The ordered list of step appearances.
///
/// The list length always equals the configured step count.
#[derive(Debug, Clone)]
pub struct StepModel {
    steps: Vec<Step>,
}

impl StepModel {
    /// Create a model with `count` default grayscale steps.
    pub fn new(count: usize) -> Result<Self, StepError> {
        let mut model = Self { steps: Vec::new() };
        model.initialize(count)?;
        Ok(model)
    }

    /// Replace every step with a fresh grayscale default.
    pub fn initialize(&mut self, count: usize) -> Result<(), StepError> {
        check_count(count)?;
        self.steps = (0..count).map(|i| Step::gray(i, count)).collect();
        Ok(())
    }

    /// Change the step count, keeping existing steps by index.
    ///
    /// New steps get the default gray for their index under the *new*
    /// count; existing steps keep whatever they had, even if that is no
    /// longer the default gray for their position.
    pub fn resize(&mut self, count: usize) -> Result<(), StepError> {
        check_count(count)?;
        let old = self.steps.len();
        if count <= old {
            self.steps.truncate(count);
        } else {
            self.steps.extend((old..count).map(|i| Step::gray(i, count)));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Step, StepError> {
        self.steps.get(index).ok_or(StepError::OutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Step, StepError> {
        let len = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or(StepError::OutOfRange { index, len })
    }

    /// Set a step to a solid hex color.
    ///
    /// A malformed color leaves the step untouched.
    pub fn set_color(&mut self, index: usize, hex: &str) -> Result<(), StepError> {
        let step = self.get_mut(index)?;
        let color = hex_to_rgb(hex).ok_or_else(|| StepError::InvalidColor(hex.to_string()))?;
        step.kind = AppearanceKind::Color;
        step.color = color;
        Ok(())
    }

    pub fn set_color_rgb(&mut self, index: usize, color: Rgb) -> Result<(), StepError> {
        let step = self.get_mut(index)?;
        step.kind = AppearanceKind::Color;
        step.color = color;
        Ok(())
    }

    /// Set a step color from editor-style HSB values.
    pub fn set_color_hsb(&mut self, index: usize, hsb: Hsb) -> Result<(), StepError> {
        self.set_color_rgb(index, hsb.to_rgb())
    }

    /// Assign an image to a step and switch it to image mode.
    pub fn set_image(&mut self, index: usize, image: StepImage) -> Result<(), StepError> {
        let step = self.get_mut(index)?;
        step.kind = AppearanceKind::Image;
        step.image = Some(image);
        Ok(())
    }

    /// Flip a step between color and image mode without discarding either.
    pub fn set_kind(&mut self, index: usize, kind: AppearanceKind) -> Result<(), StepError> {
        self.get_mut(index)?.kind = kind;
        Ok(())
    }

    /// The step color as HSB, for seeding editor sliders.
    pub fn hsb(&self, index: usize) -> Result<Hsb, StepError> {
        Ok(self.get(index)?.color.to_hsb())
    }

    /// Restore one step to its default gray and drop its image.
    pub fn reset_one(&mut self, index: usize) -> Result<(), StepError> {
        let count = self.steps.len();
        *self.get_mut(index)? = Step::gray(index, count);
        Ok(())
    }

    pub fn reset_all(&mut self) {
        let count = self.steps.len();
        self.steps = (0..count).map(|i| Step::gray(i, count)).collect();
    }

    /// Give every step a random vivid color, discarding all images.
    ///
    /// Hue is drawn from `0..360`, saturation from `50..=100` and
    /// brightness from `60..=100` so no step comes out dark or washed out.
    pub fn randomize_all<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for step in &mut self.steps {
            let hsb = Hsb::new(
                rng.gen_range(0..360),
                rng.gen_range(50..=100),
                rng.gen_range(60..=100),
            );
            step.kind = AppearanceKind::Color;
            step.color = hsb.to_rgb();
            step.image = None;
        }
    }

    pub fn colors_hex(&self) -> Vec<String> {
        self.steps.iter().map(Step::color_hex).collect()
    }
}

fn check_count(count: usize) -> Result<(), StepError> {
    if count < MIN_STEPS {
        return Err(StepError::InvalidStepCount(count));
    }
    Ok(())
}

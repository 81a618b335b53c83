//! Posterizer core: turning camera frames into a few discrete steps.
//!
//! Each frame goes through the same pipeline:
//!
//! 1. **Blocking** - split the frame into `pixel_size` squares
//! 2. **Brightness** - average BT.601 luminance per block
//! 3. **Contrast** - stretch around mid-gray and clamp
//! 4. **Quantization** - map brightness to a step index
//! 5. **Flash** - optionally swap in a random step per block
//! 6. **Paint** - fill the block with the step's color or image
//!
//! Steps 2 to 5 live in [`quantize`], the step appearances in [`steps`] and
//! the per-frame walk in [`processor`].

pub mod processor;
pub mod quantize;
pub mod steps;

pub use processor::{block_brightness, output_dimensions, BlockGrid, FrameProcessor, RenderSummary};
pub use quantize::{apply_contrast, apply_flash, luminance, map_to_step_index};
pub use steps::{default_color, AppearanceKind, Step, StepError, StepModel, MIN_STEPS};

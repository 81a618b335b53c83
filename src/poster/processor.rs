//! Per-frame posterization: blocks in, painted steps out.

use rand::Rng;

use super::quantize::{apply_contrast, apply_flash, luminance, map_to_step_index};
use super::steps::StepModel;
use crate::camera::Frame;
use crate::canvas::PaintTarget;
use crate::color::Rgb;
use crate::settings::ProcessingSettings;

/// Step index chosen for every block of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockGrid {
    /// Blocks per row
    pub columns: u32,
    /// Blocks per column
    pub rows: u32,
    /// Step index per block, row-major starting top-left
    pub indices: Vec<usize>,
}

impl BlockGrid {
    pub fn get(&self, column: u32, row: u32) -> Option<usize> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.indices
            .get((row * self.columns + column) as usize)
            .copied()
    }
}

/// What a call to [`FrameProcessor::render`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Output width in pixels (a multiple of the block size)
    pub width: u32,
    /// Output height in pixels (a multiple of the block size)
    pub height: u32,
    /// Number of blocks painted
    pub blocks: usize,
    /// Blocks whose step was replaced by the flash effect
    pub flashed: usize,
}

/// Output size for a `width` x `height` source: each side rounded down to a
/// whole number of blocks.
pub fn output_dimensions(width: u32, height: u32, pixel_size: u32) -> (u32, u32) {
    let size = pixel_size.max(1);
    ((width / size) * size, (height / size) * size)
}

/// Average luminance of the block whose top-left corner is (x, y).
///
/// Only pixels inside the frame are sampled. A block with no pixels in
/// bounds, or any block of a frame whose buffer is short, has brightness 0.
pub fn block_brightness(frame: &Frame, x: u32, y: u32, size: u32) -> f32 {
    if !frame.is_complete() {
        return 0.0;
    }

    let x_end = x.saturating_add(size).min(frame.width);
    let y_end = y.saturating_add(size).min(frame.height);

    let mut total = 0.0f32;
    let mut count = 0u32;
    for py in y..y_end {
        for px in x..x_end {
            let (r, g, b) = frame.rgb_at(px, py);
            total += luminance(r, g, b);
            count += 1;
        }
    }

    if count > 0 {
        total / count as f32
    } else {
        0.0
    }
}

/// Turns camera frames into posterized output.
///
/// Holds the random source used by the color-flash effect and a reusable
/// index buffer so steady-state frames don't allocate.
#[derive(Debug)]
pub struct FrameProcessor<R: Rng> {
    rng: R,
    grid: BlockGrid,
}

impl<R: Rng> FrameProcessor<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            grid: BlockGrid::default(),
        }
    }

    /// The random source shared by the flash effect and step randomization.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Compute the step index of every block without painting anything.
    pub fn quantize_blocks(&mut self, frame: &Frame, settings: &ProcessingSettings) -> BlockGrid {
        self.quantize_into_grid(frame, settings);
        self.grid.clone()
    }

    /// Returns the number of flashed blocks.
    fn quantize_into_grid(&mut self, frame: &Frame, settings: &ProcessingSettings) -> usize {
        let grid = &mut self.grid;
        grid.indices.clear();
        grid.columns = 0;
        grid.rows = 0;

        if frame.width == 0 || frame.height == 0 || !frame.is_complete() {
            return 0;
        }

        let size = settings.pixel_size().max(1);
        let steps = settings.steps();
        let contrast = settings.contrast();
        let flash = settings.color_flash();
        let (out_w, out_h) = output_dimensions(frame.width, frame.height, size);
        grid.columns = out_w / size;
        grid.rows = out_h / size;
        grid.indices.reserve((grid.columns * grid.rows) as usize);

        let mut flashed = 0;
        for y in (0..out_h).step_by(size as usize) {
            for x in (0..out_w).step_by(size as usize) {
                let brightness = apply_contrast(block_brightness(frame, x, y, size), contrast);
                let mut index = map_to_step_index(brightness, steps);
                // Skipped entirely at 0% so no random numbers are drawn
                if flash > 0 {
                    let flashed_index = apply_flash(index, flash, steps, &mut self.rng);
                    if flashed_index != index {
                        flashed += 1;
                    }
                    index = flashed_index;
                }
                grid.indices.push(index);
            }
        }
        flashed
    }

    /// Render one frame onto `target`.
    ///
    /// The target is resized to the block-aligned output size and cleared
    /// to black, then each block is painted with its step's image (scaled
    /// to the block) or solid color.
    pub fn render<T: PaintTarget + ?Sized>(
        &mut self,
        frame: &Frame,
        settings: &ProcessingSettings,
        steps: &StepModel,
        target: &mut T,
    ) -> RenderSummary {
        let flashed = self.quantize_into_grid(frame, settings);

        let size = settings.pixel_size().max(1);
        let width = self.grid.columns * size;
        let height = self.grid.rows * size;
        target.resize(width, height);
        target.clear(Rgb::BLACK);

        for (i, &index) in self.grid.indices.iter().enumerate() {
            let i = i as u32;
            let x = (i % self.grid.columns) * size;
            let y = (i / self.grid.columns) * size;

            match steps.get(index) {
                Ok(step) => match step.active_image() {
                    Some(image) => target.draw_image(image, x, y, size, size),
                    None => target.fill_rect(x, y, size, size, step.color()),
                },
                Err(e) => {
                    // Step model out of sync with settings; leave the block black
                    log::warn!("No appearance for block at ({}, {}): {}", x, y, e);
                }
            }
        }

        RenderSummary {
            width,
            height,
            blocks: self.grid.indices.len(),
            flashed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::poster::steps::AppearanceKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn processor() -> FrameProcessor<StdRng> {
        FrameProcessor::new(StdRng::seed_from_u64(11))
    }

    fn uniform(width: u32, height: u32, level: u8) -> Frame {
        Frame::from_rgb(vec![level; (width * height * 3) as usize], width, height)
    }

    #[test]
    fn test_output_dimensions_round_down() {
        assert_eq!(output_dimensions(17, 9, 8), (16, 8));
        assert_eq!(output_dimensions(16, 16, 8), (16, 16));
        assert_eq!(output_dimensions(5, 5, 8), (0, 0));
        assert_eq!(output_dimensions(5, 5, 0), (5, 5));
    }

    #[test]
    fn test_block_brightness_clips_to_frame() {
        // 3x1 frame: black, black, white; a 2-wide block at x=2 only sees white
        let frame = Frame::from_rgb(vec![0, 0, 0, 0, 0, 0, 255, 255, 255], 3, 1);
        assert!((block_brightness(&frame, 2, 0, 2) - 255.0).abs() < 0.01);
        assert!((block_brightness(&frame, 0, 0, 2)).abs() < 0.01);
    }

    #[test]
    fn test_block_brightness_outside_frame_is_zero() {
        let frame = uniform(2, 2, 200);
        assert_eq!(block_brightness(&frame, 4, 4, 2), 0.0);
    }

    #[test]
    fn test_block_brightness_short_buffer_is_zero() {
        let frame = Frame::from_rgb(vec![255; 5], 2, 2);
        assert_eq!(block_brightness(&frame, 0, 0, 2), 0.0);
    }

    #[test]
    fn test_image_kind_without_image_paints_color() {
        let frame = uniform(8, 8, 0);
        let settings = ProcessingSettings::default().with_steps(2).with_pixel_size(4);
        let mut steps = StepModel::new(2).unwrap();
        steps.set_color(0, "#204060").unwrap();
        steps.set_kind(0, AppearanceKind::Image).unwrap();
        assert!(steps.get(0).unwrap().active_image().is_none());

        let mut canvas = Canvas::new();
        processor().render(&frame, &settings, &steps, &mut canvas);
        assert!(canvas.image().pixels().all(|p| p.0 == [0x20, 0x40, 0x60, 255]));
    }

    #[test]
    fn test_quantize_blocks_row_major() {
        // 4x2 frame, pixel size 2: left block dark, right block bright
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 255, 255, 255, 255, 255, 255]);
        }
        let frame = Frame::from_rgb(data, 4, 2);
        let settings = ProcessingSettings::default().with_steps(2).with_pixel_size(2);

        let grid = processor().quantize_blocks(&frame, &settings);
        assert_eq!((grid.columns, grid.rows), (2, 1));
        assert_eq!(grid.indices, vec![0, 1]);
        assert_eq!(grid.get(1, 0), Some(1));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn test_render_uniform_gray() {
        let frame = uniform(16, 16, 128);
        let settings = ProcessingSettings::default();
        let steps = StepModel::new(4).unwrap();
        let mut canvas = Canvas::new();

        let summary = processor().render(&frame, &settings, &steps, &mut canvas);
        assert_eq!(summary.width, 16);
        assert_eq!(summary.height, 16);
        assert_eq!(summary.blocks, 4);
        assert_eq!(summary.flashed, 0);
        assert!(canvas.image().pixels().all(|p| p.0 == [170, 170, 170, 255]));
    }

    #[test]
    fn test_render_incomplete_frame_is_empty() {
        let frame = Frame::from_rgb(vec![0; 5], 4, 4);
        let settings = ProcessingSettings::default();
        let steps = StepModel::new(4).unwrap();
        let mut canvas = Canvas::new();

        let summary = processor().render(&frame, &settings, &steps, &mut canvas);
        assert_eq!(summary, RenderSummary::default());
        assert_eq!((canvas.width(), canvas.height()), (0, 0));
    }

    #[test]
    fn test_render_block_larger_than_frame() {
        let frame = uniform(4, 4, 255);
        let settings = ProcessingSettings::default().with_pixel_size(8);
        let steps = StepModel::new(4).unwrap();
        let mut canvas = Canvas::new();

        let summary = processor().render(&frame, &settings, &steps, &mut canvas);
        assert_eq!(summary.blocks, 0);
        assert_eq!((canvas.width(), canvas.height()), (0, 0));
    }
}

//! Paint targets for rendered frames.
//!
//! [`PaintTarget`] is the narrow surface the frame processor draws on.
//! [`Canvas`] implements it on top of an in-memory RGBA buffer, which is
//! also what snapshots are exported from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::color::Rgb;

/// A decoded image assigned to a step. Shared, so the step model and the
/// canvas cache can both hold it cheaply.
pub type StepImage = Arc<RgbaImage>;

/// Errors from loading step images or exporting snapshots.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("Failed to load image '{}': {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to write snapshot '{}': {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Nothing has been rendered yet")]
    Empty,
}

/// A surface that rendered blocks are painted onto.
pub trait PaintTarget {
    /// Resize the surface. Existing contents are discarded.
    fn resize(&mut self, width: u32, height: u32);

    /// Fill the whole surface with one color. Called once at the start of
    /// every rendered frame.
    fn clear(&mut self, color: Rgb);

    /// Fill a rectangle with a solid color.
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb);

    /// Draw `image` scaled to exactly cover the rectangle.
    fn draw_image(&mut self, image: &StepImage, x: u32, y: u32, width: u32, height: u32);
}

/// Scaled copies of step images, keyed by source image and target size.
///
/// Entries hold a clone of the source `Arc`, so the pointer key stays
/// unique for as long as the entry lives. [`ScaledCache::sweep`] runs once
/// per frame and keeps only tiles drawn since the previous sweep whose
/// source is still owned by someone other than the cache.
#[derive(Default)]
struct ScaledCache {
    entries: HashMap<(usize, u32, u32), CachedTile>,
}

struct CachedTile {
    source: StepImage,
    scaled: RgbaImage,
    used: bool,
}

impl ScaledCache {
    fn get(&mut self, image: &StepImage, width: u32, height: u32) -> &RgbaImage {
        let key = (Arc::as_ptr(image) as usize, width, height);
        let tile = self.entries.entry(key).or_insert_with(|| {
            log::debug!(
                "Scaling step image {}x{} -> {}x{}",
                image.width(),
                image.height(),
                width,
                height
            );
            CachedTile {
                source: Arc::clone(image),
                scaled: imageops::resize(image.as_ref(), width, height, FilterType::Triangle),
                used: false,
            }
        });
        tile.used = true;
        &tile.scaled
    }

    fn sweep(&mut self) {
        let before = self.entries.len();
        self.entries
            .retain(|_, tile| tile.used && Arc::strong_count(&tile.source) > 1);
        for tile in self.entries.values_mut() {
            tile.used = false;
        }
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("Evicted {} scaled step images", evicted);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory RGBA canvas.
pub struct Canvas {
    pixels: RgbaImage,
    scaled: ScaledCache,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .field("cached_tiles", &self.scaled.len())
            .finish()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create an empty (0x0) canvas.
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
            scaled: ScaledCache::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Color of a single pixel, ignoring alpha. `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.pixels
            .get_pixel_checked(x, y)
            .map(|p| Rgb::new(p[0], p[1], p[2]))
    }

    /// Write the current contents as a PNG.
    pub fn export_png(&self, path: &Path) -> Result<(), CanvasError> {
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            return Err(CanvasError::Empty);
        }
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| CanvasError::Export {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Write a timestamped snapshot into `dir` and return its path.
    ///
    /// Files are named `posterized-snapshot-<unix millis>.png`.
    pub fn export_snapshot(&self, dir: &Path) -> Result<PathBuf, CanvasError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = dir.join(snapshot_file_name(millis));
        self.export_png(&path)?;
        log::info!("Saved snapshot to {}", path.display());
        Ok(path)
    }
}

/// File name for a snapshot taken at `millis` since the Unix epoch.
pub fn snapshot_file_name(millis: u128) -> String {
    format!("posterized-snapshot-{}.png", millis)
}

impl PaintTarget for Canvas {
    fn resize(&mut self, width: u32, height: u32) {
        if self.pixels.width() != width || self.pixels.height() != height {
            self.pixels = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self, color: Rgb) {
        self.scaled.sweep();
        let fill = opaque(color);
        for pixel in self.pixels.pixels_mut() {
            *pixel = fill;
        }
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb) {
        let fill = opaque(color);
        let x_end = x.saturating_add(width).min(self.pixels.width());
        let y_end = y.saturating_add(height).min(self.pixels.height());
        for py in y..y_end {
            for px in x..x_end {
                self.pixels.put_pixel(px, py, fill);
            }
        }
    }

    fn draw_image(&mut self, image: &StepImage, x: u32, y: u32, width: u32, height: u32) {
        if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let tile = self.scaled.get(image, width, height);
        // Alpha-blends over what is already there, like a canvas drawImage
        imageops::overlay(&mut self.pixels, tile, i64::from(x), i64::from(y));
    }
}

fn opaque(color: Rgb) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

/// Decode an image file for use as a step appearance.
pub fn load_step_image(path: &Path) -> Result<StepImage, CanvasError> {
    let decoded = image::open(path).map_err(|source| CanvasError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded step image {} ({}x{})",
        path.display(),
        decoded.width(),
        decoded.height()
    );
    Ok(Arc::new(decoded.to_rgba8()))
}

//! Frame conversion and transformation utilities.

use super::types::Frame;

/// Convert a nokhwa buffer to an RGB [`Frame`].
///
/// nokhwa's `decode_image` handles the camera's native format (MJPEG, YUYV,
/// NV12, ...). Returns `None` if decoding fails.
#[cfg(feature = "camera")]
pub(crate) fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    use nokhwa::pixel_format::RgbFormat;

    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(Frame::from_rgb(
        decoded.into_raw(),
        resolution.width(),
        resolution.height(),
    ))
}

/// Mirror a frame horizontally (flip left-right) for selfie mode.
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();
    if !frame.is_complete() {
        return;
    }

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}

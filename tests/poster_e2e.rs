//! End-to-end tests for the posterizer pipeline.
//!
//! These tests drive whole frames through the processor and loop:
//! - Uniform gray frame renders as one solid step color
//! - Step colors survive resizes by index
//! - Image steps paint their image, the loop throttles and stops
//! - Snapshots export what was rendered

use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use live_posterizer::camera::{CameraError, Frame, FrameSource, StillSource};
use live_posterizer::canvas::Canvas;
use live_posterizer::color::Rgb;
use live_posterizer::poster::{FrameProcessor, StepModel};
use live_posterizer::processing_loop::{
    ManualClock, PerformanceWindow, ProcessingLoop, TickOutcome, PERFORMANCE_WINDOW_CAPACITY,
};
use live_posterizer::settings::{ControlEvent, ProcessingSettings, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Helper to create a frame filled with one RGB color.
fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    let data = rgb.repeat((width * height) as usize);
    Frame::from_rgb(data, width, height)
}

/// Horizontal gradient from black (left) to white (right).
fn gradient_frame(width: u32, height: u32) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / (width - 1)) as u8;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    Frame::from_rgb(data, width, height)
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(1234)
}

// ====================
// Test: Uniform mid-gray frame
// ====================

#[test]
fn test_uniform_gray_renders_step_two() {
    let frame = solid_frame(16, 16, [128, 128, 128]);
    let settings = ProcessingSettings::default()
        .with_steps(4)
        .with_pixel_size(8)
        .with_contrast(1.0);
    let steps = StepModel::new(4).unwrap();
    let mut processor = FrameProcessor::new(rng());
    let mut canvas = Canvas::new();

    let grid = processor.quantize_blocks(&frame, &settings);
    assert!(grid.indices.iter().all(|&i| i == 2));

    processor.render(&frame, &settings, &steps, &mut canvas);
    assert_eq!((canvas.width(), canvas.height()), (16, 16));
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(canvas.pixel(x, y), Some(Rgb::gray(170)));
        }
    }
    assert_eq!(steps.get(2).unwrap().color_hex(), "#aaaaaa");
}

#[test]
fn test_gradient_uses_every_step_left_to_right() {
    let frame = gradient_frame(64, 8);
    let settings = ProcessingSettings::default().with_steps(4).with_pixel_size(8);
    let mut processor = FrameProcessor::new(rng());

    let grid = processor.quantize_blocks(&frame, &settings);
    assert_eq!((grid.columns, grid.rows), (8, 1));
    assert!(grid.indices.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(grid.indices.first(), Some(&0));
    assert_eq!(grid.indices.last(), Some(&3));
}

#[test]
fn test_flash_full_only_picks_valid_steps() {
    let frame = gradient_frame(64, 64);
    let settings = ProcessingSettings::default()
        .with_steps(3)
        .with_pixel_size(4)
        .with_color_flash(100);
    let mut processor = FrameProcessor::new(rng());

    let grid = processor.quantize_blocks(&frame, &settings);
    assert_eq!(grid.indices.len(), 256);
    assert!(grid.indices.iter().all(|&i| i < 3));
}

// ====================
// Test: Step colors survive resizes by index
// ====================

#[test]
fn test_resize_shrink_then_grow_keeps_survivors() {
    let custom = ["#ff0000", "#00ff00", "#0000ff", "#ffff00"];
    let mut model = StepModel::new(4).unwrap();
    for (i, hex) in custom.iter().enumerate() {
        model.set_color(i, hex).unwrap();
    }

    model.resize(4).unwrap();
    model.resize(2).unwrap();
    model.resize(5).unwrap();

    let colors = model.colors_hex();
    assert_eq!(colors.len(), 5);
    assert_eq!(colors[0], "#ff0000");
    assert_eq!(colors[1], "#00ff00");
    // round(i * 255 / 4) for i = 2, 3, 4
    assert_eq!(colors[2], "#808080");
    assert_eq!(colors[3], "#bfbfbf");
    assert_eq!(colors[4], "#ffffff");
}

// ====================
// Test: Image steps
// ====================

#[test]
fn test_image_step_paints_scaled_image() {
    let tile = Arc::new(RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 255])));
    let mut session = Session::new(ProcessingSettings::default().with_steps(2)).unwrap();
    session
        .apply(ControlEvent::SetStepImage { index: 1, image: tile }, &mut rng())
        .unwrap();

    let frame = solid_frame(16, 8, [250, 250, 250]);
    let mut processor = FrameProcessor::new(rng());
    let mut canvas = Canvas::new();
    processor.render(&frame, session.settings(), session.steps(), &mut canvas);

    assert_eq!(canvas.pixel(0, 0), Some(Rgb::new(10, 200, 30)));
    assert_eq!(canvas.pixel(15, 7), Some(Rgb::new(10, 200, 30)));
}

#[test]
fn test_control_event_takes_effect_next_render() {
    let frame = solid_frame(8, 8, [0, 0, 0]);
    let mut session = Session::new(ProcessingSettings::default()).unwrap();
    let mut processor = FrameProcessor::new(rng());
    let mut canvas = Canvas::new();

    processor.render(&frame, session.settings(), session.steps(), &mut canvas);
    assert_eq!(canvas.pixel(0, 0), Some(Rgb::BLACK));

    session
        .apply(
            ControlEvent::SetStepColor {
                index: 0,
                hex: "#336699".to_string(),
            },
            &mut rng(),
        )
        .unwrap();
    processor.render(&frame, session.settings(), session.steps(), &mut canvas);
    assert_eq!(canvas.pixel(0, 0), Some(Rgb::new(0x33, 0x66, 0x99)));
}

// ====================
// Test: Performance window and loop lifecycle
// ====================

#[test]
fn test_performance_window_keeps_last_sixty() {
    let mut window = PerformanceWindow::new();
    for i in 0..100u64 {
        window.record(Duration::from_millis(i));
        assert!(window.len() <= PERFORMANCE_WINDOW_CAPACITY);
    }
    let kept: Vec<u64> = window.iter().map(|d| d.as_millis() as u64).collect();
    assert_eq!(kept, (40..100).collect::<Vec<_>>());
}

struct FailingSource;

impl FrameSource for FailingSource {
    fn start(&mut self) -> Result<(), CameraError> {
        Err(CameraError::PermissionDenied)
    }

    fn stop(&mut self) {}

    fn current_frame(&mut self) -> Option<Frame> {
        None
    }
}

#[test]
fn test_failed_start_leaves_loop_idle() {
    let mut processing = ProcessingLoop::with_clock(FailingSource, rng(), ManualClock::new());
    assert!(matches!(
        processing.start(),
        Err(CameraError::PermissionDenied)
    ));
    assert!(!processing.is_running());
    let session = Session::new(ProcessingSettings::default()).unwrap();
    assert_eq!(processing.tick(&session), TickOutcome::Idle);
}

#[test]
fn test_loop_throttles_to_target_fps() {
    let clock = ManualClock::new();
    let source = StillSource::new(solid_frame(16, 16, [128, 128, 128]));
    let mut processing = ProcessingLoop::with_clock(source, rng(), clock.clone());
    let session = Session::new(ProcessingSettings::default().with_target_fps(30)).unwrap();
    processing.start().unwrap();

    // 60 Hz refresh for one second against a 30 fps target
    let mut rendered = 0;
    for _ in 0..60 {
        if let TickOutcome::Rendered { .. } = processing.tick(&session) {
            rendered += 1;
        }
        clock.advance(Duration::from_micros(16_667));
    }
    assert_eq!(rendered, 30);
    assert_eq!(processing.canvas().pixel(0, 0), Some(Rgb::gray(170)));
}

#[test]
fn test_ticks_after_stop_are_noops() {
    let clock = ManualClock::new();
    let source = StillSource::new(solid_frame(8, 8, [0, 0, 0]));
    let mut processing = ProcessingLoop::with_clock(source, rng(), clock.clone());
    let session = Session::new(ProcessingSettings::default()).unwrap();

    processing.start().unwrap();
    assert!(matches!(processing.tick(&session), TickOutcome::Rendered { .. }));
    processing.stop();

    for _ in 0..5 {
        clock.advance(Duration::from_secs(1));
        assert_eq!(processing.tick(&session), TickOutcome::Idle);
    }
    assert_eq!(processing.frames_rendered(), 1);
}

// ====================
// Test: Snapshot export
// ====================

#[test]
fn test_snapshot_matches_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let frame = gradient_frame(32, 16);
    let settings = ProcessingSettings::default().with_steps(3).with_pixel_size(4);
    let steps = StepModel::new(3).unwrap();
    let mut processor = FrameProcessor::new(rng());
    let mut canvas = Canvas::new();
    processor.render(&frame, &settings, &steps, &mut canvas);

    let path = canvas.export_snapshot(dir.path()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("posterized-snapshot-"));
    assert!(name.ends_with(".png"));

    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(&saved, canvas.image());
}

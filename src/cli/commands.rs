//! Subcommand handlers for live, render, list-cameras and config actions.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use super::args::{Args, ConfigAction, PosterizeArgs};
use crate::camera::{self, CameraSettings, FrameSource, StillSource};
use crate::canvas::Canvas;
use crate::config::{default_path as get_config_path, Config, DEFAULT_CONFIG_TOML};
use crate::controls;
use crate::live::{self, LiveOptions};
use crate::poster::FrameProcessor;
use crate::processing_loop::ProcessingLoop;
use crate::settings::{ControlEvent, ProcessingSettings, Session};

/// Load the config file.
///
/// An explicit `--config` path must exist; the default path falls back to
/// built-in defaults when missing.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
    }
    Config::load(path).map_err(|e| e.to_string())
}

/// Merge settings: CLI args > config file > built-in defaults.
pub fn resolve_settings(args: &PosterizeArgs, config: &Config) -> ProcessingSettings {
    let mut settings = config.processing_settings();
    if let Some(steps) = args.steps {
        settings.set_steps(steps as usize);
    }
    if let Some(size) = args.pixel_size {
        settings.set_pixel_size(size);
    }
    if let Some(contrast) = args.contrast {
        settings.set_contrast(contrast);
    }
    if let Some(fps) = args.fps {
        settings.set_target_fps(fps);
    }
    if let Some(flash) = args.flash {
        settings.set_color_flash(flash);
    }
    settings
}

/// Random source for flash and randomize: seeded when `--seed` is given.
pub fn make_rng(args: &PosterizeArgs) -> StdRng {
    match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Build the session: settings, then the config palette, then CLI colors.
pub fn build_session(
    args: &PosterizeArgs,
    config: &Config,
    rng: &mut StdRng,
) -> Result<Session, String> {
    let settings = resolve_settings(args, config);
    let mut session = Session::new(settings).map_err(|e| e.to_string())?;

    let mut events = config.palette.events().map_err(|e| e.to_string())?;
    if args.randomize {
        events.push(ControlEvent::RandomizeSteps);
    }
    for (index, hex) in args.palette.iter().enumerate() {
        events.push(ControlEvent::SetStepColor {
            index,
            hex: hex.trim().to_string(),
        });
    }

    for event in events {
        session
            .apply(event, rng)
            .map_err(|e| format!("Invalid palette: {}", e))?;
    }

    log::debug!("Step colors: {}", session.steps().colors_hex().join(" "));
    Ok(session)
}

/// Run the live view until Ctrl+C (or `--frames`).
pub fn run_live(args: &Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let mut rng = make_rng(&args.posterize);
    let mut session = build_session(&args.posterize, &config, &mut rng)?;

    let source = open_source(args, &config, &session)?;

    live::setup_ctrlc_handler().map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;

    let options = LiveOptions {
        max_frames: args.live.frames,
        snapshot_dir: args.live.snapshot_dir.clone(),
        ..LiveOptions::default()
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    let mut commands = controls::spawn_stdin_listener();
    println!("{}", controls::HELP);

    let mut processing = ProcessingLoop::new(source, rng);
    let report = rt
        .block_on(live::run(
            &mut processing,
            &mut session,
            &mut commands,
            &options,
            live::ctrlc_flag(),
        ))
        .map_err(|e| e.to_string())?;

    println!(
        "Rendered {} frames (last: {} fps, {}ms per frame)",
        report.frames_rendered, report.stats.fps, report.stats.avg_processing_ms
    );
    for path in &report.snapshots {
        println!("Saved: {}", path.display());
    }
    if let Some(path) = report.snapshot {
        println!("Snapshot: {}", path.display());
    }
    Ok(())
}

/// Pick the frame source: a still image with `--input`, otherwise a camera.
fn open_source(
    args: &Args,
    config: &Config,
    session: &Session,
) -> Result<Box<dyn FrameSource>, String> {
    if let Some(input) = &args.live.input {
        let still = StillSource::open(input).map_err(|e| e.to_string())?;
        return Ok(Box::new(still));
    }

    let resolution = match args.live.resolution {
        Some(preset) => preset.into(),
        None => config.resolution().map_err(|e| e.to_string())?,
    };
    let settings = CameraSettings {
        device_index: args.live.camera.unwrap_or(config.camera.device),
        resolution,
        fps: session.settings().target_fps(),
        mirror: config.camera.mirror && !args.live.no_mirror,
    };
    open_camera(settings)
}

#[cfg(feature = "camera")]
fn open_camera(settings: CameraSettings) -> Result<Box<dyn FrameSource>, String> {
    let capture = camera::CameraCapture::open(settings).map_err(|e| e.to_string())?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "camera"))]
fn open_camera(settings: CameraSettings) -> Result<Box<dyn FrameSource>, String> {
    log::debug!("Camera {} requested without camera support", settings.device_index);
    Err(format!(
        "{}\nUse --input <IMAGE> to posterize a still image instead.",
        camera::CameraError::Unsupported
    ))
}

/// Posterize one image file and write the result as a PNG.
pub fn run_render(args: &Args, input: &Path, output: &Path) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let mut rng = make_rng(&args.posterize);
    let session = build_session(&args.posterize, &config, &mut rng)?;

    let mut source = StillSource::open(input).map_err(|e| e.to_string())?;
    source.start().map_err(|e| e.to_string())?;
    let frame = source
        .current_frame()
        .ok_or_else(|| format!("No frame decoded from {}", input.display()))?;

    let mut processor = FrameProcessor::new(rng);
    let mut canvas = Canvas::new();
    let summary = processor.render(&frame, session.settings(), session.steps(), &mut canvas);
    log::info!(
        "Rendered {}x{} from {}x{} source ({} blocks)",
        summary.width,
        summary.height,
        frame.width,
        frame.height,
        summary.blocks
    );

    canvas.export_png(output).map_err(|e| e.to_string())?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// List available cameras and print them to stdout.
pub fn list_cameras() {
    match camera::list_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No cameras found.");
                println!();
                println!("Make sure your camera is connected and permissions are granted.");
                println!(
                    "On macOS, grant access in System Settings > Privacy & Security > Camera."
                );
            } else {
                println!("Available cameras:");
                for device in devices {
                    println!("  {}", device);
                }
                println!();
                println!("Use --camera <index> to select a camera.");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> Result<(), String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&config_path)).map_err(|e| e.to_string())?;
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'live-posterizer config show' to view current settings.",
                    config_path.display()
                ));
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            std::fs::write(&config_path, DEFAULT_CONFIG_TOML)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["live-posterizer"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.posterize.steps = 8;
        config.posterize.pixel_size = 4;
        config.effects.color_flash = 20;

        let args = parse(&["--steps", "3"]);
        let settings = resolve_settings(&args.posterize, &config);
        assert_eq!(settings.steps(), 3);
        assert_eq!(settings.pixel_size(), 4);
        assert_eq!(settings.color_flash(), 20);
    }

    #[test]
    fn test_large_step_count_passes_through() {
        let args = parse(&["--steps", "300", "--fps", "500"]);
        let settings = resolve_settings(&args.posterize, &Config::default());
        assert_eq!(settings.steps(), 300);
        assert_eq!(settings.target_fps(), 500);
    }

    #[test]
    fn test_build_session_applies_cli_palette() {
        let args = parse(&["--steps", "2", "--palette", "#FF0000, #00ff00"]);
        let mut rng = make_rng(&args.posterize);
        let session = build_session(&args.posterize, &Config::default(), &mut rng).unwrap();
        assert_eq!(session.steps().colors_hex(), vec!["#ff0000", "#00ff00"]);
    }

    #[test]
    fn test_build_session_rejects_extra_colors() {
        let args = parse(&["--steps", "2", "--palette", "#000000,#111111,#222222"]);
        let mut rng = make_rng(&args.posterize);
        let err = build_session(&args.posterize, &Config::default(), &mut rng).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_build_session_rejects_bad_hex() {
        let args = parse(&["--palette", "#zzzzzz"]);
        let mut rng = make_rng(&args.posterize);
        assert!(build_session(&args.posterize, &Config::default(), &mut rng).is_err());
    }

    #[test]
    fn test_seeded_randomize_is_reproducible() {
        let args = parse(&["--randomize", "--seed", "42"]);
        let first = build_session(&args.posterize, &Config::default(), &mut make_rng(&args.posterize))
            .unwrap()
            .steps()
            .colors_hex();
        let second = build_session(&args.posterize, &Config::default(), &mut make_rng(&args.posterize))
            .unwrap()
            .steps()
            .colors_hex();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let err = load_config(Some(Path::new("/no/such/config.toml"))).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_config_init_then_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        handle_config_action(ConfigAction::Init, Some(path.as_path())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TOML);

        let err = handle_config_action(ConfigAction::Init, Some(path.as_path())).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        image::RgbaImage::from_pixel(20, 12, image::Rgba([128, 128, 128, 255]))
            .save(&input)
            .unwrap();

        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let args = parse(&["--seed", "1", "--config", config.to_str().unwrap()]);
        run_render(&args, &input, &output).unwrap();

        let rendered = image::open(&output).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (16, 8));
        assert!(rendered.pixels().all(|p| p.0 == [170, 170, 170, 255]));
    }
}

//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::ResolutionPreset;

/// Parse and validate a color flash percentage (0-100)
fn parse_flash(s: &str) -> Result<u8, String> {
    let amount: u8 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid percentage", s))?;
    if amount > 100 {
        return Err(format!("Color flash must be between 0 and 100, got {}", amount));
    }
    Ok(amount)
}

/// Parse and validate contrast (>= 0)
fn parse_contrast(s: &str) -> Result<f32, String> {
    let contrast: f32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !contrast.is_finite() || contrast < 0.0 {
        return Err(format!("Contrast must be a non-negative number, got {}", s));
    }
    Ok(contrast)
}

/// Live webcam posterizer: quantizes camera brightness into a few colored steps
#[derive(Parser, Debug)]
#[command(name = "live-posterizer")]
#[command(version, about = "Live webcam posterizer", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Posterize the default camera with 5 steps
    live-posterizer --steps 5

    # Custom palette, chunky blocks, a little flicker
    live-posterizer --palette '#1b1b3a,#693668,#a74482,#f84aa7' --pixel-size 16 --flash 5

    # Posterize a still image to a PNG
    live-posterizer render --input photo.jpg --output poster.png")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub posterize: PosterizeArgs,

    #[command(flatten)]
    pub live: LiveArgs,
}

/// Options shared by every command that renders.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct PosterizeArgs {
    /// Number of brightness steps (at least 2)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(2..))]
    pub steps: Option<u32>,

    /// Block edge length in source pixels
    #[arg(long, short = 'p', global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub pixel_size: Option<u32>,

    /// Contrast around mid-gray (1.0 = neutral)
    #[arg(long, global = true, value_parser = parse_contrast)]
    pub contrast: Option<f32>,

    /// Frames processed per second
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Percent chance per block per frame of a random step (0-100)
    #[arg(long, global = true, value_parser = parse_flash)]
    pub flash: Option<u8>,

    /// Comma-separated step colors, darkest first (e.g. '#000000,#ff8800')
    #[arg(long, global = true, value_delimiter = ',')]
    pub palette: Vec<String>,

    /// Start with random vivid step colors
    #[arg(long, global = true)]
    pub randomize: bool,

    /// Seed for the flash and randomize effects
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

/// Options for the live camera view (the default command).
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct LiveArgs {
    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Capture resolution
    #[arg(long, short)]
    pub resolution: Option<ResolutionPreset>,

    /// Don't mirror the camera horizontally
    #[arg(long)]
    pub no_mirror: bool,

    /// Serve this image as every frame instead of opening a camera
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Save the last frame as a PNG in this directory on exit
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Stop after rendering this many frames
    #[arg(long)]
    pub frames: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Posterize a single image file
    Render {
        /// Image to read
        #[arg(long, short)]
        input: PathBuf,
        /// PNG to write
        #[arg(long, short)]
        output: PathBuf,
    },
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["live-posterizer"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
        assert!(args.posterize.steps.is_none());
        assert!(args.posterize.pixel_size.is_none());
        assert!(args.posterize.palette.is_empty());
        assert!(!args.posterize.randomize);
        assert!(args.live.camera.is_none());
        assert!(args.live.resolution.is_none());
        assert!(!args.live.no_mirror);
        assert!(args.live.input.is_none());
    }

    #[test]
    fn test_args_posterize_flags() {
        let args = Args::parse_from([
            "live-posterizer",
            "--steps",
            "6",
            "-p",
            "12",
            "--contrast",
            "1.5",
            "--fps",
            "24",
            "--flash",
            "10",
            "--seed",
            "7",
        ]);
        assert_eq!(args.posterize.steps, Some(6));
        assert_eq!(args.posterize.pixel_size, Some(12));
        assert_eq!(args.posterize.contrast, Some(1.5));
        assert_eq!(args.posterize.fps, Some(24));
        assert_eq!(args.posterize.flash, Some(10));
        assert_eq!(args.posterize.seed, Some(7));
    }

    #[test]
    fn test_args_palette_is_comma_separated() {
        let args = Args::parse_from(["live-posterizer", "--palette", "#000000,#ffffff"]);
        assert_eq!(args.posterize.palette, vec!["#000000", "#ffffff"]);
    }

    #[test]
    fn test_args_rejects_single_step() {
        assert!(Args::try_parse_from(["live-posterizer", "--steps", "1"]).is_err());
    }

    #[test]
    fn test_args_rejects_zero_pixel_size() {
        assert!(Args::try_parse_from(["live-posterizer", "--pixel-size", "0"]).is_err());
    }

    #[test]
    fn test_args_rejects_flash_over_100() {
        assert!(Args::try_parse_from(["live-posterizer", "--flash", "101"]).is_err());
    }

    #[test]
    fn test_args_rejects_negative_contrast() {
        assert!(Args::try_parse_from(["live-posterizer", "--contrast=-1"]).is_err());
    }

    #[test]
    fn test_args_resolution_preset() {
        let args = Args::parse_from(["live-posterizer", "--resolution", "high"]);
        assert_eq!(args.live.resolution, Some(ResolutionPreset::High));
    }

    #[test]
    fn test_render_subcommand_accepts_global_flags() {
        let args = Args::parse_from([
            "live-posterizer",
            "render",
            "-i",
            "in.png",
            "-o",
            "out.png",
            "--steps",
            "3",
        ]);
        assert_eq!(args.posterize.steps, Some(3));
        match args.command {
            Some(Command::Render { input, output }) => {
                assert_eq!(input, PathBuf::from("in.png"));
                assert_eq!(output, PathBuf::from("out.png"));
            }
            other => panic!("Expected Render, got {:?}", other),
        }
    }

    #[test]
    fn test_config_subcommand() {
        let args = Args::parse_from(["live-posterizer", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }

    #[test]
    fn test_list_cameras_subcommand() {
        let args = Args::parse_from(["live-posterizer", "list-cameras"]);
        assert!(matches!(args.command, Some(Command::ListCameras)));
    }
}

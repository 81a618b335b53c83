//! Runtime controls for the live view.
//!
//! Lines typed on stdin while `live` runs are parsed into [`LiveCommand`]s
//! and sent over a channel; the live driver drains it between ticks.
//!
//! ```text
//! /steps 6            /pixel 12         /contrast 1.5
//! /fps 24             /flash 10         /color 2 #ff8800
//! /hsb 2 30 80 90     /image 1 tile.png /kind 1 color|image
//! /reset [STEP]       /randomize        /snapshot
//! ```

use std::io::{self, BufRead};
use std::path::Path;
use std::thread;

use tokio::sync::mpsc;

use crate::canvas::load_step_image;
use crate::color::Hsb;
use crate::poster::steps::AppearanceKind;
use crate::settings::ControlEvent;

/// Commands queued before the driver falls behind and the reader blocks.
pub const COMMAND_QUEUE_DEPTH: usize = 32;

pub const HELP: &str = "Commands: /steps N, /pixel N, /contrast X, /fps N, /flash 0-100, \
/color STEP #rrggbb, /hsb STEP H S B, /image STEP PATH, /kind STEP color|image, \
/reset [STEP], /randomize, /snapshot, /help";

/// Something the live driver does between two ticks.
#[derive(Debug, Clone)]
pub enum LiveCommand {
    /// Change settings or step appearances.
    Control(ControlEvent),
    /// Export the current canvas now.
    Snapshot,
}

impl From<ControlEvent> for LiveCommand {
    fn from(event: ControlEvent) -> Self {
        LiveCommand::Control(event)
    }
}

/// Parse one input line.
///
/// Blank lines give `Ok(None)`. Anything unparsable is an error message
/// meant for the user.
pub fn parse_command(input: &str) -> Result<Option<LiveCommand>, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return Ok(None);
    };
    let args = &parts[1..];

    let event = match name.to_lowercase().as_str() {
        "/steps" => ControlEvent::SetSteps(number(args, 0, "steps")?),
        "/pixel" => ControlEvent::SetPixelSize(number(args, 0, "pixel size")?),
        "/contrast" => ControlEvent::SetContrast(number(args, 0, "contrast")?),
        "/fps" => ControlEvent::SetTargetFps(number(args, 0, "fps")?),
        "/flash" => ControlEvent::SetColorFlash(number(args, 0, "flash")?),
        "/color" => ControlEvent::SetStepColor {
            index: number(args, 0, "step")?,
            hex: arg(args, 1, "color")?.to_string(),
        },
        "/hsb" => ControlEvent::SetStepHsb {
            index: number(args, 0, "step")?,
            hsb: Hsb::new(
                number::<u16>(args, 1, "hue")? % 360,
                number::<u8>(args, 2, "saturation")?.min(100),
                number::<u8>(args, 3, "brightness")?.min(100),
            ),
        },
        "/image" => {
            let path = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            if path.is_empty() {
                return Err("Missing image path".to_string());
            }
            let image = load_step_image(Path::new(&path)).map_err(|e| e.to_string())?;
            ControlEvent::SetStepImage {
                index: number(args, 0, "step")?,
                image,
            }
        }
        "/kind" => ControlEvent::SetStepKind {
            index: number(args, 0, "step")?,
            kind: match arg(args, 1, "kind")?.to_lowercase().as_str() {
                "color" => AppearanceKind::Color,
                "image" => AppearanceKind::Image,
                other => return Err(format!("Unknown kind '{}', expected color or image", other)),
            },
        },
        "/reset" => match args.first() {
            Some(_) => ControlEvent::ResetStep(number(args, 0, "step")?),
            None => ControlEvent::ResetAllSteps,
        },
        "/randomize" => ControlEvent::RandomizeSteps,
        "/snapshot" => return Ok(Some(LiveCommand::Snapshot)),
        "/help" => return Err(HELP.to_string()),
        other => return Err(format!("Unknown command: {}\n{}", other, HELP)),
    };
    Ok(Some(event.into()))
}

fn arg<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    args.get(index)
        .copied()
        .ok_or_else(|| format!("Missing {}", what))
}

fn number<T: std::str::FromStr>(args: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = arg(args, index, what)?;
    raw.parse()
        .map_err(|_| format!("Invalid {}: '{}'", what, raw))
}

/// Read commands from stdin on a background thread.
///
/// The thread ends at EOF or once the receiver is dropped.
pub fn spawn_stdin_listener() -> mpsc::Receiver<LiveCommand> {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => println!("{}", message),
            }
        }
        log::debug!("Control input closed");
    });

    rx
}

//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, LiveArgs, PosterizeArgs};
pub use commands::{
    build_session, handle_config_action, list_cameras, load_config, make_rng, resolve_settings,
    run_live, run_render,
};
pub use enums::ResolutionPreset;

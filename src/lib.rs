//! live-posterizer library crate.
//!
//! Camera frames are split into blocks, each block's brightness is
//! quantized into one of a few steps, and each step is painted with a
//! user-chosen color or image.

pub mod camera;
pub mod canvas;
pub mod cli;
pub mod color;
pub mod config;
pub mod controls;
pub mod live;
pub mod poster;
pub mod processing_loop;
pub mod settings;

//! Cutlist Core - Foundation types for the timeline engine
//!
//! This crate provides the fundamental types used throughout Cutlist:
//! - Time representation and frame quantisation (RationalTime, FrameRate)
//! - The shared error taxonomy
//! - Track settings and logging bootstrap

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::TrackSettings;
pub use error::{CutlistError, Result};
pub use time::{format_speed, frame_at, FrameRate, RationalTime};

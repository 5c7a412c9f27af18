//! Frame acquisition
//!
//! The loop only talks to a [`FrameSource`]. [`CommandCamera`] is the
//! production source: it shells out to a still-capture program per frame.

pub mod command;

pub use command::CommandCamera;

use crate::errors::SkywatchError;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Sortable, millisecond-resolution local timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Something that can produce still frames on request
pub trait FrameSource {
    /// Capture one still named `filename` into the output directory.
    ///
    /// `Ok(None)` means the camera produced nothing this time; the caller
    /// treats it as a skipped iteration, not an error.
    fn capture(&mut self, filename: &str) -> Result<Option<PathBuf>, SkywatchError>;

    /// Timestamp used to name the next frame
    fn timestamp(&self) -> String {
        format_timestamp(&Local::now())
    }

    /// Create the output directory if needed
    fn ensure_dirs(&self) -> Result<(), SkywatchError>;
}

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `auto_<timestamp>.jpg`
pub fn frame_filename(timestamp: &str) -> String {
    format!("auto_{}.jpg", timestamp)
}

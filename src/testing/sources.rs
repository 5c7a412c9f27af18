//! Scripted frame source for driving the loop without hardware

use super::synthetic_data::write_jpeg;
use crate::capture::FrameSource;
use crate::errors::SkywatchError;
use image::RgbImage;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// What the scripted camera does on one request
#[derive(Debug, Clone)]
pub enum Shot {
    /// Write this image as a quality-100 JPEG
    Image(RgbImage),
    /// Write these raw bytes, e.g. a truncated or corrupt file
    Bytes(Vec<u8>),
    /// Produce nothing, like a camera that timed out
    Nothing,
}

/// Replays a fixed list of shots, then produces nothing.
#[derive(Debug)]
pub struct ScriptedSource {
    output_directory: PathBuf,
    shots: VecDeque<Shot>,
    captured: Vec<String>,
    requests: u64,
}

impl ScriptedSource {
    pub fn new<P: AsRef<Path>>(output_directory: P, shots: Vec<Shot>) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            shots: shots.into(),
            captured: Vec::new(),
            requests: 0,
        }
    }

    /// Filenames written so far, in order
    pub fn captured(&self) -> &[String] {
        &self.captured
    }

    pub fn remaining(&self) -> usize {
        self.shots.len()
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self, filename: &str) -> Result<Option<PathBuf>, SkywatchError> {
        self.requests += 1;
        let destination = self.output_directory.join(filename);
        match self.shots.pop_front().unwrap_or(Shot::Nothing) {
            Shot::Image(image) => write_jpeg(&image, &destination)
                .map_err(|e| SkywatchError::Capture(e.to_string()))?,
            Shot::Bytes(bytes) => fs::write(&destination, bytes)?,
            Shot::Nothing => return Ok(None),
        }
        self.captured.push(filename.to_string());
        Ok(Some(destination))
    }

    /// Counter-based, so consecutive frames never collide within a test
    fn timestamp(&self) -> String {
        format!("20240101_000000_{:03}", self.requests)
    }

    fn ensure_dirs(&self) -> Result<(), SkywatchError> {
        fs::create_dir_all(&self.output_directory)?;
        Ok(())
    }
}

use super::FrameSource;
use crate::config::CaptureConfig;
use crate::errors::SkywatchError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Placeholder in the argument list replaced by the destination path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external still-capture program once per frame
/// (`libcamera-still` by default).
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    output_directory: PathBuf,
    timeout: Duration,
}

impl From<&CaptureConfig> for CommandCamera {
    fn from(config: &CaptureConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            &config.output_directory,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl CommandCamera {
    pub fn new<P: AsRef<Path>>(
        program: impl Into<String>,
        args: Vec<String>,
        output_directory: P,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output_directory: output_directory.as_ref().to_path_buf(),
            timeout,
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    fn command_for(&self, destination: &Path) -> Command {
        let destination = destination.to_string_lossy();
        let mut command = Command::new(&self.program);
        command
            .args(
                self.args
                    .iter()
                    .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &destination)),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    /// Run the program to completion or until the timeout, whichever comes
    /// first. Returns whether it exited successfully in time.
    fn run_bounded(&self, destination: &Path) -> Result<bool, SkywatchError> {
        let mut child = self.command_for(destination).spawn().map_err(|e| {
            SkywatchError::Capture(format!("Failed to start {}: {}", self.program, e))
        })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    log::info!("{} exited with {}", self.program, status);
                }
                return Ok(status.success());
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "{} did not finish within {:?}, killing it",
                    self.program,
                    self.timeout
                );
                // The child may exit between try_wait and kill
                let _ = child.kill();
                child.wait()?;
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl FrameSource for CommandCamera {
    fn capture(&mut self, filename: &str) -> Result<Option<PathBuf>, SkywatchError> {
        let destination = self.output_directory.join(filename);
        let succeeded = self.run_bounded(&destination)?;

        let written = fs::metadata(&destination)
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);

        if succeeded && written {
            return Ok(Some(destination));
        }
        if destination.exists() {
            fs::remove_file(&destination)?;
        }
        Ok(None)
    }

    fn ensure_dirs(&self) -> Result<(), SkywatchError> {
        fs::create_dir_all(&self.output_directory)?;
        Ok(())
    }
}

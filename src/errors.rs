use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SkywatchError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Capture error: {0}")]
    Capture(String),
    #[error("Unreadable input {}: {reason}", path.display())]
    UnreadableInput { path: PathBuf, reason: String },
    #[error("Model error: {0}")]
    Model(String),
    #[error("Metadata store error: {0}")]
    Metadata(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkywatchError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SkywatchError::UnreadableInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

//! Skywatch: unattended sky camera with on-device triage and classification
//!
//! Periodically captures a still, throws away frames that are too dark or
//! too blurry to be useful, crops the rest to their dominant bright region,
//! labels them with a small image classifier and records the result in a
//! JSON metadata file next to the kept images.
//!
//! # Pipeline
//! - [`capture`]: frame sources, including a still-capture command adapter
//! - [`quality`]: darkness and blur gate
//! - [`crop`]: Otsu + contour based region selection
//! - [`inference`]: multi-class labeler and binary predictors on ONNX models
//! - [`metadata`]: filename → classification record store
//! - [`pipeline`]: the loop that ties them together
//!
//! # Usage
//! ```rust,no_run
//! use skywatch::{Processor, SkywatchConfig};
//! use std::sync::atomic::AtomicBool;
//!
//! skywatch::init_logging();
//! let config = SkywatchConfig::load_or_default();
//! let mut processor = Processor::from_config(&config)?;
//! processor.run(&AtomicBool::new(false))?;
//! # Ok::<(), skywatch::SkywatchError>(())
//! ```
pub mod capture;
pub mod config;
pub mod crop;
pub mod errors;
pub mod frame;
pub mod inference;
pub mod metadata;
pub mod pipeline;
pub mod quality;

// Testing utilities - synthetic frames and stand-in models for offline testing
pub mod testing;

// Re-exports for convenience
pub use capture::{frame_filename, CommandCamera, FrameSource};
pub use config::SkywatchConfig;
pub use crop::{auto_crop, BoundingBox, RegionSelector};
pub use errors::SkywatchError;
pub use frame::Frame;
pub use inference::{
    BinaryPredictor, FrameClassification, InferenceEngine, Labeler, ModelHandle, TractModel,
};
pub use metadata::{ClassificationRecord, Metadata, MetadataStore};
pub use pipeline::{FrameOutcome, LoopStats, Processor};
pub use quality::{is_blurry, is_dark, QualityFilter, QualityVerdict};

/// Initialize logging for the capture loop
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "skywatch=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

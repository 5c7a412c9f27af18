//! Testing utilities for Skywatch
//!
//! Synthetic frames with known statistics, so quality, crop and pipeline
//! behaviour can be exercised offline without a camera attached, plus
//! model handles, in-memory ONNX graphs and a frame source that stand in
//! for real hardware.

pub mod models;
pub mod onnx;
pub mod sources;
pub mod synthetic_data;

pub use models::{FailingModel, FixedScoresModel, MeanLevelModel};
pub use onnx::{channel_mean_graph, GraphDim};
pub use sources::{ScriptedSource, Shot};
pub use synthetic_data::{
    bright_rect_frame, checkerboard_frame, smoothed_frame, star_field_frame, uniform_frame,
    write_jpeg,
};

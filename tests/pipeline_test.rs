//! End-to-end tests of the capture loop
//!
//! A scripted frame source feeds synthetic frames through the real quality
//! gate, region selector and metadata store; models are stand-ins.

use skywatch::config::SkywatchConfig;
use skywatch::inference::{
    BinaryPredictor, ChannelOrder, InferenceEngine, InputShape, Labeler, Normalization,
    TensorLayout, DEFAULT_DECISION_BOUNDARY,
};
use skywatch::pipeline::{FrameOutcome, Processor};
use skywatch::testing::{
    checkerboard_frame, smoothed_frame, star_field_frame, uniform_frame, FailingModel,
    FixedScoresModel, ScriptedSource, Shot,
};
use skywatch::ModelHandle;
use std::path::Path;

const LABELS: [&str; 2] = ["horizon", "stars"];

fn shape() -> InputShape {
    InputShape::new(64, 64, TensorLayout::Nhwc)
}

fn labeler(model: Box<dyn ModelHandle>) -> Labeler {
    Labeler::new(
        model,
        LABELS.iter().map(|l| l.to_string()).collect(),
        Normalization::Unit,
        ChannelOrder::Rgb,
    )
    .unwrap()
}

fn stars_engine() -> InferenceEngine {
    InferenceEngine::new(
        labeler(Box::new(FixedScoresModel::new(shape(), vec![0.1, 0.9]))),
        Vec::new(),
    )
}

fn test_config(dir: &Path) -> SkywatchConfig {
    let mut config = SkywatchConfig::default();
    config.capture.output_directory = dir.to_string_lossy().into_owned();
    config.storage.persist_retry_delay_ms = 1;
    config
}

fn processor_with(
    dir: &Path,
    shots: Vec<Shot>,
    engine: InferenceEngine,
) -> Processor<ScriptedSource> {
    let config = test_config(dir);
    Processor::new(ScriptedSource::new(dir, shots), engine, &config)
}

#[test]
fn test_clean_star_frame_is_recorded_as_stars() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = processor_with(
        dir.path(),
        vec![Shot::Image(star_field_frame(160, 120))],
        stars_engine(),
    );

    let outcome = processor.process_once().unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Classified {
            label: "stars".to_string(),
            cropped: false,
            assessments: Default::default(),
        }
    );

    let filename = processor.source().captured()[0].clone();
    assert!(filename.starts_with("auto_") && filename.ends_with(".jpg"));

    let metadata = processor.store().load().unwrap();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[&filename].classification, "stars");
    assert!(dir.path().join(&filename).exists());
    assert!(dir.path().join("metadata.json").exists());
}

#[test]
fn test_rejected_frames_are_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let blurred = smoothed_frame(&checkerboard_frame(128, 128, 16), 8.0);
    let mut processor = processor_with(
        dir.path(),
        vec![
            Shot::Image(uniform_frame(128, 96, 0)),
            Shot::Image(blurred),
        ],
        stars_engine(),
    );

    assert!(matches!(
        processor.process_once().unwrap(),
        FrameOutcome::RejectedDark { .. }
    ));
    assert!(matches!(
        processor.process_once().unwrap(),
        FrameOutcome::RejectedBlurry { .. }
    ));

    for filename in processor.source().captured() {
        assert!(!dir.path().join(filename).exists(), "{} was kept", filename);
    }
    assert!(processor.store().load().unwrap().is_empty());
    assert_eq!(processor.stats().rejected(), 2);
}

#[test]
fn test_undecodable_capture_is_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = processor_with(
        dir.path(),
        vec![Shot::Bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00])],
        stars_engine(),
    );

    assert_eq!(processor.process_once().unwrap(), FrameOutcome::DecodeFailed);
    let filename = &processor.source().captured()[0];
    assert!(!dir.path().join(filename).exists());
    assert!(processor.store().load().unwrap().is_empty());
}

#[test]
fn test_inference_failure_keeps_file_without_record() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::new(labeler(Box::new(FailingModel::new(shape()))), Vec::new());
    let mut processor = processor_with(
        dir.path(),
        vec![Shot::Image(star_field_frame(160, 120))],
        engine,
    );

    let outcome = processor.process_once().unwrap();
    assert!(matches!(outcome, FrameOutcome::InferenceFailed { .. }));

    let filename = &processor.source().captured()[0];
    assert!(dir.path().join(filename).exists());
    assert!(processor.store().load().unwrap().is_empty());
}

#[test]
fn test_loop_survives_mixed_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = processor_with(
        dir.path(),
        vec![
            Shot::Nothing,
            Shot::Bytes(b"not a jpeg".to_vec()),
            Shot::Image(uniform_frame(64, 64, 3)),
            Shot::Image(star_field_frame(160, 120)),
            Shot::Image(star_field_frame(96, 96)),
        ],
        stars_engine(),
    );

    let outcomes: Vec<_> = (0..5).map(|_| processor.process_once().unwrap()).collect();
    assert_eq!(outcomes[0], FrameOutcome::NoFrame);
    assert_eq!(outcomes[1], FrameOutcome::DecodeFailed);
    assert!(matches!(outcomes[2], FrameOutcome::RejectedDark { .. }));
    assert_eq!(outcomes[3].label(), Some("stars"));
    assert_eq!(outcomes[4].label(), Some("stars"));

    let metadata = processor.store().load().unwrap();
    assert_eq!(metadata.len(), 2);
    assert_eq!(processor.stats().iterations, 5);
    assert_eq!(processor.stats().classified, 2);
}

#[test]
fn test_predictor_verdicts_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = |name: &str, score: f32| {
        BinaryPredictor::new(
            name,
            Box::new(FixedScoresModel::new(
                InputShape::new(224, 224, TensorLayout::Nhwc),
                vec![score],
            )),
            Normalization::Symmetric,
            ChannelOrder::Rgb,
            DEFAULT_DECISION_BOUNDARY,
        )
        .unwrap()
    };
    let engine = InferenceEngine::new(
        labeler(Box::new(FixedScoresModel::new(shape(), vec![0.1, 0.9]))),
        vec![predictor("stars", 0.97), predictor("horizon", 0.02)],
    );
    let mut processor = processor_with(
        dir.path(),
        vec![Shot::Image(star_field_frame(160, 120))],
        engine,
    );

    processor.process_once().unwrap();
    let filename = &processor.source().captured()[0];
    let record = &processor.store().load().unwrap()[filename];
    assert_eq!(record.assessments.get("stars"), Some(&true));
    assert_eq!(record.assessments.get("horizon"), Some(&false));
}

#[test]
fn test_existing_metadata_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = processor_with(
        dir.path(),
        vec![Shot::Image(star_field_frame(160, 120))],
        stars_engine(),
    );
    first.process_once().unwrap();

    let horizon_engine = InferenceEngine::new(
        labeler(Box::new(FixedScoresModel::new(shape(), vec![0.8, 0.2]))),
        Vec::new(),
    );
    let mut second = Processor::new(
        ScriptedSource::new(dir.path(), vec![
            Shot::Nothing,
            Shot::Image(star_field_frame(96, 96)),
        ]),
        horizon_engine,
        &test_config(dir.path()),
    );
    second.process_once().unwrap();
    second.process_once().unwrap();

    let metadata = second.store().load().unwrap();
    let labels: Vec<_> = metadata.values().map(|r| r.classification.as_str()).collect();
    assert_eq!(labels, vec!["stars", "horizon"]);
}

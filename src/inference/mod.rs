//! Inference engine
//!
//! Model handles are loaded once, owned by the component that uses them and
//! never mutated afterwards. Two kinds of consumer sit on top:
//! - [`Labeler`]: multi-class, input size read from the model, argmax over
//!   an ordered label list
//! - [`BinaryPredictor`]: single sigmoid output against a 0.5 boundary

pub mod binary;
pub mod labeler;
pub mod preprocess;
pub mod tract;

pub use binary::{BinaryPrediction, BinaryPredictor, DEFAULT_DECISION_BOUNDARY};
pub use labeler::{argmax, Classification, Labeler};
pub use preprocess::{ChannelOrder, InputShape, Normalization, Preprocessing, TensorLayout};
pub use self::tract::TractModel;

use crate::config::{LabelerConfig, ModelsConfig, PredictorConfig};
use crate::errors::SkywatchError;
use crate::frame::decode_image;
use ::tract_onnx::prelude::tract_ndarray::Array4;
use image::RgbImage;
use std::collections::BTreeMap;
use std::path::Path;

/// An immutable, pre-loaded model.
///
/// Implementations must be safe to call from any thread; a single handle is
/// shared by every call for the lifetime of the process.
pub trait ModelHandle: Send + Sync {
    /// Fixed input geometry, if the model declares one
    fn input_shape(&self) -> Option<InputShape>;

    /// Run one batch-1 input and return the flattened output tensor.
    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>, SkywatchError>;
}

/// Everything the engine concluded about one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameClassification {
    pub label: String,
    pub score: f32,
    /// Binary predictor verdicts keyed by predictor name
    pub assessments: BTreeMap<String, bool>,
}

/// Labeler plus any number of binary predictors
pub struct InferenceEngine {
    labeler: Labeler,
    predictors: Vec<BinaryPredictor>,
}

impl InferenceEngine {
    pub fn new(labeler: Labeler, predictors: Vec<BinaryPredictor>) -> Self {
        Self {
            labeler,
            predictors,
        }
    }

    /// Load every configured model from disk.
    pub fn from_config(config: &ModelsConfig) -> Result<Self, SkywatchError> {
        let labeler = load_labeler(&config.labeler)?;
        let predictors = config
            .predictors
            .iter()
            .map(load_predictor)
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Inference engine ready: labels {:?}, {} binary predictor(s)",
            labeler.labels(),
            predictors.len()
        );
        Ok(Self::new(labeler, predictors))
    }

    pub fn labeler(&self) -> &Labeler {
        &self.labeler
    }

    pub fn predictors(&self) -> &[BinaryPredictor] {
        &self.predictors
    }

    pub fn classify_image(&self, image: &RgbImage) -> Result<FrameClassification, SkywatchError> {
        let classification = self.labeler.classify(image)?;

        let mut assessments = BTreeMap::new();
        for predictor in &self.predictors {
            let prediction = predictor.predict(image)?;
            log::debug!(
                "Predictor {}: score {:.3} -> {}",
                predictor.name(),
                prediction.score,
                prediction.positive
            );
            assessments.insert(predictor.name().to_string(), prediction.positive);
        }

        Ok(FrameClassification {
            label: classification.label,
            score: classification.score,
            assessments,
        })
    }

    /// Decode and classify a file; undecodable input fails with `UnreadableInput`.
    pub fn classify_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<FrameClassification, SkywatchError> {
        let image = decode_image(path.as_ref())?;
        self.classify_image(&image)
    }
}

fn load_labeler(config: &LabelerConfig) -> Result<Labeler, SkywatchError> {
    let model = TractModel::load(&config.path, config.layout, None)?;
    Labeler::new(
        Box::new(model),
        config.labels.clone(),
        config.normalization,
        config.channel_order,
    )
}

fn load_predictor(config: &PredictorConfig) -> Result<BinaryPredictor, SkywatchError> {
    let [width, height] = config.input_size;
    let model = TractModel::load(&config.path, config.layout, Some((width, height)))?;
    BinaryPredictor::new(
        config.name.clone(),
        Box::new(model),
        config.normalization,
        config.channel_order,
        config.decision_boundary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{star_field_frame, FixedScoresModel, MeanLevelModel};

    fn shape() -> InputShape {
        InputShape::new(48, 48, TensorLayout::Nhwc)
    }

    #[test]
    fn test_engine_collects_assessments() {
        let labeler = Labeler::new(
            Box::new(FixedScoresModel::new(shape(), vec![0.3, 0.7])),
            vec!["horizon".to_string(), "stars".to_string()],
            Normalization::Unit,
            ChannelOrder::Rgb,
        )
        .unwrap();
        let stars = BinaryPredictor::new(
            "stars",
            Box::new(FixedScoresModel::new(shape(), vec![0.8])),
            Normalization::Symmetric,
            ChannelOrder::Rgb,
            DEFAULT_DECISION_BOUNDARY,
        )
        .unwrap();
        let horizon = BinaryPredictor::new(
            "horizon",
            Box::new(FixedScoresModel::new(shape(), vec![0.1])),
            Normalization::Symmetric,
            ChannelOrder::Rgb,
            DEFAULT_DECISION_BOUNDARY,
        )
        .unwrap();

        let engine = InferenceEngine::new(labeler, vec![stars, horizon]);
        let result = engine.classify_image(&star_field_frame(64, 64)).unwrap();
        assert_eq!(result.label, "stars");
        assert_eq!(result.assessments.get("stars"), Some(&true));
        assert_eq!(result.assessments.get("horizon"), Some(&false));
    }

    #[test]
    fn test_label_stable_across_repeated_calls() {
        let labeler = Labeler::new(
            Box::new(MeanLevelModel::new(shape())),
            vec!["horizon".to_string(), "stars".to_string()],
            Normalization::Unit,
            ChannelOrder::Rgb,
        )
        .unwrap();
        let engine = InferenceEngine::new(labeler, Vec::new());
        let frame = star_field_frame(96, 64);
        let first = engine.classify_image(&frame).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.classify_image(&frame).unwrap(), first);
        }
    }

    #[test]
    fn test_missing_model_file() {
        let config = LabelerConfig {
            path: "/nonexistent/classifier.onnx".to_string(),
            labels: vec!["horizon".to_string(), "stars".to_string()],
            normalization: Normalization::Unit,
            channel_order: ChannelOrder::Rgb,
            layout: TensorLayout::Nhwc,
        };
        let err = load_labeler(&config).err().unwrap();
        assert!(err.to_string().contains("Model not found"));
    }
}

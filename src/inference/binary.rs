use super::preprocess::{ChannelOrder, Normalization, Preprocessing};
use super::ModelHandle;
use crate::errors::SkywatchError;
use image::RgbImage;

pub const DEFAULT_DECISION_BOUNDARY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryPrediction {
    pub score: f32,
    pub positive: bool,
}

/// Yes/no model with a single sigmoid output, e.g. "are the stars well exposed?"
pub struct BinaryPredictor {
    name: String,
    model: Box<dyn ModelHandle>,
    preprocessing: Preprocessing,
    decision_boundary: f32,
}

impl BinaryPredictor {
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn ModelHandle>,
        normalization: Normalization,
        channel_order: ChannelOrder,
        decision_boundary: f32,
    ) -> Result<Self, SkywatchError> {
        let name = name.into();
        let shape = model.input_shape().ok_or_else(|| {
            SkywatchError::Model(format!("Predictor {} has no fixed input shape", name))
        })?;

        Ok(Self {
            name,
            model,
            preprocessing: Preprocessing {
                shape,
                normalization,
                channel_order,
            },
            decision_boundary,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positive when the score reaches the decision boundary (`>=`).
    pub fn predict(&self, image: &RgbImage) -> Result<BinaryPrediction, SkywatchError> {
        let input = self.preprocessing.to_tensor(image);
        let scores = self.model.run(input)?;

        let [score] = scores[..] else {
            return Err(SkywatchError::Model(format!(
                "Predictor {} returned {} values, expected one",
                self.name,
                scores.len()
            )));
        };

        Ok(BinaryPrediction {
            score,
            positive: score >= self.decision_boundary,
        })
    }
}

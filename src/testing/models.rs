//! Model handles that need no model file

use crate::errors::SkywatchError;
use crate::inference::{InputShape, ModelHandle};
use tract_onnx::prelude::tract_ndarray::Array4;

/// Returns the same scores for every input
#[derive(Debug, Clone)]
pub struct FixedScoresModel {
    shape: Option<InputShape>,
    scores: Vec<f32>,
}

impl FixedScoresModel {
    pub fn new(shape: InputShape, scores: Vec<f32>) -> Self {
        Self {
            shape: Some(shape),
            scores,
        }
    }

    /// A model whose input geometry is dynamic
    pub fn without_shape(scores: Vec<f32>) -> Self {
        Self {
            shape: None,
            scores,
        }
    }
}

impl ModelHandle for FixedScoresModel {
    fn input_shape(&self) -> Option<InputShape> {
        self.shape
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>, SkywatchError> {
        if let Some(shape) = self.shape {
            let expected = shape.layout.dims(
                shape.height as usize,
                shape.width as usize,
                shape.channels as usize,
            );
            if input.shape() != expected {
                return Err(SkywatchError::Model(format!(
                    "input shape {:?} does not match {:?}",
                    input.shape(),
                    expected
                )));
            }
        }
        Ok(self.scores.clone())
    }
}

/// Two-class model scoring `[1 - mean, mean]` of its input tensor.
///
/// With unit normalization, bright frames label as class 1 and dark frames
/// as class 0. Output is a pure function of the pixels.
#[derive(Debug, Clone, Copy)]
pub struct MeanLevelModel {
    shape: InputShape,
}

impl MeanLevelModel {
    pub fn new(shape: InputShape) -> Self {
        Self { shape }
    }
}

impl ModelHandle for MeanLevelModel {
    fn input_shape(&self) -> Option<InputShape> {
        Some(self.shape)
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>, SkywatchError> {
        let mean = input.mean().unwrap_or(0.0);
        Ok(vec![1.0 - mean, mean])
    }
}

/// Always fails, as a corrupt or incompatible model would at run time
#[derive(Debug, Clone, Copy)]
pub struct FailingModel {
    shape: InputShape,
}

impl FailingModel {
    pub fn new(shape: InputShape) -> Self {
        Self { shape }
    }
}

impl ModelHandle for FailingModel {
    fn input_shape(&self) -> Option<InputShape> {
        Some(self.shape)
    }

    fn run(&self, _input: Array4<f32>) -> Result<Vec<f32>, SkywatchError> {
        Err(SkywatchError::Model("synthetic inference failure".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::TensorLayout;

    #[test]
    fn test_fixed_scores_checks_input_shape() {
        let model = FixedScoresModel::new(InputShape::new(4, 2, TensorLayout::Nhwc), vec![1.0]);
        assert!(model.run(Array4::zeros((1, 2, 4, 3))).is_ok());
        assert!(model.run(Array4::zeros((1, 4, 2, 3))).is_err());
    }

    #[test]
    fn test_mean_level_scores() {
        let model = MeanLevelModel::new(InputShape::new(2, 2, TensorLayout::Nhwc));
        let scores = model.run(Array4::from_elem((1, 2, 2, 3), 0.75)).unwrap();
        assert_eq!(scores, vec![0.25, 0.75]);
    }
}

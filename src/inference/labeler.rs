use super::preprocess::{ChannelOrder, Normalization, Preprocessing};
use super::ModelHandle;
use crate::errors::SkywatchError;
use crate::frame::decode_image;
use image::RgbImage;
use std::path::Path;

/// Winning class of a multi-class prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub index: usize,
    pub score: f32,
}

/// Index of the highest score; the first one wins on ties. `None` when empty
/// or when every score is NaN.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Multi-class labeler over a model handle.
///
/// The input size comes from the model's declared input shape. `labels`
/// must be in the class-index order used at training time; a permuted list
/// produces wrong labels that nothing downstream can detect.
pub struct Labeler {
    model: Box<dyn ModelHandle>,
    labels: Vec<String>,
    preprocessing: Preprocessing,
}

impl Labeler {
    pub fn new(
        model: Box<dyn ModelHandle>,
        labels: Vec<String>,
        normalization: Normalization,
        channel_order: ChannelOrder,
    ) -> Result<Self, SkywatchError> {
        if labels.is_empty() {
            return Err(SkywatchError::Model("Labeler needs at least one label".to_string()));
        }
        let shape = model.input_shape().ok_or_else(|| {
            SkywatchError::Model("Labeler model does not declare a fixed input shape".to_string())
        })?;
        if shape.channels != 3 || shape.width == 0 || shape.height == 0 {
            return Err(SkywatchError::Model(format!(
                "Labeler model input {}x{}x{} is not a 3-channel image",
                shape.height, shape.width, shape.channels
            )));
        }

        Ok(Self {
            model,
            labels,
            preprocessing: Preprocessing {
                shape,
                normalization,
                channel_order,
            },
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// (width, height) frames are resized to
    pub fn input_size(&self) -> (u32, u32) {
        (self.preprocessing.shape.width, self.preprocessing.shape.height)
    }

    pub fn classify(&self, image: &RgbImage) -> Result<Classification, SkywatchError> {
        let input = self.preprocessing.to_tensor(image);
        let scores = self.model.run(input)?;

        if scores.len() != self.labels.len() {
            return Err(SkywatchError::Model(format!(
                "Model returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        let index = argmax(&scores)
            .ok_or_else(|| SkywatchError::Model("Model returned no usable scores".to_string()))?;

        Ok(Classification {
            label: self.labels[index].clone(),
            index,
            score: scores[index],
        })
    }

    /// Decode `path` and classify it. Undecodable files are `UnreadableInput`.
    pub fn classify_path<P: AsRef<Path>>(&self, path: P) -> Result<Classification, SkywatchError> {
        let image = decode_image(path.as_ref())?;
        self.classify(&image)
    }
}

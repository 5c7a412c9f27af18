use super::preprocess::{InputShape, TensorLayout};
use super::ModelHandle;
use crate::errors::SkywatchError;
use std::path::{Path, PathBuf};
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::tract_ndarray::Array4;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::DimLike;
use tract_onnx::tract_hir::infer::Factoid;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX graph loaded and optimised once, then run read-only
pub struct TractModel {
    plan: Plan,
    input_shape: Option<InputShape>,
    path: PathBuf,
}

fn model_error(path: &Path, stage: &str, e: impl std::fmt::Display) -> SkywatchError {
    SkywatchError::Model(format!("{} ({}): {}", stage, path.display(), e))
}

/// Concrete `[1, a, b, c]` input dims declared by the graph.
///
/// The batch axis may be symbolic (`N`, `batch_size`), as exporters usually
/// leave it; the other three must be fixed.
fn declared_dims(model: &InferenceModel) -> Option<[usize; 4]> {
    let dims = model.input_fact(0).ok()?.shape.concretize()?;
    let [batch, rest @ ..] = dims.as_slice() else {
        return None;
    };
    if rest.len() != 3 {
        return None;
    }
    if let Ok(batch) = batch.to_usize() {
        if batch != 1 {
            return None;
        }
    }
    let mut pinned = [1usize; 4];
    for (slot, dim) in pinned[1..].iter_mut().zip(rest) {
        *slot = dim.to_usize().ok()?;
    }
    Some(pinned)
}

impl TractModel {
    /// Load an ONNX model.
    ///
    /// With `fixed_size = Some((width, height))` the input fact is pinned to
    /// `[1, height, width, 3]` (or its NCHW equivalent) before optimisation.
    /// Otherwise the graph's own declared input shape is used, with a
    /// symbolic batch axis pinned to 1.
    pub fn load<P: AsRef<Path>>(
        path: P,
        layout: TensorLayout,
        fixed_size: Option<(u32, u32)>,
    ) -> Result<Self, SkywatchError> {
        let path = path.as_ref();
        log::info!("Loading model from {}", path.display());

        if !path.exists() {
            return Err(SkywatchError::Model(format!(
                "Model not found: {}",
                path.display()
            )));
        }

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| model_error(path, "Failed to parse model", e))?;
        Self::prepare(model, path, layout, fixed_size)
    }

    /// Build from an already decoded ONNX protobuf; `origin` only names the
    /// model in logs and errors.
    pub fn from_proto<P: AsRef<Path>>(
        proto: &ModelProto,
        origin: P,
        layout: TensorLayout,
        fixed_size: Option<(u32, u32)>,
    ) -> Result<Self, SkywatchError> {
        let origin = origin.as_ref();
        let model = tract_onnx::onnx()
            .model_for_proto_model(proto)
            .map_err(|e| model_error(origin, "Failed to parse model", e))?;
        Self::prepare(model, origin, layout, fixed_size)
    }

    fn prepare(
        mut model: InferenceModel,
        path: &Path,
        layout: TensorLayout,
        fixed_size: Option<(u32, u32)>,
    ) -> Result<Self, SkywatchError> {
        let pinned = match fixed_size {
            Some((width, height)) => Some(layout.dims(height as usize, width as usize, 3)),
            None => declared_dims(&model),
        };

        if let Some(dims) = pinned {
            model = model
                .with_input_fact(0, f32::fact(dims).into())
                .map_err(|e| model_error(path, "Failed to pin input shape", e))?;
        }

        let typed = model
            .into_optimized()
            .map_err(|e| model_error(path, "Failed to optimise model", e))?;

        let input_shape = typed
            .input_fact(0)
            .ok()
            .and_then(|fact| fact.shape.as_concrete().map(|dims| dims.to_vec()))
            .and_then(|dims| InputShape::from_dims(&dims, layout));

        let plan = typed
            .into_runnable()
            .map_err(|e| model_error(path, "Failed to prepare model", e))?;

        match &input_shape {
            Some(shape) => log::info!(
                "Model {} ready, input {}x{}x{} ({:?})",
                path.display(),
                shape.height,
                shape.width,
                shape.channels,
                shape.layout
            ),
            None => log::warn!(
                "Model {} does not declare a fixed input shape",
                path.display()
            ),
        }

        Ok(Self {
            plan,
            input_shape,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelHandle for TractModel {
    fn input_shape(&self) -> Option<InputShape> {
        self.input_shape
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>, SkywatchError> {
        let tensor: Tensor = input.into_tensor();
        let outputs = self
            .plan
            .run(tvec!(tensor.into_tvalue()))
            .map_err(|e| model_error(&self.path, "Inference failed", e))?;

        let output = outputs
            .first()
            .ok_or_else(|| SkywatchError::Model(format!("{} produced no output", self.path.display())))?;

        // Quantized graphs may emit integer tensors; cast dequantizes
        let scores = output
            .cast_to::<f32>()
            .map_err(|e| model_error(&self.path, "Unexpected output type", e))?;
        let scores = scores
            .as_slice::<f32>()
            .map_err(|e| model_error(&self.path, "Unexpected output layout", e))?
            .to_vec();
        Ok(scores)
    }
}

//! Image → input tensor conversion.
//!
//! Every model carries its own preprocessing contract. The normalization in
//! particular has to match what the model saw at training time exactly, so
//! it is configured per model rather than shared.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::tract_ndarray::Array4;

/// Pixel rescaling applied after the cast to f32
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// `x / 255`, range [0, 1]
    Unit,
    /// `x / 127.5 - 1`, range [-1, 1] (MobileNet-style)
    Symmetric,
}

impl Normalization {
    pub fn unit() -> Self {
        Normalization::Unit
    }

    pub fn symmetric() -> Self {
        Normalization::Symmetric
    }

    #[inline]
    pub fn apply(self, value: u8) -> f32 {
        match self {
            Normalization::Unit => value as f32 / 255.0,
            Normalization::Symmetric => value as f32 / 127.5 - 1.0,
        }
    }
}

/// Channel order the model expects. Decoded frames are always RGB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    pub fn bgr() -> Self {
        ChannelOrder::Bgr
    }

    /// Index into an RGB pixel for tensor channel `c`
    #[inline]
    fn source_channel(self, c: usize) -> usize {
        match self {
            ChannelOrder::Rgb => c,
            ChannelOrder::Bgr => 2 - c,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, height, width, channels]`, the TFLite/Keras convention
    #[default]
    Nhwc,
    /// `[1, channels, height, width]`
    Nchw,
}

impl TensorLayout {
    pub fn dims(self, height: usize, width: usize, channels: usize) -> [usize; 4] {
        match self {
            TensorLayout::Nhwc => [1, height, width, channels],
            TensorLayout::Nchw => [1, channels, height, width],
        }
    }
}

/// Fixed input geometry a model declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
    pub layout: TensorLayout,
}

impl InputShape {
    pub fn new(width: u32, height: u32, layout: TensorLayout) -> Self {
        Self {
            height,
            width,
            channels: 3,
            layout,
        }
    }

    /// Interpret concrete tensor dims; `None` unless rank 4 with batch 1.
    pub fn from_dims(dims: &[usize], layout: TensorLayout) -> Option<Self> {
        let [batch, a, b, c] = <[usize; 4]>::try_from(dims).ok()?;
        if batch != 1 {
            return None;
        }
        let (height, width, channels) = match layout {
            TensorLayout::Nhwc => (a, b, c),
            TensorLayout::Nchw => (b, c, a),
        };
        Some(Self {
            height: u32::try_from(height).ok()?,
            width: u32::try_from(width).ok()?,
            channels: u32::try_from(channels).ok()?,
            layout,
        })
    }
}

/// Everything needed to turn a frame into a model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessing {
    pub shape: InputShape,
    pub normalization: Normalization,
    pub channel_order: ChannelOrder,
}

impl Preprocessing {
    /// Resize to the model size, reorder channels, rescale, add the batch axis.
    ///
    /// The resize is a triangle (bilinear) filter whose support widens with
    /// the scale factor, so downscaling averages every source pixel under
    /// the kernel. A plain two-tap bilinear resize samples only the nearest
    /// source pixels and aliases on large reductions; models trained on such
    /// input may see slightly smoother tensors here.
    pub fn to_tensor(&self, image: &RgbImage) -> Array4<f32> {
        let (width, height) = (self.shape.width, self.shape.height);
        let resized;
        let source = if image.dimensions() == (width, height) {
            image
        } else {
            resized = imageops::resize(image, width, height, imageops::FilterType::Triangle);
            &resized
        };

        let normalization = self.normalization;
        let order = self.channel_order;
        let value = |x: usize, y: usize, c: usize| -> f32 {
            let pixel = source.get_pixel(x as u32, y as u32);
            normalization.apply(pixel.0[order.source_channel(c)])
        };

        let (h, w) = (height as usize, width as usize);
        match self.shape.layout {
            TensorLayout::Nhwc => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| value(x, y, c)),
            TensorLayout::Nchw => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| value(x, y, c)),
        }
    }
}

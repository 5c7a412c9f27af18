use super::gray::to_gray;
use image::{GrayImage, RgbImage};

/// Mean gray level over all pixels, on the 0-255 scale.
///
/// An empty image has mean 0.
pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let count = gray.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.as_raw().iter().map(|&v| v as u64).sum();
    sum as f64 / count as f64
}

/// A frame is dark when its mean gray level is strictly below `threshold`.
pub fn is_dark(image: &RgbImage, threshold: f64) -> bool {
    mean_intensity(&to_gray(image)) < threshold
}

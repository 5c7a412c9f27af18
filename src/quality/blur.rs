//! Blur detection via the variance of the Laplacian.
//!
//! Sharp edges give a second-derivative response with large spread;
//! defocus or motion blur flattens it toward zero.

use super::gray::to_gray;
use image::{GrayImage, RgbImage};

/// Variance of the 4-neighbour Laplacian over every pixel of `gray`.
///
/// Kernel `[0,1,0; 1,-4,1; 0,1,0]`. Pixels outside the frame are mirrored
/// around the edge pixel without repeating it (`dcb|abcd|cba`).
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let count = width as u64 * height as u64;
    if count == 0 {
        return 0.0;
    }

    let raw = gray.as_raw();
    let w = width as i64;
    let h = height as i64;
    let at = |x: i64, y: i64| -> i64 {
        let x = reflect(x, w);
        let y = reflect(y, h);
        raw[(y * w + x) as usize] as i64
    };

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let response =
                at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4 * at(x, y);
            let r = response as f64;
            sum += r;
            sum_sq += r * r;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

#[inline]
fn reflect(i: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    if i < 0 {
        -i
    } else if i >= len {
        2 * len - i - 2
    } else {
        i
    }
}

/// A frame is blurry when its Laplacian variance is strictly below `threshold`.
pub fn is_blurry(image: &RgbImage, threshold: f64) -> bool {
    laplacian_variance(&to_gray(image)) < threshold
}

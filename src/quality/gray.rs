use image::{GrayImage, Luma, RgbImage};

// BT.601 weights in 14-bit fixed point: 0.299, 0.587, 0.114
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert an RGB frame to 8-bit gray using BT.601 luma, rounded.
///
/// `image`'s own grayscale conversion uses BT.709 weights, which shifts the
/// mean by several levels on saturated sky frames; the thresholds in
/// [`QualityConfig`](crate::config::QualityConfig) are calibrated for BT.601.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(gray.pixels_mut()) {
        *dst = Luma([luma(src.0)]);
    }
    gray
}

#[inline]
fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted =
        r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + (1 << (SHIFT - 1));
    (weighted >> SHIFT).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_gray_extremes() {
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 255, 255]), 255);
    }

    #[test]
    fn test_gray_weights() {
        // 0.299 * 255 = 76.2, 0.587 * 255 = 149.7, 0.114 * 255 = 29.1
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn test_to_gray_preserves_dimensions() {
        let image = RgbImage::from_pixel(7, 3, Rgb([10, 20, 30]));
        let gray = to_gray(&image);
        assert_eq!(gray.dimensions(), (7, 3));
        assert!(gray.pixels().all(|p| p.0[0] == gray.get_pixel(0, 0).0[0]));
    }
}

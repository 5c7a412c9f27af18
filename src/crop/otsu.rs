use image::{GrayImage, Luma};

/// Global threshold maximising between-class variance of the gray histogram.
///
/// Class 0 is `level <= t`, class 1 is `level > t`. When several levels give
/// the same variance the lowest one is returned; a single-valued image
/// yields 0.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in gray.as_raw() {
        histogram[v as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_sigma = 0.0f64;
    let mut weight_below = 0u64;
    let mut sum_below = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        weight_below += count;
        sum_below += level as f64 * count as f64;

        if weight_below == 0 || weight_below == total {
            continue;
        }
        let weight_above = total - weight_below;
        let mean_below = sum_below / weight_below as f64;
        let mean_above = (total_sum - sum_below) / weight_above as f64;
        let q_below = weight_below as f64 / total as f64;
        let q_above = weight_above as f64 / total as f64;
        let sigma = q_below * q_above * (mean_below - mean_above).powi(2);

        if sigma > best_sigma {
            best_sigma = sigma;
            best_level = level as u8;
        }
    }

    best_level
}

/// Foreground mask: 255 where `gray > threshold`, else 0.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (src, dst) in gray.pixels().zip(mask.pixels_mut()) {
        *dst = Luma([if src.0[0] > threshold { 255 } else { 0 }]);
    }
    mask
}

use super::blur::laplacian_variance;
use super::exposure::mean_intensity;
use super::gray::to_gray;
use crate::config::QualityConfig;
use image::RgbImage;

/// Result of running both quality tests on a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityVerdict {
    Acceptable { mean: f64, variance: f64 },
    Dark { mean: f64 },
    Blurry { variance: f64 },
}

impl QualityVerdict {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, QualityVerdict::Acceptable { .. })
    }
}

/// Darkness and blur gate with tunable thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityFilter {
    pub dark_threshold: f64,
    pub blur_threshold: f64,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            dark_threshold: 40.0,
            blur_threshold: 100.0,
        }
    }
}

impl From<&QualityConfig> for QualityFilter {
    fn from(config: &QualityConfig) -> Self {
        Self {
            dark_threshold: config.dark_threshold,
            blur_threshold: config.blur_threshold,
        }
    }
}

impl QualityFilter {
    pub fn new(dark_threshold: f64, blur_threshold: f64) -> Self {
        Self {
            dark_threshold,
            blur_threshold,
        }
    }

    /// Darkness is checked first; the blur test only runs on frames that are bright enough.
    pub fn assess(&self, image: &RgbImage) -> QualityVerdict {
        let gray = to_gray(image);

        let mean = mean_intensity(&gray);
        if mean < self.dark_threshold {
            return QualityVerdict::Dark { mean };
        }

        let variance = laplacian_variance(&gray);
        if variance < self.blur_threshold {
            return QualityVerdict::Blurry { variance };
        }

        QualityVerdict::Acceptable { mean, variance }
    }
}

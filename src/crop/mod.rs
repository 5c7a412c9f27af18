/// Region-of-interest selection ("auto-crop")
///
/// Finds the largest bright region of a frame and crops to its bounding box:
/// 1. Convert to gray (BT.601)
/// 2. Binarize with an Otsu threshold, since sky brightness varies per capture
/// 3. Trace the external contours of the bright mask
/// 4. Keep the contour with the largest enclosed area (first found on ties)
/// 5. Crop to its bounding box unless the box is too small to matter
///
/// Stateless and deterministic: the same frame always yields the same crop.
pub mod contours;
pub mod otsu;

pub use contours::{find_external_contours, BoundingBox, Contour};
pub use otsu::{binarize, otsu_threshold};

use crate::config::CropConfig;
use crate::quality::to_gray;
use image::{imageops, RgbImage};

/// Crops frames to their dominant bright region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSelector {
    /// Bounding boxes smaller than this fraction of the frame are ignored
    pub min_area_ratio: f64,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.1,
        }
    }
}

impl From<&CropConfig> for RegionSelector {
    fn from(config: &CropConfig) -> Self {
        Self {
            min_area_ratio: config.min_area_ratio,
        }
    }
}

impl RegionSelector {
    pub fn new(min_area_ratio: f64) -> Self {
        Self { min_area_ratio }
    }

    /// The box to crop to, or `None` when the frame should stay as it is.
    ///
    /// `None` covers: no bright region at all, a largest region whose box is
    /// below `min_area_ratio` of the frame (stars, hot pixels), and a box
    /// spanning the whole frame.
    pub fn select_region(&self, image: &RgbImage) -> Option<BoundingBox> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let gray = to_gray(image);
        let threshold = otsu_threshold(&gray);
        let mask = binarize(&gray, threshold);
        let contours = find_external_contours(&mask);

        let mut largest: Option<(f64, &Contour)> = None;
        for contour in &contours {
            let area = contour.area();
            match largest {
                Some((best, _)) if area <= best => {}
                _ => largest = Some((area, contour)),
            }
        }
        let (area, contour) = largest?;
        let bbox = contour.bounding_box();

        let frame_area = width as f64 * height as f64;
        if (bbox.area() as f64) < self.min_area_ratio * frame_area {
            log::debug!(
                "Largest bright region {:?} (area {}) below {:.0}% of frame, not cropping",
                bbox,
                area,
                self.min_area_ratio * 100.0
            );
            return None;
        }
        if bbox.width == width && bbox.height == height {
            return None;
        }

        log::debug!(
            "Selected region {:?} from {} contours (threshold {})",
            bbox,
            contours.len(),
            threshold
        );
        Some(bbox)
    }

    /// The cropped frame, or a copy of the input when no crop applies.
    pub fn auto_crop(&self, image: &RgbImage) -> RgbImage {
        match self.select_region(image) {
            Some(bbox) => crop_to(image, bbox),
            None => image.clone(),
        }
    }
}

pub fn crop_to(image: &RgbImage, bbox: BoundingBox) -> RgbImage {
    imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
}

/// Crop with the default 10% minimum area ratio
pub fn auto_crop(image: &RgbImage) -> RgbImage {
    RegionSelector::default().auto_crop(image)
}

//! Fuzz-style tests using proptest
//!
//! These provide fuzz-like testing without requiring nightly Rust or cargo-fuzz.
//! Run with: cargo test --test fuzz_tests

use image::RgbImage;
use proptest::prelude::*;
use skywatch::crop::{find_external_contours, otsu_threshold, RegionSelector};
use skywatch::inference::argmax;
use skywatch::quality::{laplacian_variance, mean_intensity, to_gray};

fn arbitrary_frame() -> impl Strategy<Value = RgbImage> {
    (1u32..24, 1u32..24).prop_flat_map(|(width, height)| {
        prop::collection::vec(any::<u8>(), (width * height * 3) as usize).prop_map(
            move |data| RgbImage::from_raw(width, height, data).expect("buffer sized to frame"),
        )
    })
}

fn binary_mask() -> impl Strategy<Value = image::GrayImage> {
    (1u32..20, 1u32..20).prop_flat_map(|(width, height)| {
        prop::collection::vec(prop::bool::ANY, (width * height) as usize).prop_map(
            move |bits| {
                let data = bits.into_iter().map(|b| if b { 255 } else { 0 }).collect();
                image::GrayImage::from_raw(width, height, data).expect("buffer sized to mask")
            },
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Region selection never panics and only returns boxes inside the frame
    #[test]
    fn fuzz_select_region(frame in arbitrary_frame(), ratio in 0.0f64..1.0) {
        let (width, height) = frame.dimensions();
        if let Some(bbox) = RegionSelector::new(ratio).select_region(&frame) {
            prop_assert!(bbox.width > 0 && bbox.height > 0);
            prop_assert!(bbox.x + bbox.width <= width);
            prop_assert!(bbox.y + bbox.height <= height);
            prop_assert!((bbox.width, bbox.height) != (width, height));
        }
    }

    /// Every traced contour lies on foreground pixels
    #[test]
    fn fuzz_contours_on_foreground(mask in binary_mask()) {
        for contour in find_external_contours(&mask) {
            prop_assert!(!contour.points.is_empty());
            for &(x, y) in &contour.points {
                prop_assert_eq!(mask.get_pixel(x as u32, y as u32).0[0], 255);
            }
            prop_assert!(contour.area() >= 0.0);
        }
    }

    /// Quality statistics stay finite and in range
    #[test]
    fn fuzz_quality_statistics(frame in arbitrary_frame()) {
        let gray = to_gray(&frame);
        let mean = mean_intensity(&gray);
        let variance = laplacian_variance(&gray);
        prop_assert!((0.0..=255.0).contains(&mean));
        prop_assert!(variance.is_finite() && variance >= 0.0);
        let _ = otsu_threshold(&gray);
    }

    /// argmax picks an index holding the maximum
    #[test]
    fn fuzz_argmax(scores in prop::collection::vec(-10.0f32..10.0, 1..16)) {
        let index = argmax(&scores).unwrap();
        prop_assert!(scores.iter().all(|&s| s <= scores[index]));
        prop_assert!(scores[..index].iter().all(|&s| s < scores[index]));
    }
}

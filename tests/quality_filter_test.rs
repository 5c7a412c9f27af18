//! Quality gate behaviour on synthetic frames

use skywatch::quality::{is_blurry, is_dark, laplacian_variance, to_gray, QualityFilter, QualityVerdict};
use skywatch::testing::{checkerboard_frame, smoothed_frame, star_field_frame, uniform_frame};

const DARK: f64 = 40.0;
const BLUR: f64 = 100.0;

#[test]
fn test_all_black_is_dark() {
    assert!(is_dark(&uniform_frame(64, 48, 0), DARK));
}

#[test]
fn test_uniformly_bright_is_not_dark() {
    assert!(!is_dark(&uniform_frame(64, 48, 200), DARK));
}

#[test]
fn test_exact_threshold_passes() {
    assert!(!is_dark(&uniform_frame(16, 16, 40), DARK));
    assert!(is_dark(&uniform_frame(16, 16, 39), DARK));
}

#[test]
fn test_sharp_vs_smoothed_checkerboard() {
    let sharp = checkerboard_frame(128, 128, 16);
    let smoothed = smoothed_frame(&sharp, 8.0);

    assert!(!is_blurry(&sharp, BLUR));
    assert!(is_blurry(&smoothed, BLUR));
    assert!(laplacian_variance(&to_gray(&sharp)) > laplacian_variance(&to_gray(&smoothed)));
}

#[test]
fn test_filter_reports_dark_before_blurry() {
    let filter = QualityFilter::new(DARK, BLUR);
    // Flat and black: both dark and blurry
    let verdict = filter.assess(&uniform_frame(32, 32, 0));
    assert_eq!(verdict, QualityVerdict::Dark { mean: 0.0 });
}

#[test]
fn test_star_field_passes_default_gate() {
    let verdict = QualityFilter::default().assess(&star_field_frame(160, 120));
    assert!(verdict.is_acceptable(), "{:?}", verdict);
}

#[test]
fn test_thresholds_are_tunable() {
    let blurred = smoothed_frame(&checkerboard_frame(128, 128, 16), 8.0);
    assert!(QualityFilter::new(DARK, 0.0).assess(&blurred).is_acceptable());
}

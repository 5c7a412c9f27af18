/// Frame quality triage
///
/// Statistical tests that decide whether a captured frame is worth
/// classifying: darkness (mean gray level) and blur (Laplacian variance).
pub mod blur;
pub mod exposure;
pub mod gray;
pub mod validator;

pub use blur::{is_blurry, laplacian_variance};
pub use exposure::{is_dark, mean_intensity};
pub use gray::to_gray;
pub use validator::{QualityFilter, QualityVerdict};

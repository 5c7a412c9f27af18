//! Configuration management for Skywatch
//!
//! Provides configuration loading, saving, and validation for the capture
//! loop, quality thresholds, cropping, model artifacts and metadata storage.

use crate::errors::SkywatchError;
use crate::inference::{ChannelOrder, Normalization, TensorLayout};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkywatchConfig {
    pub capture: CaptureConfig,
    pub quality: QualityConfig,
    pub crop: CropConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
}

/// Capture loop and still-capture command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory captured frames are written to
    pub output_directory: String,
    /// Pause between iterations in seconds
    pub interval_secs: u64,
    /// Upper bound on a single capture command in seconds
    pub timeout_secs: u64,
    /// Still-capture program
    pub command: String,
    /// Program arguments; `{output}` is replaced with the destination path
    pub args: Vec<String>,
}

/// Frame rejection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Mean gray level (0-255) below which a frame is dark
    pub dark_threshold: f64,
    /// Laplacian variance below which a frame is blurry
    pub blur_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropConfig {
    pub enabled: bool,
    /// Minimum bounding-box area, as a fraction of the frame, that triggers a crop
    pub min_area_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub labeler: LabelerConfig,
    #[serde(default)]
    pub predictors: Vec<PredictorConfig>,
}

/// Multi-class labeler. The input size comes from the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelerConfig {
    pub path: String,
    /// Ordered class names; index order must match the training-time encoding
    pub labels: Vec<String>,
    #[serde(default = "Normalization::unit")]
    pub normalization: Normalization,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub layout: TensorLayout,
}

/// Binary confidence predictor with a fixed input size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub name: String,
    pub path: String,
    /// [width, height]
    #[serde(default = "default_predictor_input_size")]
    pub input_size: [u32; 2],
    #[serde(default = "Normalization::symmetric")]
    pub normalization: Normalization,
    /// The binary models were trained on frames straight from the camera
    /// driver, which are BGR; the labeler was trained on RGB.
    #[serde(default = "ChannelOrder::bgr")]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub layout: TensorLayout,
    #[serde(default = "default_decision_boundary")]
    pub decision_boundary: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Metadata file, relative to the output directory unless absolute
    pub metadata_file: String,
    /// Total attempts for a metadata write before giving up
    pub persist_attempts: u32,
    pub persist_retry_delay_ms: u64,
    /// JPEG quality (1-100) used when a cropped frame is written back
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_predictor_input_size() -> [u32; 2] {
    [224, 224]
}

fn default_decision_boundary() -> f32 {
    0.5
}

fn default_jpeg_quality() -> u8 {
    95
}

impl Default for SkywatchConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                output_directory: "./captures".to_string(),
                interval_secs: 30,
                timeout_secs: 20,
                command: "libcamera-still".to_string(),
                args: vec![
                    "--nopreview".to_string(),
                    "--immediate".to_string(),
                    "-o".to_string(),
                    "{output}".to_string(),
                ],
            },
            quality: QualityConfig {
                dark_threshold: 40.0,
                blur_threshold: 100.0,
            },
            crop: CropConfig {
                enabled: true,
                min_area_ratio: 0.1,
            },
            models: ModelsConfig {
                labeler: LabelerConfig {
                    path: "models/classifier.onnx".to_string(),
                    labels: vec!["horizon".to_string(), "stars".to_string()],
                    normalization: Normalization::Unit,
                    channel_order: ChannelOrder::Rgb,
                    layout: TensorLayout::Nhwc,
                },
                predictors: Vec::new(),
            },
            storage: StorageConfig {
                metadata_file: "metadata.json".to_string(),
                persist_attempts: 3,
                persist_retry_delay_ms: 200,
                jpeg_quality: 95,
            },
        }
    }
}

impl SkywatchConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SkywatchError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SkywatchError::Config(format!("Failed to read config file: {}", e)))?;

        let config: SkywatchConfig = toml::from_str(&contents)
            .map_err(|e| SkywatchError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Layered load: built-in defaults, then the TOML file if present, then
    /// `SKYWATCH__<SECTION>__<KEY>` environment variables.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, SkywatchError> {
        let path = path.as_ref();
        let defaults = ::config::Config::try_from(&Self::default())
            .map_err(|e| SkywatchError::Config(format!("Failed to seed defaults: {}", e)))?;

        let layered = ::config::Config::builder()
            .add_source(defaults)
            .add_source(::config::File::from(path.to_path_buf()).required(false))
            .add_source(
                ::config::Environment::with_prefix("SKYWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SkywatchError::Config(format!("Failed to assemble config: {}", e)))?;

        let config: SkywatchConfig = layered
            .try_deserialize()
            .map_err(|e| SkywatchError::Config(format!("Failed to parse config: {}", e)))?;

        log::debug!("Layered configuration resolved from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SkywatchError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SkywatchError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| SkywatchError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| SkywatchError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("skywatch.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.capture.interval_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture.timeout_secs)
    }

    /// Resolved location of the metadata file
    pub fn metadata_path(&self) -> PathBuf {
        let file = Path::new(&self.storage.metadata_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            Path::new(&self.capture.output_directory).join(file)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.capture.interval_secs == 0 {
            return Err("Capture interval must be at least 1 second".to_string());
        }
        if self.capture.timeout_secs == 0 {
            return Err("Capture timeout must be at least 1 second".to_string());
        }
        if self.capture.command.trim().is_empty() {
            return Err("Capture command must not be empty".to_string());
        }
        if self.capture.output_directory.trim().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }

        if !self.quality.dark_threshold.is_finite() || self.quality.dark_threshold < 0.0 {
            return Err("Dark threshold must be a non-negative number".to_string());
        }
        if !self.quality.blur_threshold.is_finite() || self.quality.blur_threshold < 0.0 {
            return Err("Blur threshold must be a non-negative number".to_string());
        }

        if !(0.0..=1.0).contains(&self.crop.min_area_ratio) {
            return Err("Minimum crop area ratio must be between 0.0 and 1.0".to_string());
        }

        if self.models.labeler.labels.is_empty() {
            return Err("Labeler needs at least one label".to_string());
        }
        let mut names = HashSet::new();
        for predictor in &self.models.predictors {
            if predictor.name.trim().is_empty() {
                return Err("Predictor name must not be empty".to_string());
            }
            if !names.insert(predictor.name.as_str()) {
                return Err(format!("Duplicate predictor name: {}", predictor.name));
            }
            if predictor.input_size[0] == 0 || predictor.input_size[1] == 0 {
                return Err(format!("Invalid input size for predictor {}", predictor.name));
            }
            if !(0.0..=1.0).contains(&predictor.decision_boundary) {
                return Err(format!(
                    "Decision boundary for predictor {} must be between 0.0 and 1.0",
                    predictor.name
                ));
            }
        }

        if self.storage.persist_attempts == 0 {
            return Err("Metadata persist attempts must be at least 1".to_string());
        }
        if self.storage.metadata_file.trim().is_empty() {
            return Err("Metadata file must not be empty".to_string());
        }
        if self.storage.jpeg_quality == 0 || self.storage.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        Ok(())
    }
}

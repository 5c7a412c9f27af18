//! Capture loop
//!
//! One iteration: acquire → decode → quality gate → auto-crop → classify →
//! record. Every step is a hard gate, and each iteration reports how it
//! ended as a [`FrameOutcome`]. Only metadata persistence failures come back
//! as `Err`; [`Processor::run`] logs those and keeps going.

pub mod outcome;

pub use outcome::{FrameOutcome, LoopStats};

use crate::capture::{frame_filename, CommandCamera, FrameSource};
use crate::config::SkywatchConfig;
use crate::crop::{crop_to, RegionSelector};
use crate::errors::SkywatchError;
use crate::frame::Frame;
use crate::inference::InferenceEngine;
use crate::metadata::{ClassificationRecord, MetadataStore};
use crate::quality::{QualityFilter, QualityVerdict};
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Drives one frame source through the whole pipeline
pub struct Processor<S: FrameSource> {
    source: S,
    filter: QualityFilter,
    /// `None` when cropping is disabled
    selector: Option<RegionSelector>,
    engine: InferenceEngine,
    store: MetadataStore,
    interval: Duration,
    persist_attempts: u32,
    persist_retry_delay: Duration,
    jpeg_quality: u8,
    stats: LoopStats,
}

impl Processor<CommandCamera> {
    /// Production wiring: still-capture command plus models loaded from disk.
    pub fn from_config(config: &SkywatchConfig) -> Result<Self, SkywatchError> {
        config.validate().map_err(SkywatchError::Config)?;
        let engine = InferenceEngine::from_config(&config.models)?;
        Ok(Self::new(CommandCamera::from(&config.capture), engine, config))
    }
}

impl<S: FrameSource> Processor<S> {
    pub fn new(source: S, engine: InferenceEngine, config: &SkywatchConfig) -> Self {
        Self {
            source,
            filter: QualityFilter::from(&config.quality),
            selector: config
                .crop
                .enabled
                .then(|| RegionSelector::from(&config.crop)),
            engine,
            store: MetadataStore::new(config.metadata_path()),
            interval: config.interval(),
            persist_attempts: config.storage.persist_attempts,
            persist_retry_delay: Duration::from_millis(config.storage.persist_retry_delay_ms),
            jpeg_quality: config.storage.jpeg_quality,
            stats: LoopStats::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Run exactly one iteration.
    pub fn process_once(&mut self) -> Result<FrameOutcome, SkywatchError> {
        let result = self.iterate();
        match &result {
            Ok(outcome) => self.stats.observe(outcome),
            Err(_) => self.stats.observe_error(),
        }
        result
    }

    fn iterate(&mut self) -> Result<FrameOutcome, SkywatchError> {
        let captured_at = Local::now();
        let filename = frame_filename(&self.source.timestamp());

        let path = match self.source.capture(&filename) {
            Ok(Some(path)) => path,
            Ok(None) => {
                log::info!("No frame captured for {}", filename);
                return Ok(FrameOutcome::NoFrame);
            }
            Err(e) => {
                log::info!("Capture of {} failed: {}", filename, e);
                return Ok(FrameOutcome::NoFrame);
            }
        };

        self.process_file(&path, filename, captured_at)
    }

    fn process_file(
        &mut self,
        path: &Path,
        filename: String,
        captured_at: DateTime<Local>,
    ) -> Result<FrameOutcome, SkywatchError> {
        let mut frame = match Frame::open(path, filename, captured_at) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Deleting undecodable capture: {}", e);
                remove_if_present(path)?;
                return Ok(FrameOutcome::DecodeFailed);
            }
        };

        match self.filter.assess(&frame.image) {
            QualityVerdict::Dark { mean } => {
                log::info!("{} is too dark (mean {:.1}), deleting", frame.filename, mean);
                frame.discard()?;
                return Ok(FrameOutcome::RejectedDark { mean });
            }
            QualityVerdict::Blurry { variance } => {
                log::info!(
                    "{} is too blurry (variance {:.1}), deleting",
                    frame.filename,
                    variance
                );
                frame.discard()?;
                return Ok(FrameOutcome::RejectedBlurry { variance });
            }
            QualityVerdict::Acceptable { mean, variance } => {
                log::debug!(
                    "{} passed quality (mean {:.1}, variance {:.1})",
                    frame.filename,
                    mean,
                    variance
                );
            }
        }

        let region = self
            .selector
            .as_ref()
            .and_then(|selector| selector.select_region(&frame.image));
        let cropped = match region {
            Some(bbox) => {
                let (width, height) = frame.dimensions();
                log::info!(
                    "Cropping {} from {}x{} to {}x{} at ({}, {})",
                    frame.filename,
                    width,
                    height,
                    bbox.width,
                    bbox.height,
                    bbox.x,
                    bbox.y
                );
                let image = crop_to(&frame.image, bbox);
                frame.replace_image(image, self.jpeg_quality)?;
                true
            }
            None => false,
        };

        // The stored file, cropped or not
        let classification = match self.engine.classify_path(&frame.path) {
            Ok(classification) => classification,
            Err(e) => {
                log::error!("Inference failed for {}: {}", frame.filename, e);
                return Ok(FrameOutcome::InferenceFailed {
                    error: e.to_string(),
                });
            }
        };

        let record = ClassificationRecord::new(frame.captured_at, &classification.label)
            .with_assessments(classification.assessments.clone());
        self.persist(&frame.filename, record)?;

        log::info!("{}: {}", frame.filename, classification.label);
        Ok(FrameOutcome::Classified {
            label: classification.label,
            cropped,
            assessments: classification.assessments,
        })
    }

    fn persist(&self, filename: &str, record: ClassificationRecord) -> Result<(), SkywatchError> {
        let attempts = self.persist_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.insert(filename, record.clone()) {
                Ok(_) => return Ok(()),
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Metadata write for {} failed (attempt {}/{}): {}",
                        filename,
                        attempt,
                        attempts,
                        e
                    );
                    thread::sleep(self.persist_retry_delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Loop until `shutdown` is set.
    ///
    /// The flag is checked between iterations, so an in-flight frame always
    /// finishes. Each iteration starts one interval after the previous one
    /// started, or immediately if it overran.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), SkywatchError> {
        self.source.ensure_dirs()?;
        log::info!(
            "Capture loop started, interval {:?}, metadata at {}",
            self.interval,
            self.store.path().display()
        );

        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();

            match self.process_once() {
                Ok(outcome) => log::debug!("Iteration finished: {}", outcome),
                Err(e) => log::error!("Iteration failed: {}", e),
            }

            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let elapsed = started.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }

        let stats = &self.stats;
        log::info!(
            "Capture loop stopped after {} iterations: {} classified ({} cropped), {} rejected, {} undecodable, {} inference failures, {} errors",
            stats.iterations,
            stats.classified,
            stats.cropped,
            stats.rejected(),
            stats.decode_failed,
            stats.inference_failed,
            stats.errors
        );
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), SkywatchError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

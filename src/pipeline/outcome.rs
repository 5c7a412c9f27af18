use std::collections::BTreeMap;
use std::fmt;

/// How one iteration of the loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The camera produced nothing
    NoFrame,
    /// The capture could not be decoded and was deleted
    DecodeFailed,
    /// Deleted: mean gray level under the darkness threshold
    RejectedDark { mean: f64 },
    /// Deleted: Laplacian variance under the blur threshold
    RejectedBlurry { variance: f64 },
    /// The file was kept but no record was written
    InferenceFailed { error: String },
    /// Kept, labeled and recorded
    Classified {
        label: String,
        cropped: bool,
        assessments: BTreeMap<String, bool>,
    },
}

impl FrameOutcome {
    /// Whether the captured file is still on disk afterwards
    pub fn keeps_file(&self) -> bool {
        matches!(
            self,
            FrameOutcome::InferenceFailed { .. } | FrameOutcome::Classified { .. }
        )
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            FrameOutcome::Classified { label, .. } => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for FrameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameOutcome::NoFrame => write!(f, "no frame"),
            FrameOutcome::DecodeFailed => write!(f, "undecodable"),
            FrameOutcome::RejectedDark { mean } => write!(f, "too dark (mean {:.1})", mean),
            FrameOutcome::RejectedBlurry { variance } => {
                write!(f, "too blurry (variance {:.1})", variance)
            }
            FrameOutcome::InferenceFailed { error } => write!(f, "inference failed: {}", error),
            FrameOutcome::Classified { label, cropped, .. } => {
                write!(f, "{}{}", label, if *cropped { " (cropped)" } else { "" })
            }
        }
    }
}

/// Running totals over the life of a loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub no_frame: u64,
    pub decode_failed: u64,
    pub rejected_dark: u64,
    pub rejected_blurry: u64,
    pub inference_failed: u64,
    pub classified: u64,
    pub cropped: u64,
    /// Iterations that ended in an error, e.g. metadata that could not be saved
    pub errors: u64,
}

impl LoopStats {
    pub fn observe(&mut self, outcome: &FrameOutcome) {
        self.iterations += 1;
        match outcome {
            FrameOutcome::NoFrame => self.no_frame += 1,
            FrameOutcome::DecodeFailed => self.decode_failed += 1,
            FrameOutcome::RejectedDark { .. } => self.rejected_dark += 1,
            FrameOutcome::RejectedBlurry { .. } => self.rejected_blurry += 1,
            FrameOutcome::InferenceFailed { .. } => self.inference_failed += 1,
            FrameOutcome::Classified { cropped, .. } => {
                self.classified += 1;
                if *cropped {
                    self.cropped += 1;
                }
            }
        }
    }

    pub fn observe_error(&mut self) {
        self.iterations += 1;
        self.errors += 1;
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_dark + self.rejected_blurry
    }
}

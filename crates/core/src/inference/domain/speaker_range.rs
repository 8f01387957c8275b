use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeakerRangeError {
    #[error("minimum speaker count must be at least 1")]
    MinBelowOne,
    #[error("minimum speaker count {min} exceeds maximum {max}")]
    Inverted { min: usize, max: usize },
}

/// Inclusive bounds on the number of distinct speakers diarization may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeakerRange {
    min: usize,
    max: usize,
}

impl SpeakerRange {
    pub fn new(min: usize, max: usize) -> Result<Self, SpeakerRangeError> {
        if min < 1 {
            return Err(SpeakerRangeError::MinBelowOne);
        }
        if min > max {
            return Err(SpeakerRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

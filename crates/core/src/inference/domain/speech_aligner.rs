use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::DeviceSelection;

use super::inference_error::InferenceError;
use super::segments::{AlignedSegment, RecognizedSegment};

/// Domain interface for loading a forced-alignment model for one language.
pub trait SpeechAligner: Send + Sync {
    fn load(
        &self,
        language: &str,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedAligner>, InferenceError>;
}

/// An alignment model held in memory. Dropping it frees the model.
pub trait LoadedAligner: Send {
    /// Refine segment timing to word level.
    ///
    /// Output has the same length and order as `segments`.
    fn align(
        &mut self,
        segments: Vec<RecognizedSegment>,
        audio: &AudioSample,
    ) -> Result<Vec<AlignedSegment>, InferenceError>;
}

use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::DeviceSelection;

use super::inference_error::InferenceError;
use super::model_size::ModelSize;
use super::segments::Recognition;

/// Domain interface for loading a speech-to-text model.
///
/// `language` restricts recognition to one language; `None` lets the model
/// detect it.
pub trait SpeechRecognizer: Send + Sync {
    fn load(
        &self,
        model: ModelSize,
        language: Option<&str>,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedRecognizer>, InferenceError>;
}

/// A recognition model held in memory. Dropping it frees the model.
pub trait LoadedRecognizer: Send {
    /// Transcribe to ordered, time-stamped segments.
    fn recognize(&mut self, audio: &AudioSample) -> Result<Recognition, InferenceError>;
}

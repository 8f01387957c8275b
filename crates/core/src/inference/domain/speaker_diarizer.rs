use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::DeviceSelection;

use super::diarization_credential::DiarizationCredential;
use super::inference_error::InferenceError;
use super::segments::DiarizationInterval;
use super::speaker_range::SpeakerRange;

/// Domain interface for loading a speaker diarization model.
pub trait SpeakerDiarizer: Send + Sync {
    fn load(
        &self,
        credential: Option<&DiarizationCredential>,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedDiarizer>, InferenceError>;
}

/// A diarization model held in memory. Dropping it frees the model.
pub trait LoadedDiarizer: Send {
    /// Partition the audio into time-ordered single-speaker intervals,
    /// using a speaker count within `speakers`.
    fn diarize(
        &mut self,
        audio: &AudioSample,
        speakers: SpeakerRange,
    ) -> Result<Vec<DiarizationInterval>, InferenceError>;
}

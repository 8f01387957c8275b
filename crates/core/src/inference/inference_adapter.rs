use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::DeviceSelection;

use super::domain::diarization_credential::DiarizationCredential;
use super::domain::inference_error::{InferenceError, InferenceStage};
use super::domain::model_scope::ModelScope;
use super::domain::model_size::ModelSize;
use super::domain::segments::{AlignedSegment, DiarizationInterval, Recognition, RecognizedSegment};
use super::domain::speaker_diarizer::{LoadedDiarizer, SpeakerDiarizer};
use super::domain::speaker_range::SpeakerRange;
use super::domain::speech_aligner::{LoadedAligner, SpeechAligner};
use super::domain::speech_recognizer::{LoadedRecognizer, SpeechRecognizer};

/// Runs the three model stages behind one contract.
///
/// Every call loads its model, invokes it once and frees it before
/// returning, whether the invocation succeeded or not.
pub struct InferenceAdapter {
    recognizer: Box<dyn SpeechRecognizer>,
    aligner: Box<dyn SpeechAligner>,
    diarizer: Box<dyn SpeakerDiarizer>,
}

impl InferenceAdapter {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        aligner: Box<dyn SpeechAligner>,
        diarizer: Box<dyn SpeakerDiarizer>,
    ) -> Self {
        Self {
            recognizer,
            aligner,
            diarizer,
        }
    }

    pub fn recognize(
        &self,
        audio: &AudioSample,
        selection: DeviceSelection,
        model: ModelSize,
        language_hint: Option<&str>,
    ) -> Result<Recognition, InferenceError> {
        let mut scope: ModelScope<dyn LoadedRecognizer> =
            ModelScope::acquire(InferenceStage::Recognition, || {
                self.recognizer.load(model, language_hint, selection)
            })?;
        let recognition = scope.recognize(audio)?;
        log::info!(
            "Recognized {} segments (language: {})",
            recognition.segments.len(),
            recognition.language
        );
        Ok(recognition)
    }

    /// Align with the model for `language`, which must be the language
    /// recognition detected rather than the caller's hint.
    pub fn align(
        &self,
        segments: Vec<RecognizedSegment>,
        language: &str,
        audio: &AudioSample,
        selection: DeviceSelection,
    ) -> Result<Vec<AlignedSegment>, InferenceError> {
        let mut scope: ModelScope<dyn LoadedAligner> =
            ModelScope::acquire(InferenceStage::Alignment, || {
                self.aligner.load(language, selection)
            })?;
        let expected = segments.len();
        let aligned = scope.align(segments, audio)?;
        if aligned.len() != expected {
            return Err(InferenceError::invocation_failure(
                InferenceStage::Alignment,
                format!("aligner returned {} segments for {expected}", aligned.len()),
            ));
        }
        Ok(aligned)
    }

    pub fn diarize(
        &self,
        audio: &AudioSample,
        selection: DeviceSelection,
        speakers: SpeakerRange,
        credential: Option<&DiarizationCredential>,
    ) -> Result<Vec<DiarizationInterval>, InferenceError> {
        let mut scope: ModelScope<dyn LoadedDiarizer> =
            ModelScope::acquire(InferenceStage::Diarization, || {
                self.diarizer.load(credential, selection)
            })?;
        let intervals = scope.diarize(audio, speakers)?;
        log::info!("Diarization produced {} speaker turns", intervals.len());
        Ok(intervals)
    }
}

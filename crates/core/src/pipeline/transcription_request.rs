use std::path::PathBuf;

use crate::inference::domain::diarization_credential::DiarizationCredential;
use crate::inference::domain::model_size::ModelSize;
use crate::inference::domain::speaker_range::SpeakerRange;
use crate::render::domain::render_mode::RenderMode;
use crate::render::domain::unresolved_policy::UnresolvedSpeakerPolicy;
use crate::shared::constants::RESTRICTED_LANGUAGE;

/// Everything one transcription run needs, validated at the boundary.
#[derive(Clone, Debug)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    pub model: ModelSize,
    /// Restrict recognition to English.
    pub language_only: bool,
    pub mode: RenderMode,
    pub speakers: SpeakerRange,
    pub credential: Option<DiarizationCredential>,
    pub unresolved_policy: UnresolvedSpeakerPolicy,
}

impl TranscriptionRequest {
    /// Request with the default settings: large-v3, English only, cue
    /// output, one or two speakers.
    pub fn new(audio_path: impl Into<PathBuf>, speakers: SpeakerRange) -> Self {
        Self {
            audio_path: audio_path.into(),
            model: ModelSize::LargeV3,
            language_only: true,
            mode: RenderMode::Cue,
            speakers,
            credential: None,
            unresolved_policy: UnresolvedSpeakerPolicy::default(),
        }
    }

    /// Language forced on the recognizer, if any.
    pub fn language_hint(&self) -> Option<&'static str> {
        self.language_only.then_some(RESTRICTED_LANGUAGE)
    }
}

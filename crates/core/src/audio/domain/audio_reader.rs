use crate::audio::domain::audio_sample::AudioSample;
use std::path::Path;

/// Domain interface for decoding the audio track of a recording.
pub trait AudioReader: Send {
    /// Decode the audio track to mono PCM at the given sample rate.
    /// Returns None if the file has no audio track.
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSample>, Box<dyn std::error::Error>>;
}

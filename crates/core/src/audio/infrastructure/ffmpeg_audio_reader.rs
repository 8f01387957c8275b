use std::path::Path;

use ffmpeg_next::format::sample::Type as SampleLayout;
use ffmpeg_next::format::Sample;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::frame::audio::Audio;
use ffmpeg_next::{codec, media, ChannelLayout};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_sample::AudioSample;

/// Decodes the best audio stream of any ffmpeg-readable audio or video
/// file to mono float PCM at the requested rate.
pub struct FfmpegAudioReader;

impl AudioReader for FfmpegAudioReader {
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSample>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let mut input = ffmpeg_next::format::input(path)?;

        let Some(stream) = input.streams().best(media::Type::Audio) else {
            log::info!("{} has no audio stream", path.display());
            return Ok(None);
        };
        let stream_index = stream.index();
        let decoder = codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .audio()?;

        log::debug!(
            "Decoding {} ({} Hz, {} channels) to {target_sample_rate} Hz mono",
            path.display(),
            decoder.rate(),
            decoder.channels()
        );
        let mut mono = MonoDecoder::new(decoder, target_sample_rate)?;

        for (stream, packet) in input.packets() {
            if stream.index() == stream_index {
                mono.decoder.send_packet(&packet)?;
                mono.drain()?;
            }
        }
        mono.decoder.send_eof()?;
        mono.drain()?;
        let samples = mono.finish()?;

        Ok(Some(AudioSample::new(samples, target_sample_rate)))
    }
}

/// Decoder plus a resampler to planar f32 mono, accumulating samples.
struct MonoDecoder {
    decoder: codec::decoder::Audio,
    resampler: resampling::Context,
    decoded: Audio,
    resampled: Audio,
    samples: Vec<f32>,
}

impl MonoDecoder {
    fn new(
        decoder: codec::decoder::Audio,
        target_sample_rate: u32,
    ) -> Result<Self, ffmpeg_next::Error> {
        let resampler = resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            Sample::F32(SampleLayout::Planar),
            ChannelLayout::MONO,
            target_sample_rate,
        )?;
        Ok(Self {
            decoder,
            resampler,
            decoded: Audio::empty(),
            resampled: Audio::empty(),
            samples: Vec::new(),
        })
    }

    /// Resample every frame the decoder has ready.
    fn drain(&mut self) -> Result<(), ffmpeg_next::Error> {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.resampler.run(&self.decoded, &mut self.resampled)?;
            self.collect();
        }
        Ok(())
    }

    /// Flush samples still buffered in the resampler.
    fn finish(mut self) -> Result<Vec<f32>, ffmpeg_next::Error> {
        if let Some(delay) = self.resampler.flush(&mut self.resampled)? {
            if delay.output > 0 {
                self.collect();
            }
        }
        Ok(self.samples)
    }

    fn collect(&mut self) {
        if self.resampled.samples() > 0 {
            self.samples.extend_from_slice(self.resampled.plane::<f32>(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_read_audio_nonexistent_file() {
        let reader = FfmpegAudioReader;
        let path = if cfg!(windows) {
            Path::new("Z:\\nonexistent\\talk.mp3")
        } else {
            Path::new("/nonexistent/talk.mp3")
        };
        assert!(reader.read_audio(path, 16000).is_err());
    }

    #[test]
    fn test_read_audio_garbage_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("upload.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let reader = FfmpegAudioReader;
        assert!(reader.read_audio(&path, 16000).is_err());
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::{select_device, DeviceSelection};
use crate::device::domain::memory_probe::MemoryProbe;
use crate::device::infrastructure::accelerator_gate::AcceleratorGate;
use crate::inference::inference_adapter::InferenceAdapter;
use crate::merge::domain::merged_segment::SpeakerAttribution;
use crate::merge::domain::segment_merger::SegmentMerger;
use crate::render::domain::render_mode::transcript_path;
use crate::render::domain::transcript_writer::TranscriptWriter;
use crate::shared::constants::{MIN_ACCELERATOR_FREE_GIB, MODEL_SAMPLE_RATE};

use super::pipeline_error::PipelineError;
use super::pipeline_logger::PipelineLogger;
use super::transcription_request::TranscriptionRequest;

/// Result of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptionOutcome {
    pub path: PathBuf,
    pub detected_language: String,
    pub segment_count: usize,
    pub unresolved_count: usize,
}

/// Runs one transcription: decode, pick a device, recognize, align,
/// diarize, merge, render and write.
///
/// Each model stage releases its model before the next one loads. A run
/// that picks the accelerator takes the shared gate, repeats the memory
/// check under it and holds it until diarization has released its model.
/// Host runs never touch the gate.
pub struct TranscribeUseCase {
    reader: Box<dyn AudioReader>,
    probe: Box<dyn MemoryProbe>,
    gate: Arc<AcceleratorGate>,
    inference: InferenceAdapter,
    merger: SegmentMerger,
    writer: Box<dyn TranscriptWriter>,
    logger: Box<dyn PipelineLogger>,
}

impl TranscribeUseCase {
    pub fn new(
        reader: Box<dyn AudioReader>,
        probe: Box<dyn MemoryProbe>,
        gate: Arc<AcceleratorGate>,
        inference: InferenceAdapter,
        writer: Box<dyn TranscriptWriter>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            probe,
            gate,
            inference,
            merger: SegmentMerger,
            writer,
            logger,
        }
    }

    pub fn run(
        &mut self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutcome, PipelineError> {
        // 1. Decode to mono at the model sample rate
        self.logger.stage_started("decode");
        let started = Instant::now();
        let audio = self.read_audio(request)?;
        self.logger.timing("decode", elapsed_ms(started));
        self.logger
            .info(&format!("Decoded {:.1}s of audio", audio.duration()));

        // 2. Choose the device. Only an accelerator run waits for the gate,
        // and it checks free memory again once it holds the lease.
        let gate = Arc::clone(&self.gate);
        let mut selection = self.select_device();
        let lease = if selection.is_accelerator() {
            let lease = gate.acquire();
            selection = self.select_device();
            selection.is_accelerator().then_some(lease)
        } else {
            None
        };
        self.logger.info(&format!("Running on {selection}"));

        // 3. Recognize
        self.logger.stage_started("recognition");
        let started = Instant::now();
        let recognition = self.inference.recognize(
            &audio,
            selection,
            request.model,
            request.language_hint(),
        )?;
        self.logger.timing("recognition", elapsed_ms(started));
        self.logger
            .metric("segments", recognition.segments.len() as f64);
        if recognition.segments.is_empty() {
            return Err(PipelineError::EmptyResult);
        }
        let language = recognition.language;

        // 4. Align with the model for the detected language
        self.logger.stage_started("alignment");
        let started = Instant::now();
        let aligned = self
            .inference
            .align(recognition.segments, &language, &audio, selection)?;
        self.logger.timing("alignment", elapsed_ms(started));

        // 5. Diarize once, within the requested speaker bounds
        self.logger.stage_started("diarization");
        let started = Instant::now();
        let intervals = self.inference.diarize(
            &audio,
            selection,
            request.speakers,
            request.credential.as_ref(),
        )?;
        self.logger.timing("diarization", elapsed_ms(started));
        self.logger.metric("speaker_turns", intervals.len() as f64);
        drop(audio);
        drop(lease);

        // 6. Merge
        let merged = self.merger.merge(aligned, &intervals);
        let mut unresolved_count = 0;
        for (i, segment) in merged.iter().enumerate() {
            if let SpeakerAttribution::Unresolved(reason) = &segment.speaker {
                unresolved_count += 1;
                self.logger.warn(&format!(
                    "Segment {} ({:.2}s-{:.2}s) has no speaker: {reason}",
                    i + 1,
                    segment.start,
                    segment.end
                ));
            }
        }
        self.logger
            .metric("unresolved_segments", unresolved_count as f64);

        // 7. Render and write
        self.logger.stage_started("render");
        let started = Instant::now();
        let rendered = request.mode.render(&merged, request.unresolved_policy)?;
        let path = transcript_path(&request.audio_path, request.mode);
        self.writer
            .write(&path, &rendered)
            .map_err(|e| PipelineError::Output(e.to_string()))?;
        self.logger.timing("render", elapsed_ms(started));
        self.logger
            .info(&format!("Transcript written to {}", path.display()));
        self.logger.summary();

        Ok(TranscriptionOutcome {
            path,
            detected_language: language,
            segment_count: merged.len(),
            unresolved_count,
        })
    }

    fn read_audio(&self, request: &TranscriptionRequest) -> Result<AudioSample, PipelineError> {
        let audio = self
            .reader
            .read_audio(&request.audio_path, MODEL_SAMPLE_RATE)
            .map_err(|e| PipelineError::InvalidAudio(e.to_string()))?
            .ok_or_else(|| {
                PipelineError::InvalidAudio(format!(
                    "{} has no audio track",
                    request.audio_path.display()
                ))
            })?;
        if audio.is_empty() {
            return Err(PipelineError::InvalidAudio(format!(
                "{} contains no samples",
                request.audio_path.display()
            )));
        }
        Ok(audio)
    }

    fn select_device(&mut self) -> DeviceSelection {
        let memory = match self.probe.query() {
            Ok(memory) => memory,
            Err(e) => {
                self.logger
                    .warn(&format!("Accelerator memory query failed: {e}"));
                None
            }
        };
        if let Some(m) = memory {
            self.logger.metric("accelerator_free_gib", m.free_gib);
        }
        select_device(memory, MIN_ACCELERATOR_FREE_GIB)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

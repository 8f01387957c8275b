use std::path::{Path, PathBuf};

use ndarray::{Array2, Axis, Ix2};

use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::{DeviceSelection, Precision};
use crate::inference::domain::diarization_credential::DiarizationCredential;
use crate::inference::domain::inference_error::{InferenceError, InferenceStage};
use crate::inference::domain::segments::DiarizationInterval;
use crate::inference::domain::speaker_diarizer::{LoadedDiarizer, SpeakerDiarizer};
use crate::inference::domain::speaker_range::SpeakerRange;
use crate::shared::constants::{
    DIARIZATION_HOP_SECONDS, DIARIZATION_MODEL_FP16_NAME, DIARIZATION_MODEL_NAME,
    DIARIZATION_MODEL_URL_BASE, DIARIZATION_SILENCE_RMS, DIARIZATION_WINDOW_SECONDS,
    EMBEDDING_BATCH_SIZE, MODEL_SAMPLE_RATE, SPEAKER_SIMILARITY_THRESHOLD,
};
use crate::shared::model_resolver::{self, ModelRequest, ModelResolveError};

use super::fbank::FilterBank;
use super::onnx_session::build_session;
use super::speaker_clustering::cluster_embeddings;

const STAGE: InferenceStage = InferenceStage::Diarization;

/// Speaker diarizer built on an ONNX speaker-embedding model.
///
/// Audio is cut into overlapping windows, each non-silent window is
/// embedded, and the embeddings are clustered into speakers. The gated
/// model is downloaded with the diarization credential as bearer token.
#[derive(Debug, Default)]
pub struct OnnxDiarizer {
    models_dir: Option<PathBuf>,
    mirror: Option<String>,
}

impl OnnxDiarizer {
    pub fn new(models_dir: Option<&Path>, mirror: Option<&str>) -> Self {
        Self {
            models_dir: models_dir.map(Path::to_path_buf),
            mirror: mirror.map(|m| m.trim_end_matches('/').to_string()),
        }
    }

    fn resolve(
        &self,
        file: &str,
        credential: Option<&DiarizationCredential>,
    ) -> Result<PathBuf, ModelResolveError> {
        let name = format!("diarization/{file}");
        let url = match &self.mirror {
            Some(base) => format!("{base}/{name}"),
            None => format!("{DIARIZATION_MODEL_URL_BASE}/{file}"),
        };
        let request = ModelRequest::new(&name)
            .with_url(Some(&url))
            .with_bundled_dir(self.models_dir.as_deref())
            .with_auth_token(credential.map(DiarizationCredential::expose));
        model_resolver::resolve(&request)
    }
}

impl SpeakerDiarizer for OnnxDiarizer {
    fn load(
        &self,
        credential: Option<&DiarizationCredential>,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedDiarizer>, InferenceError> {
        if credential.is_none() {
            log::debug!("No diarization credential; relying on a cached model");
        }

        let reduced = match selection.precision {
            Precision::Reduced => self.resolve(DIARIZATION_MODEL_FP16_NAME, credential).ok(),
            Precision::Standard => None,
        };
        let model_path = match reduced {
            Some(path) => path,
            None => self
                .resolve(DIARIZATION_MODEL_NAME, credential)
                .map_err(|e| InferenceError::ModelUnavailable {
                    stage: STAGE,
                    detail: e.to_string(),
                })?,
        };

        log::info!("Loading speaker embedding model on {selection}");
        let session =
            build_session(&model_path, selection).map_err(|e| InferenceError::load_failure(STAGE, e))?;

        Ok(Box::new(LoadedOnnxDiarizer {
            session,
            fbank: FilterBank::new(MODEL_SAMPLE_RATE),
        }))
    }
}

struct LoadedOnnxDiarizer {
    session: ort::session::Session,
    fbank: FilterBank,
}

impl LoadedOnnxDiarizer {
    fn embed_batch(
        &mut self,
        features: &[Array2<f32>],
    ) -> Result<Vec<Vec<f32>>, Box<dyn std::error::Error>> {
        let views: Vec<_> = features.iter().map(|f| f.view()).collect();
        let batch = ndarray::stack(Axis(0), &views)?;
        let input_value = ort::value::Tensor::from_array(batch)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embeddings = outputs[0].try_extract_array::<f32>()?;
        let embeddings = embeddings.into_dimensionality::<Ix2>()?;
        Ok(embeddings
            .rows()
            .into_iter()
            .map(|row| {
                let mut v = row.to_vec();
                l2_normalize(&mut v);
                v
            })
            .collect())
    }
}

impl LoadedDiarizer for LoadedOnnxDiarizer {
    fn diarize(
        &mut self,
        audio: &AudioSample,
        speakers: SpeakerRange,
    ) -> Result<Vec<DiarizationInterval>, InferenceError> {
        if audio.is_empty() {
            return Err(InferenceError::InvalidAudio {
                stage: STAGE,
                detail: "audio contains no samples".to_string(),
            });
        }

        let windows = speech_windows(audio);
        if windows.is_empty() {
            log::warn!("No speech found for diarization");
            return Ok(Vec::new());
        }

        let bank = &self.fbank;
        let features: Vec<(usize, Array2<f32>)> = windows
            .iter()
            .map(|&k| {
                let (start, end) = window_bounds(k, audio.duration());
                (k, bank.compute(audio.slice(start, end)))
            })
            .filter(|(_, f)| f.nrows() > 0)
            .collect();

        let mut indices = Vec::with_capacity(features.len());
        let mut embeddings = Vec::with_capacity(features.len());
        let mut batch: Vec<Array2<f32>> = Vec::with_capacity(EMBEDDING_BATCH_SIZE);
        for (k, f) in features {
            let same_shape = batch.first().map_or(true, |b| b.nrows() == f.nrows());
            if !same_shape || batch.len() == EMBEDDING_BATCH_SIZE {
                embeddings.extend(
                    self.embed_batch(&batch)
                        .map_err(|e| InferenceError::invocation_failure(STAGE, e))?,
                );
                batch.clear();
            }
            indices.push(k);
            batch.push(f);
        }
        if !batch.is_empty() {
            embeddings.extend(
                self.embed_batch(&batch)
                    .map_err(|e| InferenceError::invocation_failure(STAGE, e))?,
            );
        }
        if embeddings.len() != indices.len() {
            return Err(InferenceError::invocation_failure(
                STAGE,
                format!(
                    "model returned {} embeddings for {} windows",
                    embeddings.len(),
                    indices.len()
                ),
            ));
        }

        let labels = cluster_embeddings(&embeddings, speakers, SPEAKER_SIMILARITY_THRESHOLD);
        let owned: Vec<(usize, usize)> = indices.into_iter().zip(labels).collect();
        let intervals = build_intervals(&owned, audio.duration());
        log::debug!(
            "Clustered {} windows into {} speakers",
            owned.len(),
            owned.iter().map(|(_, l)| l + 1).max().unwrap_or(0)
        );
        Ok(intervals)
    }
}

fn window_bounds(k: usize, duration: f64) -> (f64, f64) {
    let start = k as f64 * DIARIZATION_HOP_SECONDS;
    (start, (start + DIARIZATION_WINDOW_SECONDS).min(duration))
}

/// Indices of windows loud enough to contain speech.
fn speech_windows(audio: &AudioSample) -> Vec<usize> {
    let duration = audio.duration();
    let count = (duration / DIARIZATION_HOP_SECONDS).ceil() as usize;
    (0..count)
        .filter(|&k| {
            let (start, end) = window_bounds(k, duration);
            rms(audio.slice(start, end)) >= DIARIZATION_SILENCE_RMS
        })
        .collect()
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Turn `(window index, speaker)` pairs into speaker turns.
///
/// Window `k` owns the hop-sized stretch starting at `k * hop`; adjacent
/// windows with the same speaker are joined.
fn build_intervals(windows: &[(usize, usize)], duration: f64) -> Vec<DiarizationInterval> {
    let mut intervals: Vec<DiarizationInterval> = Vec::new();
    let mut last_window: Option<usize> = None;
    for &(k, label) in windows {
        let start = k as f64 * DIARIZATION_HOP_SECONDS;
        let end = ((k + 1) as f64 * DIARIZATION_HOP_SECONDS).min(duration);
        let speaker = speaker_label(label);
        let contiguous = last_window.is_some_and(|prev| prev + 1 == k);
        match intervals.last_mut() {
            Some(prev) if contiguous && prev.speaker == speaker => prev.end = end,
            _ => intervals.push(DiarizationInterval {
                start,
                end,
                speaker,
            }),
        }
        last_window = Some(k);
    }
    intervals
}

fn speaker_label(index: usize) -> String {
    format!("SPEAKER_{index:02}")
}

use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::DeviceSelection;
use crate::inference::domain::inference_error::{InferenceError, InferenceStage};
use crate::inference::domain::model_size::ModelSize;
use crate::inference::domain::segments::{Recognition, RecognizedSegment};
use crate::inference::domain::speech_recognizer::{LoadedRecognizer, SpeechRecognizer};
use crate::shared::constants::{RESTRICTED_LANGUAGE, WHISPER_MODEL_URL_BASE};
use crate::shared::model_resolver::{self, ModelRequest};

const STAGE: InferenceStage = InferenceStage::Recognition;

/// Candidates decoded per window; whisper.cpp's greedy "best of".
const DECODE_BEST_OF: i32 = 5;

const MAX_THREADS: usize = 8;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// Models are ggml files resolved by size from the cache, a models
/// directory, or the whisper.cpp model mirror.
#[derive(Debug, Default)]
pub struct WhisperRecognizer {
    models_dir: Option<PathBuf>,
    mirror: Option<String>,
}

impl WhisperRecognizer {
    pub fn new(models_dir: Option<&Path>, mirror: Option<&str>) -> Self {
        Self {
            models_dir: models_dir.map(Path::to_path_buf),
            mirror: mirror.map(|m| m.trim_end_matches('/').to_string()),
        }
    }

    fn resolve_model(&self, filename: &str) -> Result<PathBuf, InferenceError> {
        let base = self.mirror.as_deref().unwrap_or(WHISPER_MODEL_URL_BASE);
        let url = format!("{base}/{filename}");
        let request = ModelRequest::new(filename)
            .with_url(Some(&url))
            .with_bundled_dir(self.models_dir.as_deref());
        model_resolver::resolve(&request)
            .map_err(|e| InferenceError::ModelUnavailable {
                stage: STAGE,
                detail: e.to_string(),
            })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn load(
        &self,
        model: ModelSize,
        language: Option<&str>,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedRecognizer>, InferenceError> {
        let english_only = language == Some(RESTRICTED_LANGUAGE);
        let filename = model.ggml_filename(english_only);
        let model_path = self.resolve_model(&filename)?;
        let path_str = model_path.to_str().ok_or_else(|| InferenceError::ModelUnavailable {
            stage: STAGE,
            detail: format!("invalid model path: {}", model_path.display()),
        })?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu = selection.is_accelerator();

        log::info!("Loading {filename} on {selection}");
        let ctx = WhisperContext::new_with_params(path_str, params)
            .map_err(|e| InferenceError::load_failure(STAGE, format!("{filename}: {e}")))?;

        Ok(Box::new(LoadedWhisper {
            ctx,
            language: language.map(str::to_string),
        }))
    }
}

struct LoadedWhisper {
    ctx: WhisperContext,
    language: Option<String>,
}

impl LoadedRecognizer for LoadedWhisper {
    fn recognize(&mut self, audio: &AudioSample) -> Result<Recognition, InferenceError> {
        if audio.is_empty() {
            return Err(InferenceError::InvalidAudio {
                stage: STAGE,
                detail: "audio contains no samples".to_string(),
            });
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| InferenceError::load_failure(STAGE, e))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy {
            best_of: DECODE_BEST_OF,
        });
        params.set_language(Some(self.language.as_deref().unwrap_or("auto")));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(MAX_THREADS) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| InferenceError::invocation_failure(STAGE, e))?;

        let language = match &self.language {
            Some(l) => l.clone(),
            None => Some(state.full_lang_id_from_state())
                .and_then(whisper_rs::get_lang_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    log::warn!("Language detection failed, assuming '{RESTRICTED_LANGUAGE}'");
                    RESTRICTED_LANGUAGE.to_string()
                }),
        };

        let mut segments = Vec::new();
        let num_segments = state.full_n_segments();

        for seg_idx in 0..num_segments {
            let segment = match state.get_segment(seg_idx) {
                Some(s) => s,
                None => continue,
            };

            let text = match segment.to_str() {
                Ok(t) => t.to_string(),
                Err(e) => {
                    log::warn!("Skipping segment {seg_idx} with undecodable text: {e}");
                    continue;
                }
            };
            if text.trim().is_empty() {
                continue;
            }

            // Segment timestamps are in centiseconds (10ms units)
            let start = segment.start_timestamp() as f64 / 100.0;
            let end = segment.end_timestamp() as f64 / 100.0;

            segments.push(RecognizedSegment {
                start,
                end: end.max(start),
                text,
                language: language.clone(),
            });
        }

        Ok(Recognition { segments, language })
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

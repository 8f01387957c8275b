use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Axis, Ix3};

use crate::audio::domain::audio_sample::AudioSample;
use crate::device::domain::device_selection::{DeviceSelection, Precision};
use crate::inference::domain::inference_error::{InferenceError, InferenceStage};
use crate::inference::domain::segments::{AlignedSegment, RecognizedSegment, WordTiming};
use crate::inference::domain::speech_aligner::{LoadedAligner, SpeechAligner};
use crate::shared::constants::{
    ALIGNMENT_MODEL_FILENAME, ALIGNMENT_MODEL_FP16_FILENAME, ALIGNMENT_VOCAB_FILENAME,
};
use crate::shared::model_resolver::{self, ModelRequest, ModelResolveError};

use super::alignment_catalog::{alignment_model, AlignmentModel, WordSplit};
use super::ctc::{force_align, log_softmax, TokenSpan};
use super::onnx_session::build_session;

const STAGE: InferenceStage = InferenceStage::Alignment;

/// Shortest input the wav2vec2 feature encoder accepts (25ms at 16kHz).
const MIN_INPUT_SAMPLES: usize = 400;

const WORD_DELIMITER: char = '|';
const BLANK_TOKENS: &[&str] = &["<pad>", "[pad]"];

/// Forced aligner running wav2vec2-style CTC models exported to ONNX.
///
/// Each catalog language has `model.onnx` (optionally `model_fp16.onnx`)
/// and a `vocab.json` mapping characters to output indices. Languages
/// outside the catalog, and catalog languages whose model is neither
/// installed nor downloadable, pass segments through with their
/// recognition timing.
#[derive(Debug, Default)]
pub struct CtcAligner {
    models_dir: Option<PathBuf>,
    mirror: Option<String>,
    cache_dir: Option<PathBuf>,
}

impl CtcAligner {
    pub fn new(models_dir: Option<&Path>, mirror: Option<&str>) -> Self {
        Self {
            models_dir: models_dir.map(Path::to_path_buf),
            mirror: mirror.map(|m| m.trim_end_matches('/').to_string()),
            cache_dir: None,
        }
    }

    /// Look for cached models under `dir` instead of the user cache.
    pub fn with_cache_dir(mut self, dir: &Path) -> Self {
        self.cache_dir = Some(dir.to_path_buf());
        self
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, ModelResolveError> {
        let url = self.mirror.as_ref().map(|base| format!("{base}/{name}"));
        let request = ModelRequest::new(name)
            .with_url(url.as_deref())
            .with_bundled_dir(self.models_dir.as_deref());
        match &self.cache_dir {
            Some(dir) => model_resolver::resolve_in(dir, &request),
            None => model_resolver::resolve(&request),
        }
    }

    fn resolve_model(
        &self,
        model: &AlignmentModel,
        precision: Precision,
    ) -> Result<PathBuf, ModelResolveError> {
        if precision == Precision::Reduced {
            match self.resolve(&model.file_name(ALIGNMENT_MODEL_FP16_FILENAME)) {
                Ok(path) => return Ok(path),
                Err(e) => log::debug!("No float16 alignment model for {}: {e}", model.language),
            }
        }
        self.resolve(&model.file_name(ALIGNMENT_MODEL_FILENAME))
    }
}

fn unavailable(e: ModelResolveError) -> InferenceError {
    InferenceError::ModelUnavailable {
        stage: STAGE,
        detail: e.to_string(),
    }
}

impl SpeechAligner for CtcAligner {
    fn load(
        &self,
        language: &str,
        selection: DeviceSelection,
    ) -> Result<Box<dyn LoadedAligner>, InferenceError> {
        let Some(model) = alignment_model(language) else {
            log::warn!("No alignment model for language '{language}', keeping segment timing");
            return Ok(Box::new(PassthroughAligner));
        };

        let resolved = self
            .resolve_model(model, selection.precision)
            .and_then(|m| Ok((m, self.resolve(&model.file_name(ALIGNMENT_VOCAB_FILENAME))?)));
        let (model_path, vocab_path) = match resolved {
            Ok(paths) => paths,
            // Only raised when there is nowhere to download from
            Err(ModelResolveError::NotFound(name)) => {
                log::warn!(
                    "Alignment model {name} is not installed and no mirror is set, keeping segment timing"
                );
                return Ok(Box::new(PassthroughAligner));
            }
            Err(e) => return Err(unavailable(e)),
        };

        let vocab_json = std::fs::read_to_string(&vocab_path)
            .map_err(|e| InferenceError::load_failure(STAGE, format!("{}: {e}", vocab_path.display())))?;
        let vocab = Vocabulary::parse(&vocab_json)
            .map_err(|e| InferenceError::load_failure(STAGE, format!("{}: {e}", vocab_path.display())))?;

        log::info!(
            "Loading alignment model for '{}' ({}) on {selection}",
            model.language,
            model.checkpoint
        );
        let session =
            build_session(&model_path, selection).map_err(|e| InferenceError::load_failure(STAGE, e))?;

        Ok(Box::new(LoadedCtcAligner {
            session,
            vocab,
            word_split: model.word_split,
        }))
    }
}

/// Character vocabulary of a CTC model.
#[derive(Debug)]
struct Vocabulary {
    tokens: HashMap<char, usize>,
    blank: usize,
    delimiter: Option<usize>,
}

impl Vocabulary {
    /// Largest output index the vocabulary refers to.
    fn max_id(&self) -> usize {
        self.tokens.values().copied().fold(self.blank, usize::max)
    }

    /// Reject a vocabulary that names outputs the model does not have.
    fn check_width(&self, width: usize) -> Result<(), InferenceError> {
        let max_id = self.max_id();
        if max_id >= width {
            return Err(InferenceError::ModelUnavailable {
                stage: STAGE,
                detail: format!(
                    "vocabulary refers to output {max_id} but the model has {width} outputs"
                ),
            });
        }
        Ok(())
    }

    fn parse(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let raw: HashMap<String, usize> = serde_json::from_str(json)?;
        if raw.is_empty() {
            return Err("vocabulary is empty".into());
        }

        let mut tokens = HashMap::new();
        let mut blank = None;
        for (key, id) in &raw {
            let key = key.to_lowercase();
            if BLANK_TOKENS.contains(&key.as_str()) {
                blank = Some(*id);
                continue;
            }
            let mut chars = key.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                tokens.insert(c, *id);
            }
        }
        let delimiter = tokens.get(&WORD_DELIMITER).copied();
        Ok(Self {
            tokens,
            blank: blank.unwrap_or(0),
            delimiter,
        })
    }

    /// Token ids for `words`, each paired with the index of the word it
    /// spells (None for delimiters). Characters outside the vocabulary
    /// are skipped.
    fn encode(&self, words: &[String], split: WordSplit) -> (Vec<usize>, Vec<Option<usize>>) {
        let mut ids = Vec::new();
        let mut owners = Vec::new();
        for (w, word) in words.iter().enumerate() {
            if w > 0 && split == WordSplit::Whitespace {
                if let Some(delimiter) = self.delimiter {
                    ids.push(delimiter);
                    owners.push(None);
                }
            }
            for c in word.chars().flat_map(char::to_lowercase) {
                if let Some(&id) = self.tokens.get(&c) {
                    ids.push(id);
                    owners.push(Some(w));
                }
            }
        }
        (ids, owners)
    }
}

fn split_words(text: &str, split: WordSplit) -> Vec<String> {
    match split {
        WordSplit::Whitespace => text.split_whitespace().map(str::to_string).collect(),
        WordSplit::Character => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect(),
    }
}

/// Zero-mean, unit-variance waveform padded to the model's minimum length.
fn prepare_waveform(samples: &[f32]) -> Vec<f32> {
    let n = samples.len().max(1) as f32;
    let mean = samples.iter().sum::<f32>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
    let scale = 1.0 / (variance + 1e-7).sqrt();
    let mut out: Vec<f32> = samples.iter().map(|s| (s - mean) * scale).collect();
    if out.len() < MIN_INPUT_SAMPLES {
        out.resize(MIN_INPUT_SAMPLES, 0.0);
    }
    out
}

/// Collect token spans into per-word timings, in seconds from `offset`.
fn word_timings(
    words: &[String],
    owners: &[Option<usize>],
    spans: &[TokenSpan],
    seconds_per_frame: f64,
    offset: f64,
) -> Vec<WordTiming> {
    let mut bounds: Vec<Option<(usize, usize, f32, usize)>> = vec![None; words.len()];
    for span in spans {
        let Some(w) = owners[span.token_index] else {
            continue;
        };
        bounds[w] = Some(match bounds[w] {
            None => (span.start_frame, span.end_frame, span.score, 1),
            Some((s, e, score, count)) => (
                s.min(span.start_frame),
                e.max(span.end_frame),
                score + span.score,
                count + 1,
            ),
        });
    }

    words
        .iter()
        .zip(bounds)
        .filter_map(|(word, bound)| {
            let (start, end, score, count) = bound?;
            Some(WordTiming {
                word: word.clone(),
                start: offset + start as f64 * seconds_per_frame,
                end: offset + end as f64 * seconds_per_frame,
                score: score / count as f32,
            })
        })
        .collect()
}

struct LoadedCtcAligner {
    session: ort::session::Session,
    vocab: Vocabulary,
    word_split: WordSplit,
}

impl LoadedCtcAligner {
    fn emissions(&mut self, waveform: Vec<f32>) -> Result<Array2<f32>, Box<dyn std::error::Error>> {
        let len = waveform.len();
        let input = Array2::from_shape_vec((1, len), waveform)?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.into_dimensionality::<Ix3>()?;
        Ok(log_softmax(logits.index_axis(Axis(0), 0)))
    }

    fn align_segment(
        &mut self,
        segment: &RecognizedSegment,
        audio: &AudioSample,
    ) -> Result<Option<AlignedSegment>, InferenceError> {
        let words = split_words(&segment.text, self.word_split);
        let (tokens, owners) = self.vocab.encode(&words, self.word_split);
        if owners.iter().all(Option::is_none) {
            return Ok(None);
        }

        let slice = audio.slice(segment.start, segment.end);
        if slice.is_empty() {
            return Ok(None);
        }
        let waveform = prepare_waveform(slice);
        let input_seconds = waveform.len() as f64 / audio.sample_rate() as f64;

        let emissions = self
            .emissions(waveform)
            .map_err(|e| InferenceError::invocation_failure(STAGE, e))?;
        if emissions.nrows() == 0 {
            return Ok(None);
        }
        self.vocab.check_width(emissions.ncols())?;
        let Some(spans) = force_align(emissions.view(), &tokens, self.vocab.blank) else {
            return Ok(None);
        };

        let seconds_per_frame = input_seconds / emissions.nrows() as f64;
        let timed = word_timings(&words, &owners, &spans, seconds_per_frame, segment.start);
        let (Some(first), Some(last)) = (timed.first(), timed.last()) else {
            return Ok(None);
        };

        Ok(Some(AlignedSegment {
            start: first.start,
            end: last.end.min(segment.end).max(first.start),
            text: segment.text.clone(),
            language: segment.language.clone(),
            words: timed,
        }))
    }
}

impl LoadedAligner for LoadedCtcAligner {
    fn align(
        &mut self,
        segments: Vec<RecognizedSegment>,
        audio: &AudioSample,
    ) -> Result<Vec<AlignedSegment>, InferenceError> {
        let mut aligned = Vec::with_capacity(segments.len());
        let mut fallbacks = 0usize;
        for segment in segments {
            match self.align_segment(&segment, audio)? {
                Some(a) => aligned.push(a),
                None => {
                    fallbacks += 1;
                    aligned.push(AlignedSegment::unaligned(segment));
                }
            }
        }
        if fallbacks > 0 {
            log::warn!("{fallbacks} segments kept recognition timing (alignment failed)");
        }
        Ok(aligned)
    }
}

/// Aligner for languages without a model; keeps recognition timing.
struct PassthroughAligner;

impl LoadedAligner for PassthroughAligner {
    fn align(
        &mut self,
        segments: Vec<RecognizedSegment>,
        _audio: &AudioSample,
    ) -> Result<Vec<AlignedSegment>, InferenceError> {
        Ok(segments.into_iter().map(AlignedSegment::unaligned).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VOCAB: &str = r#"{"<pad>": 0, "<s>": 1, "</s>": 2, "<unk>": 3, "|": 4, "E": 5, "T": 6, "A": 7, "H": 8, "I": 9}"#;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vocab_parse_finds_blank_and_delimiter() {
        let vocab = Vocabulary::parse(VOCAB).unwrap();
        assert_eq!(vocab.blank, 0);
        assert_eq!(vocab.delimiter, Some(4));
        assert_eq!(vocab.tokens.get(&'e'), Some(&5));
        assert!(!vocab.tokens.contains_key(&'<'));
    }

    #[test]
    fn test_vocab_without_pad_uses_zero() {
        let vocab = Vocabulary::parse(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(vocab.blank, 0);
        assert_eq!(vocab.delimiter, None);
    }

    #[test]
    fn test_empty_vocab_rejected() {
        assert!(Vocabulary::parse("{}").is_err());
        assert!(Vocabulary::parse("not json").is_err());
    }

    #[test]
    fn test_encode_inserts_delimiters_and_skips_unknown() {
        let vocab = Vocabulary::parse(VOCAB).unwrap();
        let (ids, owners) = vocab.encode(&words(&["Hi", "t3a"]), WordSplit::Whitespace);
        assert_eq!(ids, vec![8, 9, 4, 6, 7]);
        assert_eq!(owners, vec![Some(0), Some(0), None, Some(1), Some(1)]);
    }

    #[test]
    fn test_encode_character_split_has_no_delimiters() {
        let vocab = Vocabulary::parse(VOCAB).unwrap();
        let (ids, owners) = vocab.encode(&words(&["h", "i"]), WordSplit::Character);
        assert_eq!(ids, vec![8, 9]);
        assert_eq!(owners, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words(" hi  there ", WordSplit::Whitespace), words(&["hi", "there"]));
        assert_eq!(split_words("你 好", WordSplit::Character), words(&["你", "好"]));
    }

    #[test]
    fn test_prepare_waveform_normalizes_and_pads() {
        let samples: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 0.5 } else { 0.1 }).collect();
        let out = prepare_waveform(&samples);
        assert_eq!(out.len(), MIN_INPUT_SAMPLES);
        let mean = out[..200].iter().sum::<f32>() / 200.0;
        let variance = out[..200].iter().map(|s| (s - mean).powi(2)).sum::<f32>() / 200.0;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-5);
        assert_relative_eq!(variance, 1.0, epsilon = 1e-3);
        assert!(out[200..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_word_timings_from_spans() {
        let words = words(&["hi", "at"]);
        let owners = vec![Some(0), Some(0), None, Some(1), Some(1)];
        let span = |token_index, start_frame, end_frame, score| TokenSpan {
            token_index,
            start_frame,
            end_frame,
            score,
        };
        let spans = vec![
            span(0, 2, 3, 0.8),
            span(1, 4, 5, 0.6),
            span(2, 6, 7, 0.9),
            span(3, 10, 11, 1.0),
            span(4, 12, 14, 0.5),
        ];
        let timed = word_timings(&words, &owners, &spans, 0.02, 10.0);
        assert_eq!(timed.len(), 2);
        assert_eq!(timed[0].word, "hi");
        assert_relative_eq!(timed[0].start, 10.04, epsilon = 1e-9);
        assert_relative_eq!(timed[0].end, 10.10, epsilon = 1e-9);
        assert_relative_eq!(timed[0].score, 0.7, epsilon = 1e-6);
        assert_relative_eq!(timed[1].start, 10.20, epsilon = 1e-9);
        assert_relative_eq!(timed[1].end, 10.28, epsilon = 1e-9);
    }

    #[test]
    fn test_untimed_words_are_dropped() {
        let words = words(&["hi", "42"]);
        let owners = vec![Some(0)];
        let spans = vec![TokenSpan {
            token_index: 0,
            start_frame: 0,
            end_frame: 1,
            score: 1.0,
        }];
        let timed = word_timings(&words, &owners, &spans, 0.02, 0.0);
        assert_eq!(timed.len(), 1);
        assert_eq!(timed[0].word, "hi");
    }

    #[test]
    fn test_unsupported_language_passes_segments_through() {
        let aligner = CtcAligner::default();
        let mut loaded = aligner.load("xx", DeviceSelection::HOST).unwrap();
        let segment = RecognizedSegment {
            start: 1.0,
            end: 2.0,
            text: " hello".into(),
            language: "xx".into(),
        };
        let audio = AudioSample::new(vec![0.0; 48000], 16000);
        let aligned = loaded.align(vec![segment.clone()], &audio).unwrap();
        assert_eq!(aligned, vec![AlignedSegment::unaligned(segment)]);
    }

    #[test]
    fn test_missing_catalog_model_without_mirror_passes_through() {
        let cache = tempfile::tempdir().unwrap();
        let models = tempfile::tempdir().unwrap();
        let aligner = CtcAligner::new(Some(models.path()), None).with_cache_dir(cache.path());
        let mut loaded = aligner.load("en", DeviceSelection::HOST).unwrap();
        let segment = RecognizedSegment {
            start: 0.5,
            end: 1.5,
            text: " hello there".into(),
            language: "en".into(),
        };
        let audio = AudioSample::new(vec![0.0; 32000], 16000);
        let aligned = loaded.align(vec![segment.clone()], &audio).unwrap();
        assert_eq!(aligned, vec![AlignedSegment::unaligned(segment)]);
    }

    #[test]
    fn test_missing_vocab_without_mirror_passes_through() {
        let cache = tempfile::tempdir().unwrap();
        let dir = cache.path().join("alignment").join("en");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ALIGNMENT_MODEL_FILENAME), b"not a model").unwrap();
        let aligner = CtcAligner::default().with_cache_dir(cache.path());
        assert!(aligner.load("en", DeviceSelection::HOST).is_ok());
    }

    #[test]
    fn test_unreachable_mirror_is_model_unavailable() {
        let cache = tempfile::tempdir().unwrap();
        let aligner = CtcAligner::new(None, Some("http://invalid.nonexistent.example.com"))
            .with_cache_dir(cache.path());
        let err = aligner.load("en", DeviceSelection::HOST).err().unwrap();
        assert!(matches!(err, InferenceError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_vocab_wider_than_model_output_is_rejected() {
        let vocab = Vocabulary::parse(VOCAB).unwrap();
        assert_eq!(vocab.max_id(), 9);
        assert!(vocab.check_width(10).is_ok());
        let err = vocab.check_width(8).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("output 9"));
    }

    #[test]
    #[ignore] // Requires alignment model files
    fn test_aligns_english_segment() {
        let aligner = CtcAligner::default();
        let mut loaded = aligner.load("en", DeviceSelection::HOST).unwrap();
        let segment = RecognizedSegment {
            start: 0.0,
            end: 2.0,
            text: " hello there".into(),
            language: "en".into(),
        };
        let audio = AudioSample::new(vec![0.0; 32000], 16000);
        let aligned = loaded.align(vec![segment], &audio).unwrap();
        assert_eq!(aligned.len(), 1);
    }
}

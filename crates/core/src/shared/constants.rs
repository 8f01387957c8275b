/// Sample rate every model stage expects its input audio in.
pub const MODEL_SAMPLE_RATE: u32 = 16000;

/// Minimum free accelerator memory (GiB) required to run on the accelerator.
pub const MIN_ACCELERATOR_FREE_GIB: f64 = 5.0;

pub const WHISPER_MODEL_URL_BASE: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Language forced on the recognizer when the language restriction is on.
pub const RESTRICTED_LANGUAGE: &str = "en";

pub const ALIGNMENT_MODEL_FILENAME: &str = "model.onnx";
pub const ALIGNMENT_MODEL_FP16_FILENAME: &str = "model_fp16.onnx";
pub const ALIGNMENT_VOCAB_FILENAME: &str = "vocab.json";

pub const DIARIZATION_MODEL_NAME: &str = "speaker-embedding.onnx";
pub const DIARIZATION_MODEL_FP16_NAME: &str = "speaker-embedding_fp16.onnx";
pub const DIARIZATION_MODEL_URL_BASE: &str =
    "https://huggingface.co/pyannote/wespeaker-voxceleb-resnet34-LM/resolve/main";

/// Sliding window used to embed speech for diarization.
pub const DIARIZATION_WINDOW_SECONDS: f64 = 1.5;
pub const DIARIZATION_HOP_SECONDS: f64 = 0.75;

/// Windows quieter than this RMS level are treated as non-speech.
pub const DIARIZATION_SILENCE_RMS: f32 = 0.01;

/// Number of windows embedded per model invocation.
pub const EMBEDDING_BATCH_SIZE: usize = 16;

/// Cosine similarity above which two speaker clusters are merged.
pub const SPEAKER_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Label used for segments rendered without a resolved speaker.
pub const UNKNOWN_SPEAKER_LABEL: &str = "UNKNOWN";

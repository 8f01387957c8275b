pub mod diarization_credential;
pub mod inference_error;
pub mod model_scope;
pub mod model_size;
pub mod segments;
pub mod speaker_diarizer;
pub mod speaker_range;
pub mod speech_aligner;
pub mod speech_recognizer;

pub mod alignment_catalog;
mod ctc;
pub mod ctc_aligner;
mod fbank;
mod onnx_session;
pub mod onnx_diarizer;
pub mod speaker_clustering;
pub mod whisper_recognizer;

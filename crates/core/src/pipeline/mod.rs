pub mod pipeline_error;
pub mod pipeline_logger;
pub mod transcribe_use_case;
pub mod transcription_request;

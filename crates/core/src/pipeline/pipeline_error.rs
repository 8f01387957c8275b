use std::fmt;

use thiserror::Error;

use crate::inference::domain::inference_error::InferenceError;
use crate::render::domain::cue_renderer::RenderError;

/// Message shown to users for any failed run.
pub const USER_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Failure class of a run, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    InvalidAudio,
    OutOfMemory,
    ModelUnavailable,
    EmptyResult,
    Render,
    Output,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::InvalidAudio => "invalid-audio",
            FailureKind::OutOfMemory => "out-of-memory",
            FailureKind::ModelUnavailable => "model-unavailable",
            FailureKind::EmptyResult => "empty-result",
            FailureKind::Render => "render",
            FailureKind::Output => "output",
        })
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid audio: {0}")]
    InvalidAudio(String),
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("recognition produced no segments")]
    EmptyResult,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write transcript: {0}")]
    Output(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::InvalidAudio(_) => FailureKind::InvalidAudio,
            PipelineError::OutOfMemory(_) => FailureKind::OutOfMemory,
            PipelineError::ModelUnavailable(_) => FailureKind::ModelUnavailable,
            PipelineError::EmptyResult => FailureKind::EmptyResult,
            PipelineError::Render(_) => FailureKind::Render,
            PipelineError::Output(_) => FailureKind::Output,
        }
    }

    /// Generic text for the user; details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        USER_FAILURE_MESSAGE
    }
}

impl From<InferenceError> for PipelineError {
    fn from(e: InferenceError) -> Self {
        let detail = e.to_string();
        match e {
            InferenceError::InvalidAudio { .. } => PipelineError::InvalidAudio(detail),
            InferenceError::OutOfMemory { .. } => PipelineError::OutOfMemory(detail),
            InferenceError::ModelUnavailable { .. } => PipelineError::ModelUnavailable(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::domain::inference_error::InferenceStage;
    use crate::shared::time_format::TimeFormatError;

    #[test]
    fn test_inference_errors_keep_their_class() {
        let oom: PipelineError =
            InferenceError::invocation_failure(InferenceStage::Diarization, "out of memory").into();
        assert_eq!(oom.kind(), FailureKind::OutOfMemory);

        let missing: PipelineError =
            InferenceError::load_failure(InferenceStage::Alignment, "no such file").into();
        assert_eq!(missing.kind(), FailureKind::ModelUnavailable);
        assert!(missing.to_string().contains("alignment"));

        let bad: PipelineError =
            InferenceError::invocation_failure(InferenceStage::Recognition, "bad input").into();
        assert_eq!(bad.kind(), FailureKind::InvalidAudio);
    }

    #[test]
    fn test_render_error_converts() {
        let err: PipelineError = RenderError::Timestamp {
            segment: 0,
            source: TimeFormatError::NotFinite,
        }
        .into();
        assert_eq!(err.kind(), FailureKind::Render);
    }

    #[test]
    fn test_user_message_is_generic() {
        for err in [
            PipelineError::EmptyResult,
            PipelineError::Output("disk full".into()),
            PipelineError::OutOfMemory("cuda".into()),
        ] {
            assert_eq!(err.user_message(), USER_FAILURE_MESSAGE);
            assert!(!err.user_message().contains("cuda"));
        }
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::OutOfMemory.to_string(), "out-of-memory");
    }
}

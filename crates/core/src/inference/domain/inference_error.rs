use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InferenceStage {
    Recognition,
    Alignment,
    Diarization,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InferenceStage::Recognition => "recognition",
            InferenceStage::Alignment => "alignment",
            InferenceStage::Diarization => "diarization",
        })
    }
}

/// Whole-model failure of one inference stage.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("{stage} rejected the audio: {detail}")]
    InvalidAudio {
        stage: InferenceStage,
        detail: String,
    },
    #[error("{stage} ran out of memory: {detail}")]
    OutOfMemory {
        stage: InferenceStage,
        detail: String,
    },
    #[error("{stage} model unavailable: {detail}")]
    ModelUnavailable {
        stage: InferenceStage,
        detail: String,
    },
}

impl InferenceError {
    /// Classify a failure raised while loading a model.
    pub fn load_failure(stage: InferenceStage, detail: impl fmt::Display) -> Self {
        let detail = detail.to_string();
        if is_out_of_memory(&detail) {
            InferenceError::OutOfMemory { stage, detail }
        } else {
            InferenceError::ModelUnavailable { stage, detail }
        }
    }

    /// Classify a failure raised while running a loaded model.
    pub fn invocation_failure(stage: InferenceStage, detail: impl fmt::Display) -> Self {
        let detail = detail.to_string();
        if is_out_of_memory(&detail) {
            InferenceError::OutOfMemory { stage, detail }
        } else {
            InferenceError::InvalidAudio { stage, detail }
        }
    }

    pub fn stage(&self) -> InferenceStage {
        match self {
            InferenceError::InvalidAudio { stage, .. }
            | InferenceError::OutOfMemory { stage, .. }
            | InferenceError::ModelUnavailable { stage, .. } => *stage,
        }
    }
}

const OUT_OF_MEMORY_MARKERS: &[&str] = &[
    "out of memory",
    "out_of_memory",
    "outofmemory",
    "failed to allocate",
    "bad_alloc",
    "cudaerrormemoryallocation",
];

fn is_out_of_memory(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    OUT_OF_MEMORY_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::cuda("CUDA error: out of memory")]
    #[case::cuda_code("CUDA_ERROR_OUT_OF_MEMORY")]
    #[case::ort("Failed to allocate memory for requested buffer of size 4294967296")]
    #[case::cpp("std::bad_alloc")]
    fn test_out_of_memory_detected(#[case] detail: &str) {
        let err = InferenceError::load_failure(InferenceStage::Alignment, detail);
        assert!(matches!(err, InferenceError::OutOfMemory { .. }));
        let err = InferenceError::invocation_failure(InferenceStage::Alignment, detail);
        assert!(matches!(err, InferenceError::OutOfMemory { .. }));
    }

    #[test]
    fn test_other_load_failure_is_model_unavailable() {
        let err = InferenceError::load_failure(InferenceStage::Diarization, "401 Unauthorized");
        assert!(matches!(err, InferenceError::ModelUnavailable { .. }));
        assert_eq!(err.stage(), InferenceStage::Diarization);
    }

    #[test]
    fn test_other_invocation_failure_is_invalid_audio() {
        let err = InferenceError::invocation_failure(InferenceStage::Recognition, "input too short");
        assert!(matches!(err, InferenceError::InvalidAudio { .. }));
    }

    #[test]
    fn test_display_names_stage() {
        let err = InferenceError::load_failure(InferenceStage::Recognition, "missing file");
        assert_eq!(
            err.to_string(),
            "recognition model unavailable: missing file"
        );
    }
}

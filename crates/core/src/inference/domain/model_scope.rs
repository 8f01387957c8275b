use std::ops::{Deref, DerefMut};
use std::time::Instant;

use super::inference_error::{InferenceError, InferenceStage};

/// Holds a loaded model for the duration of one stage.
///
/// The model is freed when the scope drops, on success and on every error
/// path alike, so at most one stage's model is resident at a time.
pub struct ModelScope<M: ?Sized> {
    stage: InferenceStage,
    model: Box<M>,
    loaded_at: Instant,
}

impl<M: ?Sized> ModelScope<M> {
    pub fn acquire<F>(stage: InferenceStage, load: F) -> Result<Self, InferenceError>
    where
        F: FnOnce() -> Result<Box<M>, InferenceError>,
    {
        let started = Instant::now();
        let model = load()?;
        log::info!(
            "Loaded {stage} model in {:.1}s",
            started.elapsed().as_secs_f64()
        );
        Ok(Self {
            stage,
            model,
            loaded_at: Instant::now(),
        })
    }

    pub fn stage(&self) -> InferenceStage {
        self.stage
    }
}

impl<M: ?Sized> Deref for ModelScope<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

impl<M: ?Sized> DerefMut for ModelScope<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.model
    }
}

impl<M: ?Sized> Drop for ModelScope<M> {
    fn drop(&mut self) {
        log::info!(
            "Releasing {} model after {:.1}s in use",
            self.stage,
            self.loaded_at.elapsed().as_secs_f64()
        );
    }
}

/// Decoded mono waveform: PCM samples normalized to [-1.0, 1.0].
///
/// Immutable once decoded. Model stages borrow it; only the pipeline owns it.
#[derive(Clone, Debug)]
pub struct AudioSample {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSample {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn sample_index_at_time(&self, time: f64) -> usize {
        ((time.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len())
    }

    /// Samples between two offsets in seconds, clamped to the buffer.
    pub fn slice(&self, start: f64, end: f64) -> &[f32] {
        let from = self.sample_index_at_time(start);
        let to = self.sample_index_at_time(end).max(from);
        &self.samples[from..to]
    }
}

use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

pub(crate) const NUM_MEL_BINS: usize = 80;

const FRAME_LENGTH: usize = 400; // 25ms at 16kHz
const FRAME_SHIFT: usize = 160; // 10ms at 16kHz
const FFT_SIZE: usize = 512;
const PREEMPHASIS: f32 = 0.97;
const LOW_FREQ: f32 = 20.0;
/// Waveforms are scaled to 16-bit range before feature extraction.
const PCM_SCALE: f32 = 32768.0;

/// Kaldi-style log-mel filterbank features for speaker embedding models.
pub(crate) struct FilterBank {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    mel_banks: Vec<Vec<(usize, f32)>>,
}

impl FilterBank {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let window = (0..FRAME_LENGTH)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (FRAME_LENGTH - 1) as f32).cos())
            .collect();
        Self {
            fft,
            window,
            mel_banks: mel_banks(sample_rate as f32),
        }
    }

    pub fn num_frames(num_samples: usize) -> usize {
        if num_samples < FRAME_LENGTH {
            0
        } else {
            (num_samples - FRAME_LENGTH) / FRAME_SHIFT + 1
        }
    }

    /// `[frames, NUM_MEL_BINS]` features with per-bin mean removed.
    pub fn compute(&self, samples: &[f32]) -> Array2<f32> {
        let frames = Self::num_frames(samples.len());
        let mut features = Array2::<f32>::zeros((frames, NUM_MEL_BINS));
        let mut frame = vec![0.0f32; FRAME_LENGTH];
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];

        for f in 0..frames {
            let start = f * FRAME_SHIFT;
            for (dst, &s) in frame.iter_mut().zip(&samples[start..start + FRAME_LENGTH]) {
                *dst = s * PCM_SCALE;
            }

            let mean = frame.iter().sum::<f32>() / FRAME_LENGTH as f32;
            frame.iter_mut().for_each(|s| *s -= mean);

            for i in (1..FRAME_LENGTH).rev() {
                frame[i] -= PREEMPHASIS * frame[i - 1];
            }
            frame[0] -= PREEMPHASIS * frame[0];

            for (i, slot) in spectrum.iter_mut().enumerate() {
                let value = if i < FRAME_LENGTH {
                    frame[i] * self.window[i]
                } else {
                    0.0
                };
                *slot = Complex::new(value, 0.0);
            }
            self.fft.process(&mut spectrum);

            for (m, bank) in self.mel_banks.iter().enumerate() {
                let energy: f32 = bank
                    .iter()
                    .map(|&(bin, weight)| spectrum[bin].norm_sqr() * weight)
                    .sum();
                features[[f, m]] = energy.max(f32::EPSILON).ln();
            }
        }

        if frames > 0 {
            let means = features.sum_axis(ndarray::Axis(0)) / frames as f32;
            for mut row in features.rows_mut() {
                row -= &means;
            }
        }
        features
    }
}

fn mel(hz: f32) -> f32 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

/// Triangular filters, evenly spaced on the mel scale, as sparse
/// `(fft_bin, weight)` lists.
fn mel_banks(sample_rate: f32) -> Vec<Vec<(usize, f32)>> {
    let num_bins = FFT_SIZE / 2;
    let bin_hz = sample_rate / FFT_SIZE as f32;
    let mel_low = mel(LOW_FREQ);
    let mel_high = mel(sample_rate / 2.0);
    let mel_delta = (mel_high - mel_low) / (NUM_MEL_BINS + 1) as f32;

    (0..NUM_MEL_BINS)
        .map(|m| {
            let left = mel_low + m as f32 * mel_delta;
            let center = left + mel_delta;
            let right = center + mel_delta;
            (0..num_bins)
                .filter_map(|bin| {
                    let freq = mel(bin as f32 * bin_hz);
                    let weight = if freq > left && freq <= center {
                        (freq - left) / (center - left)
                    } else if freq > center && freq < right {
                        (right - freq) / (right - center)
                    } else {
                        0.0
                    };
                    (weight > 0.0).then_some((bin, weight))
                })
                .collect()
        })
        .collect()
}

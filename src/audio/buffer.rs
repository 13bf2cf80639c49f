// AudioBuffer - immutable interleaved sample storage for playback
//
// Samples live behind an `Arc<[f32]>` so the playback callback can hold a
// reference without copying and without any possibility of mutation while a
// stream is open.

use std::sync::Arc;

use crate::error::AudioError;

/// Interleaved float samples plus their format
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from interleaved samples.
    ///
    /// # Errors
    /// `InvalidBuffer` if the sample rate or channel count is zero, or if the
    /// sample count is not a whole number of frames.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer {
                reason: "sample rate must be greater than 0".to_string(),
            });
        }
        if channels == 0 {
            return Err(AudioError::InvalidBuffer {
                reason: "channel count must be greater than 0".to_string(),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::InvalidBuffer {
                reason: format!(
                    "{} samples do not divide into {} channels",
                    samples.len(),
                    channels
                ),
            });
        }

        Ok(Self {
            samples: samples.into(),
            channels,
            sample_rate,
        })
    }

    /// Single-channel buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(samples, 1, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Convert seconds to a frame index: `round(t * sample_rate)`, clamped to
    /// `[0, frames]`.
    pub fn seconds_to_frame(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let frame = (seconds * self.sample_rate as f64).round();
        (frame as usize).min(self.frames())
    }

    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        frame as f64 / self.sample_rate as f64
    }

    /// Interleaved samples for frames `start..end`
    pub fn frame_slice(&self, start: usize, end: usize) -> &[f32] {
        let ch = self.channels as usize;
        &self.samples[start * ch..end * ch]
    }
}

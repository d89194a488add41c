//! Sample buffers passed between pipeline stages.

use crate::error::{ParamError, SynthError};

/// Largest positive 16-bit magnitude, used as the float → PCM scale.
pub const PCM_SCALE: f64 = 32767.0;

/// Interleaved floating-point samples at a fixed sample rate.
///
/// The frame count is fixed by the oscillator; later stages transform the
/// samples in place and never resize the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Duplicate a mono signal across `channels` (1 or 2), interleaved per frame.
    pub fn from_mono(mono: &[f64], channels: u16, sample_rate: u32) -> Result<Self, SynthError> {
        if !(1..=2).contains(&channels) {
            return Err(ParamError::Channels(channels).into());
        }
        let ch = channels as usize;
        let mut samples = Vec::with_capacity(mono.len() * ch);
        for &s in mono {
            for _ in 0..ch {
                samples.push(s);
            }
        }
        Ok(SampleBuffer {
            samples,
            channels,
            sample_rate,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    /// Copy out one channel as a contiguous signal.
    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Iterate over frames, each a slice of `channels` samples.
    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.samples.chunks_exact_mut(self.channels as usize)
    }

    /// Scale to 16-bit PCM, saturating anything outside the representable range.
    pub fn quantize(self) -> PcmBuffer {
        let mut clipped = 0usize;
        let samples = self
            .samples
            .iter()
            .map(|&s| {
                let scaled = (s * PCM_SCALE).round();
                if !(-32768.0..=32767.0).contains(&scaled) {
                    clipped += 1;
                }
                scaled.clamp(-32768.0, 32767.0) as i16
            })
            .collect();
        if clipped > 0 {
            log::warn!("quantize: saturated {clipped} samples to the 16-bit range");
        }
        PcmBuffer {
            samples,
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }
}

/// Finished interleaved 16-bit PCM, ready for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Sample at `frame` on `channel`.
    pub fn get(&self, frame: usize, channel: usize) -> Option<i16> {
        if channel >= self.channels as usize {
            return None;
        }
        self.samples.get(frame * self.channels as usize + channel).copied()
    }

    pub fn channel(&self, index: usize) -> Vec<i16> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }
}

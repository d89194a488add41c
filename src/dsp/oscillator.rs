//! Naive (non-band-limited) oscillators rendered over a fixed time axis.
//!
//! Square, sawtooth and triangle are evaluated directly from the phase with
//! no anti-aliasing. Harmonics above Nyquist fold back; this is accepted for
//! the short fixed-length notes this engine renders.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::Serialize;

use super::buffer::SampleBuffer;
use crate::error::{ParamError, SynthError};

/// Peak amplitude of every waveform, leaving headroom for the filter stage.
pub const AMPLITUDE: f64 = 0.5;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Every waveform, in selector order.
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Unit-amplitude value at time `t` seconds for a tone of `frequency` Hz.
    fn evaluate(self, frequency: f64, t: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * frequency * t).sin(),
            Waveform::Square => sign((2.0 * PI * frequency * t).sin()),
            Waveform::Sawtooth => {
                // Rises from -1 to +1, then drops.
                let phase = (frequency * t).fract();
                2.0 * phase - 1.0
            }
            Waveform::Triangle => {
                // -1→+1 in [0, 0.5), +1→-1 in [0.5, 1)
                let phase = (frequency * t).fract();
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }
}

impl FromStr for Waveform {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            _ => Err(ParamError::UnknownWaveform(s.to_string()).into()),
        }
    }
}

/// Sign of `x`, with zero mapping to zero.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Number of frames a note of `duration` seconds occupies.
pub fn frame_count(duration: f64, sample_rate: u32) -> usize {
    (duration * sample_rate as f64).round() as usize
}

/// Render `duration` seconds of `waveform` at `frequency`, duplicated across
/// `channels` and scaled to [`AMPLITUDE`].
///
/// The time axis is `i / sample_rate` for `i` in `0..frame_count`, so the
/// first sample sits at phase zero.
pub fn generate(
    frequency: f64,
    waveform: Waveform,
    duration: f64,
    sample_rate: u32,
    channels: u16,
) -> Result<SampleBuffer, SynthError> {
    if sample_rate == 0 {
        return Err(ParamError::SampleRate(sample_rate as f64).into());
    }
    if !(1..=2).contains(&channels) {
        return Err(ParamError::Channels(channels).into());
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ParamError::Duration(duration).into());
    }
    let nyquist = sample_rate as f64 / 2.0;
    if !frequency.is_finite() || frequency <= 0.0 || frequency > nyquist {
        return Err(ParamError::Frequency {
            value: frequency,
            nyquist,
        }
        .into());
    }

    let frames = frame_count(duration, sample_rate);
    let sr = sample_rate as f64;
    let mono: Vec<f64> = (0..frames)
        .map(|i| AMPLITUDE * waveform.evaluate(frequency, i as f64 / sr))
        .collect();

    log::debug!(
        "oscillator: {} at {frequency} Hz, {frames} frames x {channels} ch",
        waveform.name()
    );
    SampleBuffer::from_mono(&mono, channels, sample_rate)
}

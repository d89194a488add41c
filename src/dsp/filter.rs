//! Biquad filter stage: a Butterworth-class main filter followed by a
//! resonance peak at the same frequency, then 16-bit quantization.
//!
//! Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
//! With `Q = 1/√2` the cookbook lowpass/highpass are exactly the bilinear
//! transform of the 2nd-order analog Butterworth prototype.
//!
//! The resonance peak costs [`RESONANCE_BOOST_DB`] of headroom. Oscillators
//! peak at half scale, but a strong partial sitting at the cutoff (a square
//! wave through a bandpass centred on its fundamental, say) is doubled and
//! lands past full scale. Those samples are saturated by
//! [`SampleBuffer::quantize`], never wrapped.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::buffer::{PcmBuffer, SampleBuffer};
use crate::error::{FilterDesignError, ParamError, SynthError};

/// Q of a 2nd-order Butterworth section.
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Upper bound on any Q the stage will design with.
pub const MAX_Q: f64 = 50.0;

/// Gain of the resonance peak at the cutoff frequency.
pub const RESONANCE_BOOST_DB: f64 = 6.0;

/// Main filter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

impl FilterType {
    pub const ALL: [FilterType; 3] = [
        FilterType::Highpass,
        FilterType::Bandpass,
        FilterType::Lowpass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterType::Lowpass => "lowpass",
            FilterType::Highpass => "highpass",
            FilterType::Bandpass => "bandpass",
        }
    }
}

impl FromStr for FilterType {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowpass" | "lpf" => Ok(FilterType::Lowpass),
            "highpass" | "hpf" => Ok(FilterType::Highpass),
            "bandpass" | "bpf" => Ok(FilterType::Bandpass),
            _ => Err(ParamError::UnknownFilterType(s.to_string()).into()),
        }
    }
}

/// Filter settings for one note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Cutoff (or band centre) in Hz, in (0, Nyquist).
    pub cutoff: f64,
    /// Resonance in (0, 1]; smaller is sharper.
    pub resonance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            filter_type: FilterType::Lowpass,
            cutoff: 1000.0,
            resonance: 0.5,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self, sample_rate: u32) -> Result<(), SynthError> {
        let nyquist = sample_rate as f64 / 2.0;
        if !(self.cutoff > 0.0 && self.cutoff < nyquist) {
            return Err(ParamError::Cutoff {
                value: self.cutoff,
                nyquist,
            }
            .into());
        }
        if !(self.resonance > 0.0 && self.resonance <= 1.0) {
            return Err(ParamError::Resonance(self.resonance).into());
        }
        Ok(())
    }
}

/// Filter settings as they arrive over JSON or from JS, with the filter id
/// still a string so an unknown id is reported as a parameter error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FilterConfigJson {
    filter_type: Option<String>,
    cutoff: Option<f64>,
    resonance: Option<f64>,
}

impl TryFrom<FilterConfigJson> for FilterConfig {
    type Error = SynthError;

    fn try_from(raw: FilterConfigJson) -> Result<Self, SynthError> {
        let defaults = FilterConfig::default();
        let filter_type = match raw.filter_type {
            Some(id) => id.parse::<FilterType>()?,
            None => defaults.filter_type,
        };
        Ok(FilterConfig {
            filter_type,
            cutoff: raw.cutoff.unwrap_or(defaults.cutoff),
            resonance: raw.resonance.unwrap_or(defaults.resonance),
        })
    }
}

/// Q of the resonance peak: `1 / resonance`, capped at [`MAX_Q`].
pub fn resonance_q(resonance: f64) -> f64 {
    let q = 1.0 / resonance;
    if q > MAX_Q {
        log::warn!("filter: resonance {resonance} gives Q {q}, clamped to {MAX_Q}");
        MAX_Q
    } else {
        q
    }
}

/// Q of the bandpass whose edges sit at `cutoff * 2^(±resonance / 2)`,
/// i.e. a band `resonance` octaves wide.
pub fn bandpass_q(resonance: f64) -> f64 {
    let half = resonance / 2.0;
    let q = 1.0 / (2.0_f64.powf(half) - 2.0_f64.powf(-half));
    q.min(MAX_Q)
}

/// Cookbook response shapes used by the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Response {
    Lowpass,
    Highpass,
    /// Constant 0 dB peak gain.
    Bandpass,
    Peaking { gain_db: f64 },
}

/// Normalized biquad coefficients (`a0 = 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    fn design(
        response: Response,
        frequency: f64,
        q: f64,
        sample_rate: f64,
        stage: &'static str,
    ) -> Result<Self, FilterDesignError> {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match response {
            Response::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            Response::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                let b1 = -(1.0 + cos_w0);
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            Response::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha),
            Response::Peaking { gain_db } => {
                let a_lin = (10.0_f64).powf(gain_db / 40.0);
                (
                    1.0 + alpha * a_lin,
                    -2.0 * cos_w0,
                    1.0 - alpha * a_lin,
                    1.0 + alpha / a_lin,
                    -2.0 * cos_w0,
                    1.0 - alpha / a_lin,
                )
            }
        };

        Self::normalize([b0, b1, b2, a0, a1, a2], stage, frequency)
    }

    /// Divide through by `a0` and reject non-finite or unstable results.
    fn normalize(
        raw: [f64; 6],
        stage: &'static str,
        frequency: f64,
    ) -> Result<Self, FilterDesignError> {
        let [b0, b1, b2, a0, a1, a2] = raw;
        let fail = |reason| FilterDesignError {
            stage,
            frequency,
            reason,
        };
        let c = BiquadCoefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
        if ![c.b0, c.b1, c.b2, c.a1, c.a2].iter().all(|v| v.is_finite()) {
            return Err(fail("non-finite coefficients"));
        }
        // Both poles strictly inside the unit circle.
        if !(c.a2.abs() < 1.0 && c.a1.abs() < 1.0 + c.a2) {
            return Err(fail("poles on or outside the unit circle"));
        }
        Ok(c)
    }

    /// Linear gain at `frequency` Hz.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// A biquad IIR filter (2nd order).
///
/// Implements the standard Direct Form II Transposed structure.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoefficients,
    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoefficients) -> Self {
        BiquadFilter {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Designed main filter plus resonance peak for one sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStage {
    pub main: BiquadCoefficients,
    pub resonance: BiquadCoefficients,
    sample_rate: f64,
}

impl FilterStage {
    pub fn design(config: &FilterConfig, sample_rate: u32) -> Result<Self, SynthError> {
        config.validate(sample_rate)?;
        let sr = sample_rate as f64;

        let main = match config.filter_type {
            FilterType::Lowpass => BiquadCoefficients::design(
                Response::Lowpass,
                config.cutoff,
                BUTTERWORTH_Q,
                sr,
                "lowpass",
            )?,
            FilterType::Highpass => BiquadCoefficients::design(
                Response::Highpass,
                config.cutoff,
                BUTTERWORTH_Q,
                sr,
                "highpass",
            )?,
            FilterType::Bandpass => BiquadCoefficients::design(
                Response::Bandpass,
                config.cutoff,
                bandpass_q(config.resonance),
                sr,
                "bandpass",
            )?,
        };
        let resonance = BiquadCoefficients::design(
            Response::Peaking {
                gain_db: RESONANCE_BOOST_DB,
            },
            config.cutoff,
            resonance_q(config.resonance),
            sr,
            "resonance",
        )?;

        log::debug!(
            "filter: {} at {} Hz, main {main:?}, resonance {resonance:?}",
            config.filter_type.name(),
            config.cutoff
        );
        Ok(FilterStage {
            main,
            resonance,
            sample_rate: sr,
        })
    }

    /// Combined linear gain of both sections at `frequency` Hz.
    pub fn magnitude_at(&self, frequency: f64) -> f64 {
        self.main.magnitude_at(frequency, self.sample_rate)
            * self.resonance.magnitude_at(frequency, self.sample_rate)
    }

    /// Run both sections over every channel, each with its own state.
    pub fn process(&self, mut buffer: SampleBuffer) -> SampleBuffer {
        let channels = buffer.channels() as usize;
        let mut chains: Vec<(BiquadFilter, BiquadFilter)> = (0..channels)
            .map(|_| (BiquadFilter::new(self.main), BiquadFilter::new(self.resonance)))
            .collect();
        for frame in buffer.frames_mut() {
            for (s, (main, res)) in frame.iter_mut().zip(chains.iter_mut()) {
                *s = res.process(main.process(*s));
            }
        }
        buffer
    }
}

/// Filter `buffer` with `config` and quantize the result to 16-bit PCM.
pub fn apply_filter(buffer: SampleBuffer, config: &FilterConfig) -> Result<PcmBuffer, SynthError> {
    let stage = FilterStage::design(config, buffer.sample_rate())?;
    Ok(stage.process(buffer).quantize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{self, Waveform};

    const SR: u32 = 44100;

    fn config(filter_type: FilterType, cutoff: f64, resonance: f64) -> FilterConfig {
        FilterConfig {
            filter_type,
            cutoff,
            resonance,
        }
    }

    fn main_filter(filter_type: FilterType, cutoff: f64) -> BiquadFilter {
        let stage = FilterStage::design(&config(filter_type, cutoff, 1.0), SR).unwrap();
        BiquadFilter::new(stage.main)
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = main_filter(FilterType::Lowpass, 5000.0);

        // DC in, DC out
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(
            (output - 1.0).abs() < 0.001,
            "Lowpass should pass DC, got {output}"
        );
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = main_filter(FilterType::Highpass, 1000.0);

        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(
            output.abs() < 0.001,
            "Highpass should block DC, got {output}"
        );
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = main_filter(FilterType::Lowpass, 200.0);

        // Generate a 10kHz sine and measure output amplitude
        let freq = 10000.0;
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / SR as f64;
            let input = (2.0 * PI * freq * t).sin();
            let out = f.process(input);
            if i > 1000 {
                // skip transient
                max_out = max_out.max(out.abs());
            }
        }
        assert!(
            max_out < 0.01,
            "Lowpass@200Hz should strongly attenuate 10kHz, got amplitude {max_out}"
        );
    }

    #[test]
    fn butterworth_is_minus_3db_at_cutoff() {
        let stage = FilterStage::design(&config(FilterType::Lowpass, 1000.0, 1.0), SR).unwrap();
        let g = stage.main.magnitude_at(1000.0, SR as f64);
        assert!((g - FRAC_1_SQRT_2).abs() < 1e-9, "Expected -3 dB at cutoff, got {g}");
    }

    #[test]
    fn bandpass_unity_at_centre() {
        let stage = FilterStage::design(&config(FilterType::Bandpass, 2000.0, 1.0), SR).unwrap();
        let centre = stage.main.magnitude_at(2000.0, SR as f64);
        let below = stage.main.magnitude_at(500.0, SR as f64);
        let above = stage.main.magnitude_at(8000.0, SR as f64);
        assert!((centre - 1.0).abs() < 1e-9, "Bandpass centre gain {centre}");
        assert!(below < 0.5 && above < 0.5, "Bandpass skirts {below} / {above}");
    }

    #[test]
    fn bandpass_narrows_with_resonance() {
        assert!((bandpass_q(1.0) - 1.0 / (2f64.sqrt() - FRAC_1_SQRT_2)).abs() < 1e-12);
        assert!(bandpass_q(0.1) > bandpass_q(0.5));
        assert_eq!(bandpass_q(1e-9), MAX_Q);
    }

    #[test]
    fn resonance_peak_boosts_cutoff() {
        let stage = FilterStage::design(&config(FilterType::Lowpass, 1000.0, 0.5), SR).unwrap();
        let peak = stage.resonance.magnitude_at(1000.0, SR as f64);
        let expected = 10f64.powf(RESONANCE_BOOST_DB / 20.0);
        assert!((peak - expected).abs() < 1e-9, "Peak gain {peak}, expected {expected}");
        let far = stage.resonance.magnitude_at(10.0, SR as f64);
        assert!((far - 1.0).abs() < 0.01, "Peak should leave low end alone, got {far}");
    }

    #[test]
    fn smaller_resonance_gives_narrower_peak() {
        assert_eq!(resonance_q(0.5), 2.0);
        assert_eq!(resonance_q(1.0), 1.0);
        let wide = FilterStage::design(&config(FilterType::Lowpass, 1000.0, 1.0), SR).unwrap();
        let narrow = FilterStage::design(&config(FilterType::Lowpass, 1000.0, 0.1), SR).unwrap();
        let off = 1300.0;
        let narrow_gain = narrow.resonance.magnitude_at(off, SR as f64);
        let wide_gain = wide.resonance.magnitude_at(off, SR as f64);
        assert!(narrow_gain < wide_gain, "Higher Q should boost less off-centre");
    }

    #[test]
    fn tiny_resonance_is_clamped_and_finite() {
        assert_eq!(resonance_q(1e-12), MAX_Q);
        let stage = FilterStage::design(&config(FilterType::Highpass, 3000.0, 1e-12), SR).unwrap();
        let input: Vec<f64> = (0..SR as usize)
            .map(|i| 0.5 * (2.0 * PI * 3000.0 * i as f64 / SR as f64).sin())
            .collect();
        let out = stage.process(SampleBuffer::from_mono(&input, 1, SR).unwrap());
        for &s in out.samples() {
            assert!(s.is_finite() && s.abs() < 2.0, "Filter diverged: {s}");
        }
    }

    #[test]
    fn filter_output_finite() {
        let stage = FilterStage::design(&config(FilterType::Bandpass, 1000.0, 0.3), SR).unwrap();
        let impulses: Vec<f64> = (0..10000).map(|i| if i % 100 == 0 { 1.0 } else { 0.0 }).collect();
        let out = stage.process(SampleBuffer::from_mono(&impulses, 2, SR).unwrap());
        for (i, &s) in out.samples().iter().enumerate() {
            assert!(s.is_finite(), "Filter output not finite at sample {i}");
        }
    }

    #[test]
    fn rejects_out_of_range_config() {
        for cutoff in [0.0, -5.0, 22050.0, 30000.0, f64::NAN] {
            let cfg = config(FilterType::Lowpass, cutoff, 0.5);
            let err = FilterStage::design(&cfg, SR).unwrap_err();
            assert!(
                matches!(err, SynthError::InvalidParameter(ParamError::Cutoff { .. })),
                "cutoff {cutoff} should be rejected"
            );
        }
        for resonance in [0.0, -0.1, 1.5, f64::NAN] {
            let cfg = config(FilterType::Lowpass, 1000.0, resonance);
            let err = FilterStage::design(&cfg, SR).unwrap_err();
            assert!(
                matches!(err, SynthError::InvalidParameter(ParamError::Resonance(_))),
                "resonance {resonance} should be rejected"
            );
        }
    }

    #[test]
    fn degenerate_coefficients_are_design_errors() {
        let err = BiquadCoefficients::normalize([1.0, 0.0, 0.0, 0.0, 1.0, 1.0], "lowpass", 1.0)
            .unwrap_err();
        assert_eq!(err.reason, "non-finite coefficients");

        // Pole pair on the unit circle
        let err = BiquadCoefficients::normalize([1.0, 0.0, 0.0, 1.0, -2.0, 1.0], "lowpass", 1.0)
            .unwrap_err();
        assert_eq!(err.reason, "poles on or outside the unit circle");
    }

    #[test]
    fn boosted_square_saturates_without_wrapping() {
        let cfg = config(FilterType::Bandpass, 440.0, 1.0);
        let stage = FilterStage::design(&cfg, SR).unwrap();
        let raw = oscillator::generate(440.0, Waveform::Square, 0.5, SR, 1).unwrap();
        let filtered = stage.process(raw);
        let peak = filtered.samples().iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak > 1.0, "Boosted fundamental should exceed full scale, got {peak}");

        let pcm = filtered.clone().quantize();
        assert!(pcm.samples.contains(&i16::MAX) || pcm.samples.contains(&i16::MIN));
        for (i, (&x, &q)) in filtered.samples().iter().zip(&pcm.samples).enumerate() {
            if x.abs() > 0.001 {
                assert_eq!(x > 0.0, q > 0, "Sample {i} wrapped: {x} -> {q}");
            }
        }
    }

    #[test]
    fn filter_config_json_rejects_unknown_ids() {
        let raw: FilterConfigJson = serde_json::from_str(r#"{"filter_type": "HPF"}"#).unwrap();
        let cfg = FilterConfig::try_from(raw).unwrap();
        assert_eq!(cfg.filter_type, FilterType::Highpass);
        assert_eq!(cfg.cutoff, 1000.0);

        let raw: FilterConfigJson = serde_json::from_str(r#"{"filter_type": "comb"}"#).unwrap();
        assert_eq!(
            FilterConfig::try_from(raw),
            Err(SynthError::InvalidParameter(ParamError::UnknownFilterType("comb".into())))
        );
    }

    #[test]
    fn parses_filter_ids() {
        assert_eq!("LPF".parse::<FilterType>().unwrap(), FilterType::Lowpass);
        assert_eq!("bandpass".parse::<FilterType>().unwrap(), FilterType::Bandpass);
        assert!(matches!(
            "comb".parse::<FilterType>(),
            Err(SynthError::InvalidParameter(ParamError::UnknownFilterType(_)))
        ));
    }
}

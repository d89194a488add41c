//! ADSR envelope shaping over a fixed-length buffer.
//!
//! Attack, decay and release are fractions of the buffer length; sustain is
//! a gain level. The four segments always tile the buffer exactly.

use serde::{Deserialize, Serialize};

use super::buffer::SampleBuffer;
use crate::error::{ParamError, SynthError};

/// Named ADSR parameters with stable indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdsrParam {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl AdsrParam {
    pub const ALL: [AdsrParam; 4] = [
        AdsrParam::Attack,
        AdsrParam::Decay,
        AdsrParam::Sustain,
        AdsrParam::Release,
    ];

    pub fn index(self) -> usize {
        match self {
            AdsrParam::Attack => 0,
            AdsrParam::Decay => 1,
            AdsrParam::Sustain => 2,
            AdsrParam::Release => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AdsrParam::Attack => "attack",
            AdsrParam::Decay => "decay",
            AdsrParam::Sustain => "sustain",
            AdsrParam::Release => "release",
        }
    }
}

/// ADSR settings, every field in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrParams {
    /// Attack length as a fraction of the note.
    pub attack: f64,
    /// Decay length as a fraction of the note.
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    /// Release length as a fraction of the note.
    pub release: f64,
}

impl Default for AdsrParams {
    fn default() -> Self {
        AdsrParams {
            attack: 0.1,
            decay: 0.1,
            sustain: 0.5,
            release: 0.1,
        }
    }
}

impl AdsrParams {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        AdsrParams {
            attack,
            decay,
            sustain,
            release,
        }
    }

    pub fn get(&self, param: AdsrParam) -> f64 {
        match param {
            AdsrParam::Attack => self.attack,
            AdsrParam::Decay => self.decay,
            AdsrParam::Sustain => self.sustain,
            AdsrParam::Release => self.release,
        }
    }

    pub fn set(&mut self, param: AdsrParam, value: f64) {
        match param {
            AdsrParam::Attack => self.attack = value,
            AdsrParam::Decay => self.decay = value,
            AdsrParam::Sustain => self.sustain = value,
            AdsrParam::Release => self.release = value,
        }
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        for param in AdsrParam::ALL {
            let value = self.get(param);
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamError::Adsr {
                    name: param.name(),
                    value,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Sample counts of the four envelope segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segments {
    pub attack: usize,
    pub decay: usize,
    pub sustain: usize,
    pub release: usize,
}

impl Segments {
    /// Split `total` frames according to `params`.
    ///
    /// When attack + decay + release overrun the buffer, attack and decay
    /// each absorb a third of the deficit (floor division), sustain drops
    /// to zero and release takes whatever is left.
    pub fn compute(params: &AdsrParams, total: usize) -> Segments {
        let total_i = total as i64;
        let frac = |v: f64| (v * total as f64) as i64;
        let mut attack = frac(params.attack);
        let mut decay = frac(params.decay);
        let mut release = frac(params.release);
        let mut sustain = total_i - attack - decay - release;

        if sustain < 0 {
            let share = sustain.div_euclid(3);
            attack = (attack + share).max(0);
            decay = (decay + share).max(0);
            sustain = 0;
            // attack and decay alone may still exceed the buffer
            attack = attack.min(total_i);
            decay = decay.min(total_i - attack);
            release = (total_i - attack - decay - sustain).max(0);
            log::debug!("envelope: segments overran buffer, redistributed deficit {}", -3 * share);
        }

        Segments {
            attack: attack as usize,
            decay: decay as usize,
            sustain: sustain as usize,
            release: release as usize,
        }
    }

    pub fn total(&self) -> usize {
        self.attack + self.decay + self.sustain + self.release
    }
}

/// `n` evenly spaced values from `start` to `end`, both inclusive.
fn ramp(start: f64, end: f64, n: usize, out: &mut Vec<f64>) {
    match n {
        0 => {}
        1 => out.push(start),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            out.extend((0..n).map(|i| start + step * i as f64));
            // pin the endpoint exactly
            if let Some(last) = out.last_mut() {
                *last = end;
            }
        }
    }
}

/// Per-frame gain curve for a buffer of `total` frames.
pub fn envelope_curve(params: &AdsrParams, total: usize) -> Result<Vec<f64>, SynthError> {
    params.validate()?;
    let seg = Segments::compute(params, total);
    let mut curve = Vec::with_capacity(total);
    ramp(0.0, 1.0, seg.attack, &mut curve);
    ramp(1.0, params.sustain, seg.decay, &mut curve);
    curve.extend(std::iter::repeat_n(params.sustain, seg.sustain));
    ramp(params.sustain, 0.0, seg.release, &mut curve);
    debug_assert_eq!(curve.len(), total);
    Ok(curve)
}

/// Multiply every channel of `buffer` by the ADSR gain curve.
pub fn apply_envelope(
    mut buffer: SampleBuffer,
    params: &AdsrParams,
) -> Result<SampleBuffer, SynthError> {
    let curve = envelope_curve(params, buffer.frames())?;
    log::debug!(
        "envelope: {:?} over {} frames",
        Segments::compute(params, buffer.frames()),
        buffer.frames()
    );
    for (frame, gain) in buffer.frames_mut().zip(curve) {
        for s in frame.iter_mut() {
            *s *= gain;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_segments_tile_one_second() {
        let seg = Segments::compute(&AdsrParams::default(), 44100);
        assert_eq!(
            seg,
            Segments {
                attack: 4410,
                decay: 4410,
                sustain: 30870,
                release: 4410
            }
        );
    }

    #[test]
    fn overrun_redistributes_deficit() {
        // 0.5 + 0.5 + 0.5 of 1000 frames: deficit 500
        let seg = Segments::compute(&AdsrParams::new(0.5, 0.5, 0.3, 0.5), 1000);
        assert_eq!(seg.attack, 333);
        assert_eq!(seg.decay, 333);
        assert_eq!(seg.sustain, 0);
        assert_eq!(seg.release, 334);
        assert_eq!(seg.total(), 1000);
    }

    #[test]
    fn overrun_without_release_still_tiles() {
        let seg = Segments::compute(&AdsrParams::new(1.0, 1.0, 0.5, 0.0), 900);
        assert_eq!(seg.total(), 900);
        assert_eq!(seg.attack, 600);
        assert_eq!(seg.decay, 300);
        assert_eq!(seg.release, 0);
    }

    #[test]
    fn tiling_holds_over_parameter_grid() {
        let steps = [0.0, 0.1, 0.33, 0.5, 0.77, 1.0];
        for &a in &steps {
            for &d in &steps {
                for &r in &steps {
                    for total in [1usize, 7, 1000, 44100] {
                        let seg = Segments::compute(&AdsrParams::new(a, d, 0.5, r), total);
                        assert_eq!(seg.total(), total, "a={a} d={d} r={r} total={total}");
                    }
                }
            }
        }
    }

    #[test]
    fn curve_shape_is_monotonic_per_segment() {
        let params = AdsrParams::new(0.2, 0.2, 0.4, 0.3);
        let curve = envelope_curve(&params, 1000).unwrap();
        let seg = Segments::compute(&params, 1000);
        let (a, d, s) = (seg.attack, seg.decay, seg.sustain);

        assert_eq!(curve[0], 0.0, "Envelope should start silent");
        assert!(curve[..a].windows(2).all(|w| w[1] >= w[0]), "Attack must not decrease");
        assert_eq!(curve[a - 1], 1.0, "Attack should reach 1.0");
        assert!(curve[a..a + d].windows(2).all(|w| w[1] <= w[0]), "Decay must not increase");
        assert!(curve[a + d..a + d + s].iter().all(|&g| g == 0.4), "Sustain must hold");
        assert!(curve[a + d + s..].windows(2).all(|w| w[1] <= w[0]), "Release must not increase");
        assert_eq!(*curve.last().unwrap(), 0.0, "Release should end at 0");
    }

    #[test]
    fn curve_stays_in_unit_range() {
        let curve = envelope_curve(&AdsrParams::new(0.9, 0.8, 1.0, 0.7), 2000).unwrap();
        assert_eq!(curve.len(), 2000);
        for &g in &curve {
            assert!((0.0..=1.0).contains(&g), "Envelope out of range: {g}");
        }
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let err = envelope_curve(&AdsrParams::new(0.1, 1.2, 0.5, 0.1), 100).unwrap_err();
        assert_eq!(
            err,
            SynthError::InvalidParameter(ParamError::Adsr {
                name: "decay",
                value: 1.2
            })
        );
        assert!(envelope_curve(&AdsrParams::new(0.1, 0.1, f64::NAN, 0.1), 100).is_err());
    }

    #[test]
    fn applies_to_every_channel() {
        let buf = SampleBuffer::from_mono(&[1.0; 100], 2, 100).unwrap();
        let shaped = apply_envelope(buf, &AdsrParams::default()).unwrap();
        assert_eq!(shaped.frames(), 100);
        assert_eq!(shaped.channel(0), shaped.channel(1));
        assert_eq!(shaped.samples()[0], 0.0);
        assert_eq!(shaped.channel(0)[50], 0.5);
    }

    #[test]
    fn param_indices_are_stable() {
        for (i, p) in AdsrParam::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        let mut params = AdsrParams::default();
        params.set(AdsrParam::Release, 0.25);
        assert_eq!(params.get(AdsrParam::Release), 0.25);
    }
}

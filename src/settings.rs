//! Caller-held "current settings" for the instrument controls.
//!
//! The UI mutates a `SynthSettings` as sliders and knobs move, then copies
//! it into a fresh `NoteRequest` on every key press. Setters clamp the same
//! way the controls do; the engine still re-validates every request.

use serde::{Deserialize, Serialize};

use crate::dsp::engine::NoteRequest;
use crate::dsp::envelope::{AdsrParam, AdsrParams};
use crate::dsp::filter::{FilterConfig, FilterConfigJson, FilterType};
use crate::dsp::note;
use crate::dsp::oscillator::Waveform;
use crate::error::SynthError;

/// Lowest cutoff the cutoff knob reaches.
pub const MIN_CUTOFF: f64 = 100.0;
/// Highest cutoff the cutoff knob reaches.
pub const MAX_CUTOFF: f64 = 20000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SynthSettings {
    pub waveform: Waveform,
    pub adsr: AdsrParams,
    pub filter: FilterConfig,
}

/// Saved settings with ids left unparsed; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SynthSettingsJson {
    waveform: Option<String>,
    adsr: Option<AdsrParams>,
    filter: Option<FilterConfigJson>,
}

impl SynthSettings {
    /// Restore settings saved as JSON. Unknown waveform or filter ids are
    /// parameter errors, like every other out-of-range control value.
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        let raw: SynthSettingsJson = serde_json::from_str(json)?;
        let waveform = match raw.waveform {
            Some(id) => id.parse::<Waveform>()?,
            None => Waveform::default(),
        };
        let filter = match raw.filter {
            Some(filter) => FilterConfig::try_from(filter)?,
            None => FilterConfig::default(),
        };
        Ok(SynthSettings {
            waveform,
            adsr: raw.adsr.unwrap_or_default(),
            filter,
        })
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Set one ADSR slider, clamped to [0, 1].
    pub fn set_adsr(&mut self, param: AdsrParam, value: f64) {
        self.adsr.set(param, value.clamp(0.0, 1.0));
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter.filter_type = filter_type;
    }

    /// Set the cutoff knob, clamped to [`MIN_CUTOFF`, `MAX_CUTOFF`].
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.filter.cutoff = cutoff.clamp(MIN_CUTOFF, MAX_CUTOFF);
    }

    /// Set the resonance knob, clamped to [0, 1].
    ///
    /// Zero is reachable from the knob but rejected by the engine.
    pub fn set_resonance(&mut self, resonance: f64) {
        self.filter.resonance = resonance.clamp(0.0, 1.0);
    }

    /// Snapshot the settings into a request for `frequency` Hz.
    pub fn request(&self, frequency: f64) -> NoteRequest {
        NoteRequest {
            frequency,
            waveform: self.waveform,
            adsr: self.adsr,
            filter: self.filter,
        }
    }

    /// Snapshot the settings into a request for a named note.
    pub fn request_for_note(
        &self,
        name: &str,
        tuning_pitch: f64,
    ) -> Result<NoteRequest, SynthError> {
        let frequency = note::note_to_frequency_with_tuning(name, tuning_pitch)?;
        Ok(self.request(frequency))
    }
}

//! Note engine: renders one `NoteRequest` to a finished PCM buffer.
//!
//! Each render runs oscillator → envelope → filter → quantize on a buffer it
//! owns for the whole call. Nothing is kept between renders, so one engine
//! can be shared freely and identical requests give identical output.

use serde::{Deserialize, Serialize};

use super::buffer::PcmBuffer;
use super::envelope::{self, AdsrParams};
use super::filter::{self, FilterConfig, FilterConfigJson};
use super::note::{self, DEFAULT_TUNING_PITCH};
use super::oscillator::{self, Waveform};
use crate::error::{ParamError, SynthError};

/// Fixed rendering parameters shared by every note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo, both channels identical).
    pub channels: u16,
    /// Length of every rendered note in seconds.
    pub duration: f64,
    /// Frequency of A4 in Hz.
    pub tuning_pitch: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100,
            channels: 2,
            duration: 1.0,
            tuning_pitch: DEFAULT_TUNING_PITCH,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.sample_rate == 0 {
            return Err(ParamError::SampleRate(self.sample_rate as f64).into());
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ParamError::Channels(self.channels).into());
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(ParamError::Duration(self.duration).into());
        }
        if !(self.tuning_pitch.is_finite() && self.tuning_pitch > 0.0) {
            return Err(ParamError::TuningPitch(self.tuning_pitch).into());
        }
        Ok(())
    }
}

/// Everything needed to render one note. Built fresh per key press.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteRequest {
    /// Pitch in Hz.
    pub frequency: f64,
    pub waveform: Waveform,
    pub adsr: AdsrParams,
    pub filter: FilterConfig,
}

impl NoteRequest {
    /// Parse a request, defaulting everything but `frequency`.
    ///
    /// Malformed JSON is a [`SynthError::Config`]; an unrecognised waveform or
    /// filter id is a [`SynthError::InvalidParameter`].
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        let raw: NoteRequestJson = serde_json::from_str(json)?;
        raw.try_into()
    }
}

/// Wire form of a [`NoteRequest`] with ids left unparsed.
#[derive(Debug, Deserialize)]
pub(crate) struct NoteRequestJson {
    frequency: f64,
    #[serde(default)]
    waveform: Option<String>,
    #[serde(default)]
    adsr: Option<AdsrParams>,
    #[serde(default)]
    filter: Option<FilterConfigJson>,
}

impl TryFrom<NoteRequestJson> for NoteRequest {
    type Error = SynthError;

    fn try_from(raw: NoteRequestJson) -> Result<Self, SynthError> {
        let waveform = match raw.waveform {
            Some(id) => id.parse::<Waveform>()?,
            None => Waveform::default(),
        };
        let filter = match raw.filter {
            Some(filter) => FilterConfig::try_from(filter)?,
            None => FilterConfig::default(),
        };
        Ok(NoteRequest {
            frequency: raw.frequency,
            waveform,
            adsr: raw.adsr.unwrap_or_default(),
            filter,
        })
    }
}

/// The audio rendering engine.
#[derive(Debug, Clone, Default)]
pub struct SynthEngine {
    config: EngineConfig,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Result<Self, SynthError> {
        config.validate()?;
        Ok(SynthEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render a request to interleaved 16-bit PCM.
    ///
    /// Every parameter is checked before any audio is produced, so an invalid
    /// request fails without partial work.
    pub fn render(&self, request: &NoteRequest) -> Result<PcmBuffer, SynthError> {
        let cfg = &self.config;
        log::trace!("render: {request:?}");
        request.adsr.validate()?;
        request.filter.validate(cfg.sample_rate)?;

        let raw = oscillator::generate(
            request.frequency,
            request.waveform,
            cfg.duration,
            cfg.sample_rate,
            cfg.channels,
        )?;
        let shaped = envelope::apply_envelope(raw, &request.adsr)?;
        let pcm = filter::apply_filter(shaped, &request.filter)?;

        log::debug!(
            "render: {} Hz {} -> {} frames x {} ch",
            request.frequency,
            request.waveform.name(),
            pcm.frames(),
            pcm.channels
        );
        Ok(pcm)
    }

    /// Render a note by name (e.g. "A4") at the configured tuning.
    pub fn render_note(
        &self,
        note_name: &str,
        waveform: Waveform,
        adsr: AdsrParams,
        filter: FilterConfig,
    ) -> Result<PcmBuffer, SynthError> {
        let frequency = note::note_to_frequency_with_tuning(note_name, self.config.tuning_pitch)?;
        self.render(&NoteRequest {
            frequency,
            waveform,
            adsr,
            filter,
        })
    }
}

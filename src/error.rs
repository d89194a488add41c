use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    InvalidParameter(ParamError),
    FilterDesign(FilterDesignError),
    Config(String),
    Export(String),
}

/// A request value outside the range the engine accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    Frequency { value: f64, nyquist: f64 },
    Duration(f64),
    SampleRate(f64),
    Channels(u16),
    Adsr { name: &'static str, value: f64 },
    Cutoff { value: f64, nyquist: f64 },
    Resonance(f64),
    TuningPitch(f64),
    UnknownWaveform(String),
    UnknownFilterType(String),
    UnknownNote(String),
}

/// Biquad coefficients that came out non-finite or with poles on/outside
/// the unit circle.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDesignError {
    pub stage: &'static str,
    pub frequency: f64,
    pub reason: &'static str,
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidParameter(e) => write!(f, "Invalid parameter: {e}"),
            SynthError::FilterDesign(e) => write!(f, "Filter design error: {e}"),
            SynthError::Config(msg) => write!(f, "Config error: {msg}"),
            SynthError::Export(msg) => write!(f, "Export error: {msg}"),
        }
    }
}

impl std::error::Error for SynthError {}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Frequency { value, nyquist } => {
                write!(f, "frequency {value} Hz outside (0, {nyquist}]")
            }
            ParamError::Duration(v) => write!(f, "duration {v}s must be positive"),
            ParamError::SampleRate(v) => write!(f, "sample rate {v} Hz must be positive"),
            ParamError::Channels(n) => write!(f, "channel count {n} must be 1 or 2"),
            ParamError::Adsr { name, value } => write!(f, "{name} {value} outside [0, 1]"),
            ParamError::Cutoff { value, nyquist } => {
                write!(f, "cutoff {value} Hz outside (0, {nyquist})")
            }
            ParamError::Resonance(v) => write!(f, "resonance {v} outside (0, 1]"),
            ParamError::TuningPitch(v) => write!(f, "tuning pitch {v} Hz must be positive"),
            ParamError::UnknownWaveform(s) => write!(f, "unknown waveform '{s}'"),
            ParamError::UnknownFilterType(s) => write!(f, "unknown filter type '{s}'"),
            ParamError::UnknownNote(s) => write!(f, "unknown note '{s}'"),
        }
    }
}

impl std::error::Error for ParamError {}

impl fmt::Display for FilterDesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage at {} Hz: {}", self.stage, self.frequency, self.reason)
    }
}

impl std::error::Error for FilterDesignError {}

impl From<ParamError> for SynthError {
    fn from(e: ParamError) -> Self {
        SynthError::InvalidParameter(e)
    }
}

impl From<FilterDesignError> for SynthError {
    fn from(e: FilterDesignError) -> Self {
        SynthError::FilterDesign(e)
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        SynthError::Config(e.to_string())
    }
}

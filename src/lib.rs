pub mod dsp;
pub mod error;
pub mod settings;

pub use crate::dsp::buffer::{PcmBuffer, SampleBuffer};
pub use crate::dsp::engine::{EngineConfig, NoteRequest, SynthEngine};
pub use crate::dsp::envelope::{AdsrParam, AdsrParams};
pub use crate::dsp::filter::{FilterConfig, FilterType};
pub use crate::dsp::oscillator::Waveform;
pub use crate::error::SynthError;
pub use crate::settings::SynthSettings;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the notesynth-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render a JSON `NoteRequest` with the default engine configuration.
pub fn render_json(request_json: &str) -> Result<PcmBuffer, SynthError> {
    let request = NoteRequest::from_json(request_json)?;
    SynthEngine::default().render(&request)
}

/// WASM-exposed: render a request object to interleaved stereo i16 samples.
#[wasm_bindgen]
pub fn render_note(request: JsValue) -> Result<Vec<i16>, JsValue> {
    let raw: dsp::engine::NoteRequestJson =
        serde_wasm_bindgen::from_value(request).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let pcm = NoteRequest::try_from(raw)
        .and_then(|request| SynthEngine::default().render(&request))
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(pcm.samples)
}

/// WASM-exposed: render a JSON request to interleaved stereo i16 samples.
#[wasm_bindgen]
pub fn render_note_json(request_json: &str) -> Result<Vec<i16>, JsValue> {
    let pcm = render_json(request_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(pcm.samples)
}

/// WASM-exposed: render a JSON request to a WAV byte array.
#[wasm_bindgen]
pub fn render_note_wav(request_json: &str) -> Result<Vec<u8>, JsValue> {
    let pcm = render_json(request_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(dsp::renderer::encode_wav(&pcm))
}

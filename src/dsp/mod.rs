//! DSP engine: pure Rust note synthesis.
//!
//! A note is rendered as a strict pipeline: oscillator → envelope → filter →
//! 16-bit quantization. Every stage takes its buffer by value and hands it on.

pub mod buffer;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod note;
pub mod oscillator;
pub mod renderer;

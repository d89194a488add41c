//! Note names and equal-temperament frequencies.

use crate::error::{ParamError, SynthError};

/// Default tuning: A4 = 440 Hz.
pub const DEFAULT_TUNING_PITCH: f64 = 440.0;

/// The twelve keys of the one-octave keyboard, white keys first.
pub const KEYBOARD_NOTES: [&str; 12] = [
    "C4", "D4", "E4", "F4", "G4", "A4", "B4", "C#4", "D#4", "F#4", "G#4", "A#4",
];

/// Semitone of a natural note letter above C.
fn letter_semitone(letter: char) -> Option<i32> {
    let semitone = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    Some(semitone)
}

/// MIDI note number (C4 = 60) for a name such as "C4", "F#3" or "Bb5".
///
/// Returns `None` for anything unparseable, including octaves whose note
/// number does not fit an `i32`.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let mut chars = note.chars();
    let mut semitone = letter_semitone(chars.next()?)?;
    let rest = chars.as_str();
    let octave_text = if let Some(tail) = rest.strip_prefix('#') {
        semitone += 1;
        tail
    } else if let Some(tail) = rest.strip_prefix('b') {
        semitone -= 1;
        tail
    } else {
        rest
    };
    let octave: i32 = octave_text.parse().ok()?;
    octave.checked_add(1)?.checked_mul(12)?.checked_add(semitone)
}

/// Convert a MIDI note number to frequency.
///
/// `tuning_pitch` is the frequency of A4 (MIDI 69).
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Note-to-frequency conversion at A4 = 440 Hz.
pub fn note_to_frequency(note: &str) -> Result<f64, SynthError> {
    note_to_frequency_with_tuning(note, DEFAULT_TUNING_PITCH)
}

pub fn note_to_frequency_with_tuning(note: &str, tuning_pitch: f64) -> Result<f64, SynthError> {
    let midi = note_to_midi(note).ok_or_else(|| ParamError::UnknownNote(note.to_string()))?;
    Ok(midi_to_frequency(midi, tuning_pitch))
}

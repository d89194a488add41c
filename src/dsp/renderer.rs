//! WAV renderer: packs a finished `PcmBuffer` for playback or export.

use super::buffer::PcmBuffer;
#[cfg(feature = "wav")]
use crate::error::SynthError;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
/// `WAVE_FORMAT_PCM`.
const FORMAT_PCM: u16 = 1;
/// Body length of a plain PCM `fmt ` chunk.
const FMT_CHUNK_LEN: u32 = 16;
/// RIFF preamble plus `fmt ` and `data` chunk headers.
pub const WAV_HEADER_LEN: usize = 44;

fn put_chunk_header(out: &mut Vec<u8>, id: &[u8; 4], len: u32) {
    out.extend_from_slice(id);
    out.extend_from_slice(&len.to_le_bytes());
}

/// Pack `pcm` as a canonical 16-bit PCM RIFF/WAVE file.
pub fn encode_wav(pcm: &PcmBuffer) -> Vec<u8> {
    let block_align = pcm.channels * BYTES_PER_SAMPLE;
    let byte_rate = pcm.sample_rate * u32::from(block_align);
    let data_len = (pcm.samples.len() * BYTES_PER_SAMPLE as usize) as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    // RIFF length covers everything after its own 8-byte header.
    put_chunk_header(&mut out, b"RIFF", WAV_HEADER_LEN as u32 - 8 + data_len);
    out.extend_from_slice(b"WAVE");

    put_chunk_header(&mut out, b"fmt ", FMT_CHUNK_LEN);
    for field in [FORMAT_PCM, pcm.channels] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for field in [pcm.sample_rate, byte_rate] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for field in [block_align, BITS_PER_SAMPLE] {
        out.extend_from_slice(&field.to_le_bytes());
    }

    put_chunk_header(&mut out, b"data", data_len);
    out.extend(pcm.samples.iter().flat_map(|s| s.to_le_bytes()));
    out
}

/// Write `pcm` to a WAV file at `path`.
#[cfg(feature = "wav")]
pub fn write_wav(path: impl AsRef<std::path::Path>, pcm: &PcmBuffer) -> Result<(), SynthError> {
    let spec = hound::WavSpec {
        channels: pcm.channels,
        sample_rate: pcm.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let export_err = |e: hound::Error| SynthError::Export(e.to_string());
    let mut writer = hound::WavWriter::create(path.as_ref(), spec).map_err(export_err)?;
    for &sample in &pcm.samples {
        writer.write_sample(sample).map_err(export_err)?;
    }
    writer.finalize().map_err(export_err)?;
    log::debug!(
        "write_wav: {} frames to {}",
        pcm.frames(),
        path.as_ref().display()
    );
    Ok(())
}

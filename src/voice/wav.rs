//! WAV capture inspection and encoding

use std::io::Cursor;

use crate::{Error, Result};

/// Sample rate the browser page records at
pub const SAMPLE_RATE: u32 = 16000;

/// Header facts about an accepted capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
}

/// Check that `audio` is a 16-bit integer PCM WAV and describe it
///
/// # Errors
///
/// Returns `Error::Audio` if the bytes are not a readable WAV or use a
/// different sample encoding
pub fn inspect_wav(audio: &[u8]) -> Result<WavInfo> {
    let reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| Error::Audio(format!("capture is not a readable WAV: {e}")))?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Audio(format!(
            "capture must be 16-bit PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let duration_ms = if spec.sample_rate == 0 {
        0
    } else {
        u64::from(reader.duration()) * 1000 / u64::from(spec.sample_rate)
    };

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        duration_ms,
    })
}

/// Convert f32 samples to 16-bit mono WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

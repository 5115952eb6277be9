//! PCM16-Codec fuer den Agenten-Transport
//!
//! Wandelt zwischen f32-Samples ([-1.0, 1.0]) und dem Drahtformat um:
//! 16-bit signed Integer, little-endian, mono. Die Skalierung ist
//! asymmetrisch (negativ * 0x8000, positiv * 0x7FFF), damit beide
//! Vollausschlaege exakt auf den i16-Bereich fallen.
//!
//! Beide Richtungen sind pur und total ueber gueltiger Eingabe:
//! Samples ausserhalb von [-1.0, 1.0] werden geklemmt, nicht
//! zurueckgewiesen. Eine ungerade Byte-Laenge beim Dekodieren ist
//! dagegen ein harter Fehler.

use crate::error::{AudioError, AudioResult};

/// Abtastrate des gesamten Audio-Pfads in Hz
pub const SAMPLE_RATE: u32 = 44_100;

/// Kanalanzahl (mono)
pub const CHANNELS: u16 = 1;

/// Samples pro Frame im Sende-Pfad
pub const FRAME_SAMPLES: usize = 4096;

/// Bytes pro Sample im Drahtformat
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes pro Frame im Drahtformat
pub const FRAME_BYTES: usize = FRAME_SAMPLES * BYTES_PER_SAMPLE;

/// Wandelt ein f32-Sample in ein i16-Sample um (mit Klemmen)
#[inline]
pub fn sample_zu_i16(sample: f32) -> i16 {
    let geklemmt = sample.clamp(-1.0, 1.0);
    if geklemmt < 0.0 {
        (geklemmt * 0x8000 as f32).round() as i16
    } else {
        (geklemmt * 0x7FFF as f32).round() as i16
    }
}

/// Wandelt ein i16-Sample in ein f32-Sample um
#[inline]
pub fn i16_zu_sample(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 0x8000 as f32
    } else {
        sample as f32 / 0x7FFF as f32
    }
}

/// Kodiert f32-Samples als PCM16 little-endian
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        bytes.extend_from_slice(&sample_zu_i16(sample).to_le_bytes());
    }
    bytes
}

/// Dekodiert PCM16 little-endian zu f32-Samples
///
/// Die Byte-Laenge muss ein Vielfaches von [`BYTES_PER_SAMPLE`] sein,
/// sonst wird [`AudioError::UngueltigeFrameLaenge`] zurueckgegeben.
pub fn decode_pcm16(bytes: &[u8]) -> AudioResult<Vec<f32>> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(AudioError::UngueltigeFrameLaenge(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|paar| i16_zu_sample(i16::from_le_bytes([paar[0], paar[1]])))
        .collect();

    Ok(samples)
}

/// Dauer einer Sample-Anzahl in Sekunden (bei [`SAMPLE_RATE`])
pub fn samples_als_sekunden(anzahl: u64) -> f64 {
    anzahl as f64 / SAMPLE_RATE as f64
}

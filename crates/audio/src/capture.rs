//! Mikrofon-Capture via cpal
//!
//! Oeffnet einen cpal InputStream und schreibt Samples in einen
//! lock-free Ring-Buffer. Der cpal-Callback produziert, der
//! Audio-Thread konsumiert und schneidet Frames.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, warn};

use crate::codec::{i16_zu_sample, SAMPLE_RATE};
use crate::error::{AudioError, AudioResult};

/// Konfiguration fuer den Mikrofon-Capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Kanalanzahl (1 = Mono)
    pub channels: u16,
    /// Ring-Buffer Kapazitaet in Samples
    pub buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            buffer_size: SAMPLE_RATE as usize * 2, // 2 Sekunden Puffer
        }
    }
}

/// Produziert Samples aus dem Mikrofon-Callback
pub type CaptureProducer = HeapProd<f32>;
/// Konsumiert Samples fuer die Frame-Bildung
pub type CaptureConsumer = HeapCons<f32>;

/// Mikrofon-Stream
///
/// Haelt den cpal-Stream am Leben. Wird der CaptureStream gedroppt,
/// stoppt die Aufnahme automatisch.
pub struct CaptureStream {
    _stream: Stream,
    config: CaptureConfig,
}

impl CaptureStream {
    /// Gibt die Konfiguration des Streams zurueck
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

/// Oeffnet einen Capture-Stream auf dem gegebenen Geraet.
///
/// Gibt den Stream und den Ring-Buffer Consumer zurueck.
/// Der Producer laeuft im cpal-Callback-Thread.
pub fn open_capture_stream(
    device: &Device,
    config: CaptureConfig,
) -> AudioResult<(CaptureStream, CaptureConsumer)> {
    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let rb = HeapRb::<f32>::new(config.buffer_size);
    let (mut producer, consumer) = rb.split();

    let err_fn = |err| error!("Capture-Fehler: {}", err);

    // Unterstuetzte Sample-Formate pruefen
    let supported = device
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= config.sample_rate
                && c.max_sample_rate().0 >= config.sample_rate
                && c.channels() >= config.channels
        });

    let sample_format = supported
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let written = producer.push_slice(data);
                    if written < data.len() {
                        warn!(
                            "Capture Ring-Buffer voll, {} Samples verworfen",
                            data.len() - written
                        );
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let floats: Vec<f32> = data.iter().map(|&s| i16_zu_sample(s)).collect();
                    let written = producer.push_slice(&floats);
                    if written < floats.len() {
                        warn!("Capture Ring-Buffer voll");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::U8 => device
            .build_input_stream(
                &stream_config,
                move |data: &[u8], _| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| (s as f32 - 128.0) / 128.0).collect();
                    let written = producer.push_slice(&floats);
                    if written < floats.len() {
                        warn!("Capture Ring-Buffer voll");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        _ => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!(
        "Capture-Stream geoeffnet: {}Hz {}ch",
        config.sample_rate, config.channels
    );

    Ok((
        CaptureStream {
            _stream: stream,
            config,
        },
        consumer,
    ))
}

// ---------------------------------------------------------------------------
// Frame-Schneider
// ---------------------------------------------------------------------------

/// Schneidet einen fortlaufenden Sample-Strom in feste Frames
///
/// Der Capture-Callback liefert Bloecke beliebiger Groesse; der
/// Sende-Pfad braucht exakt `frame_samples` grosse Frames. Reste
/// bleiben im Puffer bis der naechste Block sie auffuellt.
pub struct FrameSchneider {
    puffer: Vec<f32>,
    frame_samples: usize,
}

impl FrameSchneider {
    /// Erstellt einen Schneider fuer die gegebene Frame-Groesse
    pub fn neu(frame_samples: usize) -> Self {
        Self {
            puffer: Vec::with_capacity(frame_samples * 2),
            frame_samples,
        }
    }

    /// Schiebt neue Samples in den Puffer
    pub fn schieben(&mut self, samples: &[f32]) {
        self.puffer.extend_from_slice(samples);
    }

    /// Entnimmt den naechsten vollen Frame, falls vorhanden
    pub fn naechster_frame(&mut self) -> Option<Vec<f32>> {
        if self.puffer.len() < self.frame_samples {
            return None;
        }
        let rest = self.puffer.split_off(self.frame_samples);
        let frame = std::mem::replace(&mut self.puffer, rest);
        Some(frame)
    }

    /// Aktuell gepufferte Samples
    pub fn fuellstand(&self) -> usize {
        self.puffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::traits::HostTrait;

    #[test]
    fn schneider_liefert_volle_frames() {
        let mut schneider = FrameSchneider::neu(4);
        schneider.schieben(&[1.0, 2.0, 3.0]);
        assert!(schneider.naechster_frame().is_none());

        schneider.schieben(&[4.0, 5.0]);
        assert_eq!(schneider.naechster_frame(), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert!(schneider.naechster_frame().is_none());
        assert_eq!(schneider.fuellstand(), 1);
    }

    #[test]
    fn schneider_mehrere_frames_aus_einem_block() {
        let mut schneider = FrameSchneider::neu(2);
        schneider.schieben(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(schneider.naechster_frame(), Some(vec![1.0, 2.0]));
        assert_eq!(schneider.naechster_frame(), Some(vec![3.0, 4.0]));
        assert!(schneider.naechster_frame().is_none());
        assert_eq!(schneider.fuellstand(), 1);
    }

    #[test]
    fn capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate, SAMPLE_RATE);
        assert_eq!(config.channels, 1);
        assert!(config.buffer_size > 0);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn capture_stream_oeffnen() {
        let host = cpal::default_host();
        if let Some(device) = host.default_input_device() {
            let config = CaptureConfig::default();
            let result = open_capture_stream(&device, config);
            assert!(result.is_ok(), "Capture-Stream sollte oeffenbar sein");
        }
    }
}

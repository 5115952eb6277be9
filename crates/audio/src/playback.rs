//! Lautsprecher-Ausgabe via cpal
//!
//! Der Ausgabe-Callback zieht seine Samples aus dem
//! [`PlaybackScheduler`](crate::scheduler::PlaybackScheduler) und
//! spiegelt jedes gerenderte Fenster an seiner Uhr-Position in den
//! [`RecordingMixer`](crate::mixer::RecordingMixer). Damit treibt die
//! Soundkarte die Ausgabe-Uhr, und der Mixdown enthaelt exakt das
//! Gespielte.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error};

use crate::codec::{sample_zu_i16, SAMPLE_RATE};
use crate::error::{AudioError, AudioResult};
use crate::mixer::RecordingMixer;
use crate::scheduler::PlaybackScheduler;

/// Konfiguration fuer die Lautsprecher-Ausgabe
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Kanalanzahl (1 = Mono)
    pub channels: u16,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
        }
    }
}

/// Lautsprecher-Stream
///
/// Haelt den cpal-Stream am Leben. Droppen stoppt die Ausgabe.
pub struct PlaybackStream {
    _stream: Stream,
    config: PlaybackConfig,
}

impl PlaybackStream {
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

/// Rendert ein Fenster und spiegelt es in den Mixdown
///
/// Scheduler-Lock vor Mixer-Lock, in dieser Reihenfolge ueberall.
fn fenster_rendern(
    scheduler: &Mutex<PlaybackScheduler>,
    mixer: &Mutex<RecordingMixer>,
    ziel: &mut [f32],
) {
    let position = scheduler.lock().render(ziel);
    mixer.lock().wiedergabe_schreiben_bei(position, ziel);
}

/// Oeffnet die Lautsprecher-Ausgabe auf dem gegebenen Geraet
pub fn open_playback_stream(
    device: &Device,
    config: PlaybackConfig,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    mixer: Arc<Mutex<RecordingMixer>>,
) -> AudioResult<PlaybackStream> {
    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("Playback-Fehler: {}", err);

    let supported = device
        .supported_output_configs()
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
        SampleFormat::F32 => {
            let scheduler = Arc::clone(&scheduler);
            let mixer = Arc::clone(&mixer);
            device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| {
                        fenster_rendern(&scheduler, &mixer, data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        }
        SampleFormat::I16 => {
            let scheduler = Arc::clone(&scheduler);
            let mixer = Arc::clone(&mixer);
            let mut fenster = Vec::new();
            device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _| {
                        fenster.resize(data.len(), 0.0);
                        fenster_rendern(&scheduler, &mixer, &mut fenster);
                        for (ziel, &quelle) in data.iter_mut().zip(fenster.iter()) {
                            *ziel = sample_zu_i16(quelle);
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        }
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
        "Playback-Stream geoeffnet: {}Hz {}ch",
        config.sample_rate, config.channels
    );

    Ok(PlaybackStream {
        _stream: stream,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::traits::HostTrait;

    #[test]
    fn playback_config_default() {
        let config = PlaybackConfig::default();
        assert_eq!(config.sample_rate, SAMPLE_RATE);
        assert_eq!(config.channels, 1);
    }

    #[test]
    fn fenster_landet_in_scheduler_und_mixer() {
        let scheduler = Mutex::new(PlaybackScheduler::neu());
        let mixer = Mutex::new(RecordingMixer::neu(SAMPLE_RATE));

        scheduler.lock().einplanen(vec![0.5; 256]);

        let mut ziel = vec![0.0f32; 128];
        fenster_rendern(&scheduler, &mixer, &mut ziel);
        assert!(ziel.iter().all(|&x| x == 0.5));
        assert_eq!(mixer.lock().laenge(), 128);

        fenster_rendern(&scheduler, &mixer, &mut ziel);
        assert_eq!(mixer.lock().laenge(), 256);
        assert_eq!(scheduler.lock().uhr(), 256);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn playback_stream_oeffnen() {
        let host = cpal::default_host();
        if let Some(device) = host.default_output_device() {
            let scheduler = Arc::new(Mutex::new(PlaybackScheduler::neu()));
            let mixer = Arc::new(Mutex::new(RecordingMixer::neu(SAMPLE_RATE)));
            let result =
                open_playback_stream(&device, PlaybackConfig::default(), scheduler, mixer);
            assert!(result.is_ok(), "Playback-Stream sollte oeffenbar sein");
        }
    }
}

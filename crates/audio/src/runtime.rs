//! Audio-Thread der Sitzung
//!
//! cpal-Streams sind nicht `Send`, deshalb leben Capture und Playback
//! in einem dedizierten Thread. Der Thread schneidet Mikrofon-Samples
//! zu Frames, spiegelt sie in den Mixdown und reicht sie ohne
//! Rueckstau an den Sende-Pfad weiter: ist die Warteschlange voll,
//! wird der Frame verworfen statt den Capture zu blockieren.
//! Steuerung laeuft ueber einen crossbeam-Kommandokanal.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::capture::{open_capture_stream, CaptureConfig, FrameSchneider};
use crate::codec::FRAME_SAMPLES;
use crate::device::{ausgabegeraet_waehlen, eingabegeraet_waehlen};
use crate::error::{AudioError, AudioResult};
use crate::mixer::RecordingMixer;
use crate::playback::{open_playback_stream, PlaybackConfig};
use crate::scheduler::PlaybackScheduler;

/// Abfrage-Intervall des Audio-Threads
const POLL_INTERVALL: Duration = Duration::from_millis(10);

/// Wartezeit auf die Geraete-Initialisierung
const START_ZEITLIMIT: Duration = Duration::from_secs(5);

/// Konfiguration des Audio-Threads
#[derive(Debug, Clone)]
pub struct AudioRuntimeConfig {
    /// Name des Eingabegeraets (None = Standard)
    pub input_device: Option<String>,
    /// Name des Ausgabegeraets (None = Standard)
    pub output_device: Option<String>,
    /// Capture-Konfiguration
    pub capture: CaptureConfig,
    /// Playback-Konfiguration
    pub playback: PlaybackConfig,
    /// Samples pro Sende-Frame
    pub frame_samples: usize,
}

impl Default for AudioRuntimeConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            frame_samples: FRAME_SAMPLES,
        }
    }
}

/// Kommandos an den Audio-Thread
#[derive(Debug)]
enum AudioCommand {
    Beenden,
}

/// Handle auf den laufenden Audio-Thread
pub struct AudioRuntime {
    cmd_tx: Sender<AudioCommand>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl AudioRuntime {
    /// Startet den Audio-Thread und oeffnet beide Geraete
    ///
    /// Blockiert bis die Geraete bereit sind oder die Initialisierung
    /// fehlschlaegt. Geraetefehler sind fatal fuer den Sitzungsstart
    /// und werden hier gemeldet, nicht spaeter.
    pub fn starten(
        config: AudioRuntimeConfig,
        scheduler: Arc<Mutex<PlaybackScheduler>>,
        mixer: Arc<Mutex<RecordingMixer>>,
        frame_tx: tokio::sync::mpsc::Sender<Vec<f32>>,
    ) -> AudioResult<Self> {
        let (cmd_tx, cmd_rx) = bounded::<AudioCommand>(8);
        // Geraete-Initialisierung passiert im Thread; das Ergebnis
        // kommt ueber diesen Einweg-Kanal zurueck.
        let (bereit_tx, bereit_rx) = std::sync::mpsc::sync_channel::<AudioResult<()>>(1);

        let handle = std::thread::Builder::new()
            .name("voicearena-audio".to_string())
            .spawn(move || {
                audio_thread(config, scheduler, mixer, frame_tx, cmd_rx, bereit_tx);
            })
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

        match bereit_rx.recv_timeout(START_ZEITLIMIT) {
            Ok(Ok(())) => {
                info!("Audio-Thread gestartet");
                Ok(Self {
                    cmd_tx,
                    handle: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(AudioError::ThreadAntwortetNicht),
        }
    }

    /// Stoppt den Audio-Thread und gibt beide Geraete frei
    ///
    /// Idempotent; weitere Aufrufe sind wirkungslos.
    pub fn beenden(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.cmd_tx.send(AudioCommand::Beenden);
            if handle.join().is_err() {
                warn!("Audio-Thread unsauber beendet");
            }
        }
    }
}

impl Drop for AudioRuntime {
    fn drop(&mut self) {
        self.beenden();
    }
}

/// Hauptschleife des Audio-Threads
fn audio_thread(
    config: AudioRuntimeConfig,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    mixer: Arc<Mutex<RecordingMixer>>,
    frame_tx: tokio::sync::mpsc::Sender<Vec<f32>>,
    cmd_rx: Receiver<AudioCommand>,
    bereit_tx: std::sync::mpsc::SyncSender<AudioResult<()>>,
) {
    // Streams muessen in diesem Thread gebaut werden und duerfen ihn
    // nicht verlassen.
    let aufbau = (|| {
        let eingabe = eingabegeraet_waehlen(config.input_device.as_deref())?;
        let ausgabe = ausgabegeraet_waehlen(config.output_device.as_deref())?;

        let (capture_stream, consumer) = open_capture_stream(&eingabe, config.capture.clone())?;
        let playback_stream = open_playback_stream(
            &ausgabe,
            config.playback.clone(),
            Arc::clone(&scheduler),
            Arc::clone(&mixer),
        )?;

        Ok::<_, AudioError>((capture_stream, playback_stream, consumer))
    })();

    let (_capture_stream, _playback_stream, mut consumer) = match aufbau {
        Ok(teile) => {
            let _ = bereit_tx.send(Ok(()));
            teile
        }
        Err(e) => {
            let _ = bereit_tx.send(Err(e));
            return;
        }
    };

    let mut schneider = FrameSchneider::neu(config.frame_samples);
    let mut scratch = vec![0.0f32; 1024];
    let mut verworfen: u64 = 0;

    loop {
        // Mikrofon-Samples abholen und zu Frames schneiden
        loop {
            use ringbuf::traits::Consumer;
            let gelesen = consumer.pop_slice(&mut scratch);
            if gelesen == 0 {
                break;
            }
            schneider.schieben(&scratch[..gelesen]);
        }

        while let Some(frame) = schneider.naechster_frame() {
            // Der Mixdown bekommt jeden Frame, auch stummgeschaltete
            mixer.lock().mic_schreiben(&frame);

            match frame_tx.try_send(frame) {
                Ok(()) => {}
                Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                    verworfen += 1;
                    trace!(verworfen, "Sende-Warteschlange voll, Frame verworfen");
                }
                Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                    trace!("Sende-Pfad geschlossen, Frame verworfen");
                }
            }
        }

        match cmd_rx.recv_timeout(POLL_INTERVALL) {
            Ok(AudioCommand::Beenden) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    debug!(verworfen, "Audio-Thread beendet");
}

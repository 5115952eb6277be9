//! Laufende Sprech-Sitzung
//!
//! [`VoiceSession`] besitzt die Ereignis-Schleife einer verbundenen
//! Sitzung: Mikrofon-Frames gehen gated auf den Transport, Agent-Frames
//! landen im Playback-Scheduler. Die Schleife laeuft in einer eigenen
//! tokio-Task bis zum Stopp-Signal oder bis der Transport endet.
//!
//! Zwei unabhaengige Schalter:
//! - `streaming`: gated nur den Versand. Frames werden weiterhin
//!   erzeugt und vom Produzenten in den Mixer gemischt ("stumm" heisst
//!   Aufnahme ohne Wire).
//! - Stopp-Signal: beendet die Schleife und schliesst den Transport.
//!
//! Das Mischen der Mikrofon-Frames ist Sache des Produzenten (Audio-
//! Thread oder Test), nicht dieser Schleife: volle Sende-Queues duerfen
//! Frames fuer den Wire verwerfen, nie fuer die Aufnahme.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use voicearena_audio::{
    decode_pcm16, encode_pcm16, AudioRuntime, PlaybackScheduler, RecordingMixer,
    VersiegelteAufnahme,
};
use voicearena_core::{ArenaError, Result, SessionId};
use voicearena_protocol::AgentEvent;

use crate::transport::AgentTransport;

/// Zeitlimit fuer den Austritt der Ereignis-Schleife beim Beenden
const SCHLEIFEN_ZEITLIMIT: Duration = Duration::from_secs(2);

/// Bausteine einer Sitzung; der Transport muss bereits offen sein
pub struct SitzungsTeile {
    pub session_id: SessionId,
    pub transport: AgentTransport,
    /// Mikrofon-Frames vom Produzenten (Audio-Thread oder extern)
    pub frame_rx: mpsc::Receiver<Vec<f32>>,
    pub scheduler: Arc<Mutex<PlaybackScheduler>>,
    pub mixer: Arc<Mutex<RecordingMixer>>,
    /// Audio-Hardware, falls die Sitzung echte Geraete treibt
    pub audio: Option<AudioRuntime>,
}

/// Eine verbundene Sitzung mit laufender Ereignis-Schleife
pub struct VoiceSession {
    session_id: SessionId,
    stream_id: String,
    streaming: Arc<AtomicBool>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    mixer: Arc<Mutex<RecordingMixer>>,
    audio: Option<AudioRuntime>,
    schleife: JoinHandle<()>,
    stopp_tx: watch::Sender<bool>,
    begonnen: Instant,
}

impl VoiceSession {
    /// Startet die Ereignis-Schleife; das Mikrofon ist anfangs aktiv
    pub fn starten(teile: SitzungsTeile) -> Self {
        let streaming = Arc::new(AtomicBool::new(true));
        let (stopp_tx, stopp_rx) = watch::channel(false);
        let stream_id = teile.transport.stream_id().to_string();

        let schleife = tokio::spawn(ereignis_schleife(
            teile.transport,
            teile.frame_rx,
            Arc::clone(&streaming),
            Arc::clone(&teile.scheduler),
            stopp_rx,
        ));

        info!(session_id = %teile.session_id, stream_id = %stream_id, "Sitzung laeuft");
        Self {
            session_id: teile.session_id,
            stream_id,
            streaming,
            scheduler: teile.scheduler,
            mixer: teile.mixer,
            audio: teile.audio,
            schleife,
            stopp_tx,
            begonnen: Instant::now(),
        }
    }

    /// Stoppt den Versand; Frames werden weiter erzeugt und gemischt
    pub fn mikro_stummschalten(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }

    /// Nimmt den Versand wieder auf
    pub fn mikro_freischalten(&self) {
        self.streaming.store(true, Ordering::SeqCst);
    }

    /// Ist das Mikrofon gerade stumm?
    pub fn ist_stumm(&self) -> bool {
        !self.streaming.load(Ordering::SeqCst)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Kanonische Stream-ID aus dem Handshake
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Beendet die Sitzung und versiegelt die Aufnahme
    ///
    /// Reihenfolge: Versand stoppen, Schleife signalisieren, Audio-
    /// Thread beenden, Schleife abwarten, Mixer auf die Wanduhr-Dauer
    /// versiegeln. Der Transport wird von der Schleife geschlossen.
    pub async fn beenden(mut self) -> Result<VersiegelteAufnahme> {
        self.streaming.store(false, Ordering::SeqCst);
        let _ = self.stopp_tx.send(true);

        if let Some(mut audio) = self.audio.take() {
            audio.beenden();
        }

        match tokio::time::timeout(SCHLEIFEN_ZEITLIMIT, &mut self.schleife).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(fehler = %e, "Ereignis-Schleife endete unsauber"),
            Err(_) => {
                warn!("Ereignis-Schleife reagiert nicht, wird abgebrochen");
                self.schleife.abort();
            }
        }

        let dauer = self.begonnen.elapsed();
        let aufnahme = self
            .mixer
            .lock()
            .versiegeln(dauer)
            .ok_or_else(|| ArenaError::intern("Aufnahme war bereits versiegelt"))?;

        info!(
            session_id = %self.session_id,
            dauer_s = dauer.as_secs_f64(),
            aufnahme_s = aufnahme.dauer().as_secs_f64(),
            "Sitzung beendet, Aufnahme versiegelt"
        );
        Ok(aufnahme)
    }

    /// Statistik des Playback-Schedulers (fuer Anzeige und Tests)
    pub fn scheduler_statistik(&self) -> voicearena_audio::SchedulerStatistik {
        self.scheduler.lock().statistik().clone()
    }
}

/// Die Ereignis-Schleife einer Sitzung
///
/// Endet beim Stopp-Signal, beim Ende des Frame-Kanals oder wenn der
/// Transport schliesst bzw. fehlschlaegt. Schliesst den Transport
/// beim Austritt.
async fn ereignis_schleife(
    mut transport: AgentTransport,
    mut frame_rx: mpsc::Receiver<Vec<f32>>,
    streaming: Arc<AtomicBool>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    mut stopp_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            frame = frame_rx.recv() => match frame {
                Some(samples) => {
                    if !streaming.load(Ordering::SeqCst) {
                        continue;
                    }
                    let ereignis = AgentEvent::media_input(encode_pcm16(&samples));
                    if let Err(e) = transport.senden(ereignis).await {
                        warn!(fehler = %e, "Senden an den Agenten fehlgeschlagen");
                        break;
                    }
                }
                None => {
                    debug!("Frame-Quelle geschlossen, Schleife endet");
                    break;
                }
            },

            ereignis = transport.empfangen() => match ereignis {
                Ok(Some(AgentEvent::MediaOutput { payload })) => {
                    match decode_pcm16(&payload) {
                        Ok(samples) => {
                            transport.unterbrechung_aufheben();
                            scheduler.lock().einplanen(samples);
                        }
                        Err(e) => {
                            // Nur Wire-Fehler sind terminal; ein einzelner
                            // unlesbarer Payload wird verworfen
                            warn!(fehler = %e, "Unlesbarer Media-Frame verworfen");
                        }
                    }
                }
                Ok(Some(AgentEvent::Clear)) => {
                    let verworfen = scheduler.lock().leeren();
                    transport.unterbrechung_markieren();
                    debug!(verworfen, "Agent hat die Wiedergabe geleert");
                }
                Ok(Some(AgentEvent::Ack { stream_id })) => {
                    debug!(stream_id = %stream_id, "Spaetes Ack ignoriert");
                }
                Ok(Some(AgentEvent::Start { .. })) => {
                    debug!("Unerwartetes Start-Ereignis ignoriert");
                }
                Ok(Some(AgentEvent::MediaInput { .. })) => {
                    debug!("Unerwartetes Media-Input-Ereignis ignoriert");
                }
                Ok(Some(AgentEvent::Unbekannt)) => {
                    debug!("Unbekanntes Ereignis verworfen");
                }
                Ok(None) => {
                    info!("Agent hat die Verbindung beendet");
                    break;
                }
                Err(e) => {
                    warn!(fehler = %e, "Transportfehler, Sitzung endet");
                    break;
                }
            },

            _ = stopp_rx.changed() => {
                if *stopp_rx.borrow() {
                    debug!("Stopp-Signal empfangen");
                    break;
                }
            }
        }
    }

    transport.schliessen().await;
}

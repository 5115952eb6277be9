//! Sitzungs-Lebenszyklus auf Client-Seite
//!
//! Der [`SessionController`] fuehrt durch die Phasen
//! `Idle -> Connecting -> Connected -> Ending -> Ended` und haelt
//! hoechstens eine Sitzung zugleich. Der Mikrofon-Zustand
//! (aktiv/stumm) lebt orthogonal dazu und gilt nur waehrend
//! `Connected`.
//!
//! Regeln:
//! - Ein Start waehrend einer laufenden Sitzung schliesst die alte
//!   zuerst erzwungen (siehe DESIGN.md, zur Produktpruefung markiert).
//! - Scheitert der Broker oder der Handshake, geht es zurueck nach
//!   `Idle`; es entsteht kein Datensatz und nichts wird wiederholt.
//! - `beenden` ist unter Nebenlaeufigkeit idempotent: genau ein
//!   Aufrufer versiegelt und laedt hoch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use voicearena_audio::{
    AudioRuntime, AudioRuntimeConfig, PlaybackScheduler, RecordingMixer, SAMPLE_RATE,
};
use voicearena_core::{ArenaError, OrgId, Result, SessionId, UserId};

use crate::broker::{SitzungsAuskunft, SitzungsBroker, StartAnfrage};
use crate::session::{SitzungsTeile, VoiceSession};
use crate::transport::AgentTransport;

// ---------------------------------------------------------------------------
// Phasen und Konfiguration
// ---------------------------------------------------------------------------

/// Phase des Sitzungs-Lebenszyklus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsPhase {
    /// Keine Sitzung, bereit fuer einen Start
    Idle,
    /// Broker-Anfrage und Agent-Handshake laufen
    Connecting,
    /// Sitzung laeuft, Media fliesst
    Connected,
    /// Beenden laeuft: Versiegeln und Aufraeumen
    Ending,
    /// Sitzung beendet; Upload laeuft losgeloest
    Ended,
}

impl std::fmt::Display for SitzungsPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SitzungsPhase::Idle => "idle",
            SitzungsPhase::Connecting => "connecting",
            SitzungsPhase::Connected => "connected",
            SitzungsPhase::Ending => "ending",
            SitzungsPhase::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

/// Mikrofon-Zustand waehrend `Connected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MikrofonZustand {
    Aktiv,
    Stumm,
}

/// Konfiguration der Client-Engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sprach-Tag der Sitzung, z.B. "fr-FR"
    pub language: String,
    /// Trainings-Szenario
    pub playbook: String,
    /// Undurchsichtiger Persona-Text
    pub persona: String,
    pub user_id: UserId,
    pub org_id: OrgId,
    /// Zeitlimit fuer den TCP-Aufbau zum Agenten
    pub verbindungs_zeitlimit: Duration,
    /// Zeitlimit fuer das Ack nach dem Start
    pub handshake_zeitlimit: Duration,
    /// Tiefe der Mikrofon-Frame-Queue zum Transport
    pub frame_queue: usize,
    pub audio: AudioRuntimeConfig,
}

impl EngineConfig {
    /// Standard-Konfiguration fuer einen Benutzer
    pub fn neu(user_id: UserId, org_id: OrgId) -> Self {
        Self {
            language: "en-US".into(),
            playbook: "B2B SaaS Sales".into(),
            persona: String::new(),
            user_id,
            org_id,
            verbindungs_zeitlimit: Duration::from_secs(5),
            handshake_zeitlimit: Duration::from_secs(5),
            frame_queue: 32,
            audio: AudioRuntimeConfig::default(),
        }
    }
}

/// Handle auf eine gestartete Sitzung
///
/// Bei [`SessionController::starten_ohne_geraete`] produziert der
/// Aufrufer die Mikrofon-Frames selbst: jedes Frame zuerst in den
/// Mixer mischen, dann ueber `mic_tx` anbieten. Das Rendern treibt er
/// ueber den Scheduler und spiegelt das Fenster in den Mixer.
#[derive(Debug)]
pub struct SitzungsGriff {
    pub session_id: SessionId,
    /// Kanonische Stream-ID aus dem Handshake
    pub stream_id: String,
    pub mic_tx: mpsc::Sender<Vec<f32>>,
    pub scheduler: Arc<Mutex<PlaybackScheduler>>,
    pub mixer: Arc<Mutex<RecordingMixer>>,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Fuehrt den Lebenszyklus hoechstens einer Sitzung
pub struct SessionController<B> {
    broker: Arc<B>,
    config: EngineConfig,
    phase_tx: watch::Sender<SitzungsPhase>,
    aktiv: tokio::sync::Mutex<Option<VoiceSession>>,
    beenden_laeuft: AtomicBool,
}

impl<B: SitzungsBroker + 'static> SessionController<B> {
    /// Erstellt einen Controller in Phase `Idle`
    pub fn neu(broker: B, config: EngineConfig) -> Self {
        let (phase_tx, _) = watch::channel(SitzungsPhase::Idle);
        Self {
            broker: Arc::new(broker),
            config,
            phase_tx,
            aktiv: tokio::sync::Mutex::new(None),
            beenden_laeuft: AtomicBool::new(false),
        }
    }

    /// Beobachter-Kanal fuer Phasenwechsel
    pub fn phasen(&self) -> watch::Receiver<SitzungsPhase> {
        self.phase_tx.subscribe()
    }

    /// Aktuelle Phase
    pub fn phase(&self) -> SitzungsPhase {
        *self.phase_tx.borrow()
    }

    fn phase_setzen(&self, neu: SitzungsPhase) {
        self.phase_tx.send_replace(neu);
    }

    /// Startet eine Sitzung mit echten Audio-Geraeten
    pub async fn starten(&self) -> Result<SessionId> {
        let griff = self.aufbauen(true).await?;
        Ok(griff.session_id)
    }

    /// Startet eine Sitzung ohne Geraete
    ///
    /// Der Aufrufer produziert Mikrofon-Frames und treibt das Rendern
    /// selbst; siehe [`SitzungsGriff`].
    pub async fn starten_ohne_geraete(&self) -> Result<SitzungsGriff> {
        self.aufbauen(false).await
    }

    async fn aufbauen(&self, mit_geraeten: bool) -> Result<SitzungsGriff> {
        // Beobachtetes Verhalten des Originals: laufende Sitzung wird
        // beim erneuten Start (auch Sprachwechsel) erzwungen geschlossen
        if self.aktiv.lock().await.is_some() {
            warn!("Sitzungsstart bei laufender Sitzung, alte wird geschlossen");
            if let Err(e) = self.beenden().await {
                if !matches!(e, ArenaError::KeineAktiveSitzung) {
                    warn!(fehler = %e, "Erzwungenes Schliessen schlug fehl");
                }
            }
        }

        self.phase_setzen(SitzungsPhase::Connecting);
        match self.verbinden(mit_geraeten).await {
            Ok(griff) => {
                self.phase_setzen(SitzungsPhase::Connected);
                Ok(griff)
            }
            Err(e) => {
                // Kein Datensatz, keine Wiederholung: zurueck nach Idle
                self.phase_setzen(SitzungsPhase::Idle);
                Err(e)
            }
        }
    }

    async fn verbinden(&self, mit_geraeten: bool) -> Result<SitzungsGriff> {
        let anfrage = StartAnfrage {
            language_code: self.config.language.clone(),
            user_id: self.config.user_id,
            org_id: self.config.org_id,
            persona: self.config.persona.clone(),
            playbook: self.config.playbook.clone(),
        };
        let sitzung = self.broker.sitzung_starten(&anfrage).await?;
        info!(
            session_id = %sitzung.session_id,
            agent = %sitzung.agent_addr,
            language = %self.config.language,
            "Sitzung beim Broker angelegt"
        );

        let mut transport =
            AgentTransport::verbinden(&sitzung.agent_addr, self.config.verbindungs_zeitlimit)
                .await?;
        transport
            .eroeffnen(
                &sitzung.stream_id,
                &sitzung.system_prompt,
                sitzung.metadata.clone(),
                self.config.handshake_zeitlimit,
            )
            .await?;

        let scheduler = Arc::new(Mutex::new(PlaybackScheduler::neu()));
        let mixer = Arc::new(Mutex::new(RecordingMixer::neu(SAMPLE_RATE)));
        let (frame_tx, frame_rx) = mpsc::channel(self.config.frame_queue);

        let audio = if mit_geraeten {
            let runtime = AudioRuntime::starten(
                self.config.audio.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&mixer),
                frame_tx.clone(),
            )
            .map_err(|e| ArenaError::Audio(e.to_string()))?;
            Some(runtime)
        } else {
            None
        };

        let session_id = sitzung.session_id;
        let voice = VoiceSession::starten(SitzungsTeile {
            session_id,
            transport,
            frame_rx,
            scheduler: Arc::clone(&scheduler),
            mixer: Arc::clone(&mixer),
            audio,
        });
        let stream_id = voice.stream_id().to_string();
        *self.aktiv.lock().await = Some(voice);

        Ok(SitzungsGriff {
            session_id,
            stream_id,
            mic_tx: frame_tx,
            scheduler,
            mixer,
        })
    }

    /// Stummschalten: Frames werden weiter erzeugt und gemischt,
    /// aber nicht mehr gesendet
    pub async fn stummschalten(&self) -> Result<()> {
        let wache = self.aktiv.lock().await;
        let sitzung = wache.as_ref().ok_or(ArenaError::KeineAktiveSitzung)?;
        sitzung.mikro_stummschalten();
        Ok(())
    }

    /// Nimmt den Versand wieder auf
    pub async fn freischalten(&self) -> Result<()> {
        let wache = self.aktiv.lock().await;
        let sitzung = wache.as_ref().ok_or(ArenaError::KeineAktiveSitzung)?;
        sitzung.mikro_freischalten();
        Ok(())
    }

    /// Mikrofon-Zustand; `None` ohne laufende Sitzung
    pub async fn mikrofon(&self) -> Option<MikrofonZustand> {
        self.aktiv.lock().await.as_ref().map(|s| {
            if s.ist_stumm() {
                MikrofonZustand::Stumm
            } else {
                MikrofonZustand::Aktiv
            }
        })
    }

    /// Beendet die laufende Sitzung und versiegelt die Aufnahme
    ///
    /// Unter Nebenlaeufigkeit idempotent: genau ein Aufrufer gewinnt,
    /// alle weiteren erhalten `KeineAktiveSitzung`. Der Upload der
    /// Aufnahme laeuft als losgeloeste Task; das Ergebnis wird ueber
    /// [`Self::bewertung_abwarten`] sichtbar.
    pub async fn beenden(&self) -> Result<SessionId> {
        if self.beenden_laeuft.swap(true, Ordering::SeqCst) {
            return Err(ArenaError::KeineAktiveSitzung);
        }
        let ergebnis = self.beenden_innen().await;
        self.beenden_laeuft.store(false, Ordering::SeqCst);
        ergebnis
    }

    async fn beenden_innen(&self) -> Result<SessionId> {
        let sitzung = self
            .aktiv
            .lock()
            .await
            .take()
            .ok_or(ArenaError::KeineAktiveSitzung)?;
        let session_id = sitzung.session_id();

        self.phase_setzen(SitzungsPhase::Ending);
        let versiegelt = sitzung.beenden().await;
        self.phase_setzen(SitzungsPhase::Ended);
        let aufnahme = versiegelt?;

        let dauer_sekunden = aufnahme.dauer().as_secs_f64();
        let wav = aufnahme
            .wav_bytes()
            .map_err(|e| ArenaError::Audio(e.to_string()))?;

        // Upload losgeloest; der interaktive Fluss wartet nicht darauf
        let broker = Arc::clone(&self.broker);
        tokio::spawn(async move {
            match broker
                .abschluss_hochladen(session_id, wav, dauer_sekunden)
                .await
            {
                Ok(antwort) => info!(
                    session_id = %antwort.session_id,
                    status = %antwort.status,
                    "Abschluss hochgeladen"
                ),
                Err(e) => warn!(
                    session_id = %session_id,
                    fehler = %e,
                    "Abschluss-Upload fehlgeschlagen"
                ),
            }
        });

        Ok(session_id)
    }

    /// Fragt den Sitzungs-Datensatz wiederholt ab
    ///
    /// Hoechstens `versuche` Abfragen im Abstand `intervall`; bricht
    /// frueher ab, sobald der Status terminal ist. Erschoepfte Versuche
    /// sind kein Fehler, die Bewertung kann noch ausstehen.
    pub async fn bewertung_abwarten(
        &self,
        session_id: SessionId,
        versuche: u32,
        intervall: Duration,
    ) -> Result<SitzungsAuskunft> {
        let mut auskunft = self.broker.sitzung_abfragen(session_id).await?;
        for _ in 1..versuche.max(1) {
            if auskunft.status.ist_terminal() {
                break;
            }
            tokio::time::sleep(intervall).await;
            auskunft = self.broker.sitzung_abfragen(session_id).await?;
        }
        Ok(auskunft)
    }
}

//! Integration-Tests fuer den Sitzungs-Lebenszyklus (Fake-Broker und
//! geskriptete Agenten auf dem Loopback)
//!
//! Die Tests laufen ohne Audio-Geraete: der Testcode produziert die
//! Mikrofon-Frames selbst und treibt die Render-Uhr von Hand, genau
//! wie es sonst der Audio-Callback taete.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;

use voicearena_audio::{encode_pcm16, BYTES_PER_SAMPLE, FRAME_SAMPLES, SAMPLE_RATE};
use voicearena_core::{ArenaError, OrgId, Result, SessionId, SitzungsStatus, UserId};
use voicearena_engine::{
    AbschlussAntwort, BrokerSitzung, EngineConfig, SessionController, SitzungsAuskunft,
    SitzungsBroker, SitzungsGriff, SitzungsPhase, StartAnfrage,
};
use voicearena_protocol::{AgentCodec, AgentEvent};

/// 54 Frames Mikrofon entsprechen gut fuenf Sekunden
const MIC_FRAMES: usize = 54;
/// 22 Frames Agenten-Audio entsprechen gut zwei Sekunden
const BURST_FRAMES: usize = 22;

// ---------------------------------------------------------------------------
// Fake-Broker
// ---------------------------------------------------------------------------

/// Broker-Attrappe mit geteiltem Gedaechtnis fuer Starts und Uploads
#[derive(Clone)]
struct FakeBroker {
    agent_addr: String,
    session_id: SessionId,
    start_schlaegt_fehl: bool,
    starts: Arc<Mutex<Vec<StartAnfrage>>>,
    /// (session_id, WAV-Groesse in Bytes, Dauer in Sekunden)
    abschluesse: Arc<Mutex<Vec<(SessionId, usize, f64)>>>,
}

impl FakeBroker {
    fn neu(agent_addr: SocketAddr) -> Self {
        Self {
            agent_addr: agent_addr.to_string(),
            session_id: SessionId::new(),
            start_schlaegt_fehl: false,
            starts: Arc::new(Mutex::new(Vec::new())),
            abschluesse: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Variante deren Start-Anfrage immer im Zeitlimit verhungert
    fn verhungernd() -> Self {
        Self {
            agent_addr: "127.0.0.1:1".into(),
            session_id: SessionId::new(),
            start_schlaegt_fehl: true,
            starts: Arc::new(Mutex::new(Vec::new())),
            abschluesse: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SitzungsBroker for FakeBroker {
    async fn sitzung_starten(&self, anfrage: &StartAnfrage) -> Result<BrokerSitzung> {
        if self.start_schlaegt_fehl {
            return Err(ArenaError::Zeitlimit("Broker antwortet nicht".into()));
        }
        self.starts.lock().push(anfrage.clone());
        Ok(BrokerSitzung {
            session_id: self.session_id,
            stream_id: format!("arena_agent_{}", self.session_id.inner()),
            agent_addr: self.agent_addr.clone(),
            system_prompt: "Du bist ein skeptischer Einkaufsleiter.".into(),
            metadata: serde_json::json!({ "language_code": anfrage.language_code }),
        })
    }

    async fn abschluss_hochladen(
        &self,
        session_id: SessionId,
        wav_bytes: Vec<u8>,
        dauer_sekunden: f64,
    ) -> Result<AbschlussAntwort> {
        self.abschluesse
            .lock()
            .push((session_id, wav_bytes.len(), dauer_sekunden));
        Ok(AbschlussAntwort {
            session_id,
            status: SitzungsStatus::Completed,
            transkriptions_fehler: None,
        })
    }

    async fn sitzung_abfragen(&self, session_id: SessionId) -> Result<SitzungsAuskunft> {
        Ok(SitzungsAuskunft {
            session_id,
            status: SitzungsStatus::Scored,
            transkript: None,
            bewertung: None,
            fehler: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Agenten-Skripte
// ---------------------------------------------------------------------------

/// Wartet auf das Start-Ereignis und bestaetigt mit derselben Stream-ID
async fn handshake_beantworten(framed: &mut Framed<TcpStream, AgentCodec>) -> String {
    match framed.next().await {
        Some(Ok(AgentEvent::Start { stream_id, .. })) => {
            framed
                .send(AgentEvent::ack(stream_id.clone()))
                .await
                .expect("Ack senden fehlgeschlagen");
            stream_id
        }
        anderes => panic!("Start erwartet, erhalten: {anderes:?}"),
    }
}

/// Produziert die Mikrofon-Frames wie der Audio-Thread: erst mischen,
/// dann anbieten
async fn mic_frame_senden(griff: &SitzungsGriff, frame: Vec<f32>) {
    griff.mixer.lock().mic_schreiben(&frame);
    griff
        .mic_tx
        .send(frame)
        .await
        .expect("Sitzungs-Schleife nimmt keine Frames mehr an");
}

fn test_config(language: &str) -> EngineConfig {
    let mut config = EngineConfig::neu(UserId::new(), OrgId::new());
    config.language = language.into();
    config
}

// ---------------------------------------------------------------------------
// Szenario: fr-FR, fuenf Sekunden Stille, zwei Sekunden Agenten-Burst
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stille_sitzung_mit_burst_ergibt_lange_aufnahme() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = FakeBroker::neu(addr);

    // Agent: nach MIC_FRAMES + 1 Eingaben kommt der Burst am Stueck
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        let _ = handshake_beantworten(&mut framed).await;

        let mut eingaben = 0usize;
        while let Some(Ok(ereignis)) = framed.next().await {
            if matches!(ereignis, AgentEvent::MediaInput { .. }) {
                eingaben += 1;
                if eingaben == MIC_FRAMES + 1 {
                    for _ in 0..BURST_FRAMES {
                        let samples = vec![0.25f32; FRAME_SAMPLES];
                        framed
                            .send(AgentEvent::media_output(encode_pcm16(&samples)))
                            .await
                            .expect("Burst senden fehlgeschlagen");
                    }
                }
            }
        }
    });

    let controller = SessionController::neu(broker.clone(), test_config("fr-FR"));

    // Phasenwechsel mitschreiben
    let mut phasen_rx = controller.phasen();
    let gesehen = Arc::new(Mutex::new(Vec::new()));
    let gesehen_ablage = Arc::clone(&gesehen);
    tokio::spawn(async move {
        while phasen_rx.changed().await.is_ok() {
            gesehen_ablage.lock().push(*phasen_rx.borrow());
        }
    });

    let griff = controller.starten_ohne_geraete().await.unwrap();
    assert_eq!(controller.phase(), SitzungsPhase::Connected);
    assert_eq!(griff.session_id, broker.session_id);

    // Fuenf Sekunden Stille vom Mikrofon
    for _ in 0..MIC_FRAMES {
        mic_frame_senden(&griff, vec![0.0; FRAME_SAMPLES]).await;
    }

    // Die Render-Uhr ebenfalls auf fuenf Sekunden vorruecken; der
    // Scheduler ist noch leer, die Fenster bleiben still
    for _ in 0..MIC_FRAMES {
        let mut fenster = vec![0.0f32; FRAME_SAMPLES];
        let start = griff.scheduler.lock().render(&mut fenster);
        griff.mixer.lock().wiedergabe_schreiben_bei(start, &fenster);
    }
    assert_eq!(
        griff.scheduler.lock().uhr(),
        (MIC_FRAMES * FRAME_SAMPLES) as u64
    );

    // Ausloeser-Frame: der Agent schickt daraufhin den Burst
    mic_frame_senden(&griff, vec![0.0; FRAME_SAMPLES]).await;

    // Warten bis alle Burst-Frames eingeplant sind
    let mut versuche = 0;
    while griff.scheduler.lock().statistik().eingeplant < BURST_FRAMES as u64 {
        versuche += 1;
        assert!(versuche < 500, "Burst kam nie an");
        sleep(Duration::from_millis(10)).await;
    }

    // Burst abspielen: er muss hinter der Uhr liegen, nicht am Anfang
    let mut runden = 0;
    loop {
        let mut fenster = vec![0.0f32; FRAME_SAMPLES];
        let (start, rest) = {
            let mut scheduler = griff.scheduler.lock();
            let start = scheduler.render(&mut fenster);
            (start, scheduler.fuellstand())
        };
        assert!(start >= (MIC_FRAMES * FRAME_SAMPLES) as u64);
        griff.mixer.lock().wiedergabe_schreiben_bei(start, &fenster);
        if rest == 0 {
            break;
        }
        runden += 1;
        assert!(runden < 60, "Burst wird nicht leer gespielt");
    }

    let session_id = controller.beenden().await.unwrap();
    assert_eq!(session_id, broker.session_id);
    assert_eq!(controller.phase(), SitzungsPhase::Ended);

    // Der Upload laeuft losgeloest, also abwarten
    let mut versuche = 0;
    while broker.abschluesse.lock().is_empty() {
        versuche += 1;
        assert!(versuche < 500, "Abschluss-Upload kam nie an");
        sleep(Duration::from_millis(10)).await;
    }

    let (hochgeladen_id, wav_bytes, dauer_sekunden) = broker.abschluesse.lock()[0];
    assert_eq!(hochgeladen_id, broker.session_id);
    assert!(
        dauer_sekunden >= 7.0,
        "Aufnahme muss Stille plus Burst umfassen, war {dauer_sekunden}s"
    );
    assert!(wav_bytes > 7 * SAMPLE_RATE as usize * BYTES_PER_SAMPLE);

    // Genau ein Broker-Start, mit der gewuenschten Sprache
    let starts = broker.starts.lock();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].language_code, "fr-FR");
    drop(starts);

    // Kompletter Phasengang, nichts uebersprungen
    let mut versuche = 0;
    while !gesehen.lock().contains(&SitzungsPhase::Ended) {
        versuche += 1;
        assert!(versuche < 100, "Phase Ended nie beobachtet");
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *gesehen.lock(),
        vec![
            SitzungsPhase::Connecting,
            SitzungsPhase::Connected,
            SitzungsPhase::Ending,
            SitzungsPhase::Ended,
        ]
    );
}

// ---------------------------------------------------------------------------
// Szenario: zwei nebenlaeufige Beenden-Aufrufe
// ---------------------------------------------------------------------------

#[tokio::test]
async fn doppeltes_beenden_laedt_genau_einmal_hoch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = FakeBroker::neu(addr);

    // Agent: bestaetigt und liest dann nur noch mit
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        let _ = handshake_beantworten(&mut framed).await;
        while let Some(Ok(_)) = framed.next().await {}
    });

    let controller = SessionController::neu(broker.clone(), test_config("en-US"));
    let griff = controller.starten_ohne_geraete().await.unwrap();

    for _ in 0..2 {
        mic_frame_senden(&griff, vec![0.1; FRAME_SAMPLES]).await;
    }

    let (erstes, zweites) = tokio::join!(controller.beenden(), controller.beenden());
    let ergebnisse = [erstes, zweites];
    assert_eq!(
        ergebnisse.iter().filter(|e| e.is_ok()).count(),
        1,
        "genau ein Aufrufer darf gewinnen"
    );
    assert!(ergebnisse
        .iter()
        .any(|e| matches!(e, Err(ArenaError::KeineAktiveSitzung))));
    assert_eq!(controller.phase(), SitzungsPhase::Ended);

    let mut versuche = 0;
    while broker.abschluesse.lock().is_empty() {
        versuche += 1;
        assert!(versuche < 500, "Abschluss-Upload kam nie an");
        sleep(Duration::from_millis(10)).await;
    }
    // Kein zweiter Upload, auch nicht verspaetet
    sleep(Duration::from_millis(100)).await;
    assert_eq!(broker.abschluesse.lock().len(), 1);
}

// ---------------------------------------------------------------------------
// Szenario: Broker verhungert im Zeitlimit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broker_zeitlimit_laesst_keine_spuren() {
    // Der Agent existiert, darf aber nie kontaktiert werden
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let broker = FakeBroker::verhungernd();
    let controller = SessionController::neu(broker.clone(), test_config("de-DE"));

    let fehler = controller.starten_ohne_geraete().await.unwrap_err();
    assert!(matches!(fehler, ArenaError::Zeitlimit(_)));
    assert_eq!(controller.phase(), SitzungsPhase::Idle);

    assert!(broker.starts.lock().is_empty());
    assert!(broker.abschluesse.lock().is_empty());
    let niemand = timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(niemand.is_err(), "Agent darf keine Verbindung sehen");

    // Ein frischer Start danach bleibt moeglich (Idle ist kein Endzustand)
    let fehler = controller.starten_ohne_geraete().await.unwrap_err();
    assert!(matches!(fehler, ArenaError::Zeitlimit(_)));
    assert_eq!(controller.phase(), SitzungsPhase::Idle);
}

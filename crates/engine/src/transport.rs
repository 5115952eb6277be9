//! TCP-Transport zum Gespraechs-Agenten
//!
//! Kapselt die Framed-Verbindung (u32-BE-Laenge + JSON) samt
//! Phasen-Maschine und Start/Ack-Handshake. Eine geschlossene
//! Verbindung wird nie wiederverwendet; der Aufrufer baut fuer die
//! naechste Sitzung einen neuen Transport auf.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, warn};
use voicearena_core::{ArenaError, Result};
use voicearena_protocol::{AgentCodec, AgentEvent, PhasenMaschine, TransportPhase};

/// Verbindung zu einem Gespraechs-Agenten
pub struct AgentTransport {
    framed: Framed<TcpStream, AgentCodec>,
    phasen: PhasenMaschine,
    /// Kanonische Stream-ID nach dem Handshake
    stream_id: String,
}

impl AgentTransport {
    /// Baut die TCP-Verbindung zum Agenten auf (Phase bleibt Idle)
    pub async fn verbinden(addr: &str, zeitlimit: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(zeitlimit, TcpStream::connect(addr))
            .await
            .map_err(|_| ArenaError::Zeitlimit(format!("TCP-Verbindung zu {addr}")))?
            .map_err(|e| ArenaError::Verbindung(format!("{addr}: {e}")))?;

        debug!(agent = addr, "TCP-Verbindung zum Agenten steht");
        Ok(Self {
            framed: Framed::new(stream, AgentCodec::new()),
            phasen: PhasenMaschine::new(),
            stream_id: String::new(),
        })
    }

    /// Fuehrt den Start/Ack-Handshake aus
    ///
    /// Sendet `start` mit der vorgeschlagenen Stream-ID und wartet
    /// begrenzt auf das `ack`. Die kanonische ID aus dem Ack gewinnt;
    /// weicht sie vom Vorschlag ab, wird sie uebernommen. Ohne Ack
    /// innerhalb des Zeitlimits ist die Verbindung terminal geschlossen.
    pub async fn eroeffnen(
        &mut self,
        stream_id: &str,
        system_prompt: &str,
        metadata: serde_json::Value,
        zeitlimit: Duration,
    ) -> Result<()> {
        self.phasen
            .wechseln(TransportPhase::Opening)
            .map_err(|e| ArenaError::intern(e.to_string()))?;

        let start = AgentEvent::start(stream_id, system_prompt, metadata);
        if let Err(e) = self.framed.send(start).await {
            self.schliessen().await;
            return Err(ArenaError::Verbindung(format!("Start senden: {e}")));
        }

        match tokio::time::timeout(zeitlimit, Self::ack_erwarten(&mut self.framed)).await {
            Ok(Ok(kanonisch)) => {
                if kanonisch != stream_id {
                    warn!(
                        vorgeschlagen = stream_id,
                        kanonisch = %kanonisch,
                        "Agent hat eine andere Stream-ID vergeben"
                    );
                }
                self.stream_id = kanonisch;
                self.phasen
                    .wechseln(TransportPhase::Open)
                    .map_err(|e| ArenaError::intern(e.to_string()))?;
                debug!(stream_id = %self.stream_id, "Handshake abgeschlossen");
                Ok(())
            }
            Ok(Err(e)) => {
                self.schliessen().await;
                Err(e)
            }
            Err(_) => {
                self.schliessen().await;
                Err(ArenaError::KeinAck)
            }
        }
    }

    /// Wartet auf das Ack und liefert die kanonische Stream-ID
    async fn ack_erwarten(framed: &mut Framed<TcpStream, AgentCodec>) -> Result<String> {
        loop {
            match framed.next().await {
                Some(Ok(AgentEvent::Ack { stream_id })) => return Ok(stream_id),
                Some(Ok(_)) => debug!("Ereignis vor dem Ack verworfen"),
                Some(Err(e)) => return Err(ArenaError::UngueltigeNachricht(e.to_string())),
                None => {
                    return Err(ArenaError::Getrennt(
                        "Agent hat vor dem Ack geschlossen".into(),
                    ))
                }
            }
        }
    }

    /// Sendet ein Ereignis; nur in offenen Phasen erlaubt
    pub async fn senden(&mut self, ereignis: AgentEvent) -> Result<()> {
        if !self.phasen.phase().ist_offen() {
            return Err(ArenaError::Getrennt(format!(
                "Transport nicht offen (Phase {})",
                self.phasen.phase()
            )));
        }
        if let Err(e) = self.framed.send(ereignis).await {
            self.schliessen().await;
            return Err(ArenaError::Verbindung(e.to_string()));
        }
        Ok(())
    }

    /// Empfaengt das naechste Ereignis; `Ok(None)` heisst Verbindungsende
    pub async fn empfangen(&mut self) -> Result<Option<AgentEvent>> {
        if self.phasen.phase().ist_terminal() {
            return Ok(None);
        }
        match self.framed.next().await {
            Some(Ok(ereignis)) => Ok(Some(ereignis)),
            Some(Err(e)) => {
                // Unlesbare Frames sind terminal, keine Wiederaufnahme
                let fehler = if e.kind() == std::io::ErrorKind::InvalidData {
                    ArenaError::UngueltigeNachricht(e.to_string())
                } else {
                    ArenaError::Verbindung(e.to_string())
                };
                self.schliessen().await;
                Err(fehler)
            }
            None => {
                self.schliessen().await;
                Ok(None)
            }
        }
    }

    /// Markiert die Verbindung als unterbrochen (Clear empfangen)
    pub fn unterbrechung_markieren(&mut self) {
        if self.phasen.phase() == TransportPhase::Open {
            let _ = self.phasen.wechseln(TransportPhase::Interrupted);
        }
    }

    /// Hebt die Unterbrechung auf (Agent-Ausgabe fliesst wieder)
    pub fn unterbrechung_aufheben(&mut self) {
        if self.phasen.phase() == TransportPhase::Interrupted {
            let _ = self.phasen.wechseln(TransportPhase::Open);
        }
    }

    /// Schliesst die Verbindung; idempotent
    pub async fn schliessen(&mut self) {
        let _ = self.framed.close().await;
        let phase = self.phasen.phase();
        if !phase.ist_terminal() && phase != TransportPhase::Idle {
            let _ = self.phasen.wechseln(TransportPhase::Closed);
        }
    }

    /// Aktuelle Transport-Phase
    pub fn phase(&self) -> TransportPhase {
        self.phasen.phase()
    }

    /// Kanonische Stream-ID (leer vor dem Handshake)
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const KURZ: Duration = Duration::from_millis(500);

    /// Startet einen Agenten, der das Start-Ereignis mit `ack_id` quittiert
    async fn agent_mit_ack(ack_id: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, AgentCodec::new());
            match framed.next().await {
                Some(Ok(AgentEvent::Start { .. })) => {}
                andere => panic!("Erwartet Start, erhalten: {andere:?}"),
            }
            framed.send(AgentEvent::ack(ack_id)).await.unwrap();
            // Verbindung offen halten bis der Client schliesst
            while let Some(Ok(_)) = framed.next().await {}
        });
        addr
    }

    #[tokio::test]
    async fn handshake_uebernimmt_kanonische_id() {
        let addr = agent_mit_ack("arena_agent_kanonisch").await;

        let mut transport = AgentTransport::verbinden(&addr.to_string(), KURZ)
            .await
            .unwrap();
        transport
            .eroeffnen("vorschlag-1", "prompt", serde_json::Value::Null, KURZ)
            .await
            .unwrap();

        assert_eq!(transport.stream_id(), "arena_agent_kanonisch");
        assert_eq!(transport.phase(), TransportPhase::Open);
    }

    #[tokio::test]
    async fn stummer_agent_liefert_kein_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = AgentTransport::verbinden(&addr.to_string(), KURZ)
            .await
            .unwrap();
        let fehler = transport
            .eroeffnen("s", "p", serde_json::Value::Null, Duration::from_millis(150))
            .await
            .unwrap_err();

        assert!(matches!(fehler, ArenaError::KeinAck));
        assert_eq!(transport.phase(), TransportPhase::Closed);

        // Geschlossen ist terminal: Senden schlaegt fehl
        let senden = transport.senden(AgentEvent::media_input(vec![0, 0])).await;
        assert!(senden.is_err());
    }

    #[tokio::test]
    async fn agent_trennt_vor_dem_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut transport = AgentTransport::verbinden(&addr.to_string(), KURZ)
            .await
            .unwrap();
        let fehler = transport
            .eroeffnen("s", "p", serde_json::Value::Null, KURZ)
            .await
            .unwrap_err();

        assert!(matches!(fehler, ArenaError::Getrennt(_)));
        assert_eq!(transport.phase(), TransportPhase::Closed);
    }

    #[tokio::test]
    async fn verbindung_zu_totem_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fehler = AgentTransport::verbinden(&addr.to_string(), KURZ)
            .await
            .err()
            .expect("Verbindung zu geschlossenem Port muss fehlschlagen");
        assert!(fehler.ist_netzwerk());
    }

    #[tokio::test]
    async fn media_rundreise_nach_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, AgentCodec::new());
            let start = framed.next().await.unwrap().unwrap();
            let AgentEvent::Start { stream_id, .. } = start else {
                panic!("Erwartet Start");
            };
            framed.send(AgentEvent::ack(stream_id)).await.unwrap();
            framed
                .send(AgentEvent::media_output(vec![1, 2, 3, 4]))
                .await
                .unwrap();
            // Ein Media-Input vom Client entgegennehmen
            match framed.next().await {
                Some(Ok(AgentEvent::MediaInput { payload })) => {
                    assert_eq!(payload, vec![9, 9]);
                }
                andere => panic!("Erwartet MediaInput, erhalten: {andere:?}"),
            }
        });

        let mut transport = AgentTransport::verbinden(&addr.to_string(), KURZ)
            .await
            .unwrap();
        transport
            .eroeffnen("s", "p", serde_json::Value::Null, KURZ)
            .await
            .unwrap();

        match transport.empfangen().await.unwrap() {
            Some(AgentEvent::MediaOutput { payload }) => assert_eq!(payload, vec![1, 2, 3, 4]),
            andere => panic!("Erwartet MediaOutput, erhalten: {andere:?}"),
        }

        transport
            .senden(AgentEvent::media_input(vec![9, 9]))
            .await
            .unwrap();
    }

    #[test]
    fn unterbrechung_hin_und_zurueck() {
        // Phasenlogik ohne Netz: direkt an der Maschine
        let mut phasen = PhasenMaschine::new();
        phasen.wechseln(TransportPhase::Opening).unwrap();
        phasen.wechseln(TransportPhase::Open).unwrap();
        phasen.wechseln(TransportPhase::Interrupted).unwrap();
        phasen.wechseln(TransportPhase::Open).unwrap();
        assert!(phasen.phase().ist_offen());
    }
}

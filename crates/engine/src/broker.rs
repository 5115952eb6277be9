//! Broker-Anbindung des Clients
//!
//! Der Broker ist der REST-Dienst, der Sitzungen anlegt, den
//! Agenten-Endpunkt herausgibt und nach dem Ende die versiegelte
//! Aufnahme entgegennimmt. Der Trait ist der Testnaht-Punkt; die
//! Produktion nutzt [`HttpBroker`].
//!
//! Die Methoden sind als `impl Future + Send` deklariert, weil der
//! Controller den Abschluss-Upload als losgeloeste Task startet.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use voicearena_core::{ArenaError, OrgId, Result, SessionId, SitzungsStatus, UserId};

// ---------------------------------------------------------------------------
// Wire-Typen
// ---------------------------------------------------------------------------

/// Anfrage an `POST /api/sitzungen/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAnfrage {
    /// Sprach-Tag der Sitzung, z.B. "fr-FR"
    pub language_code: String,
    pub user_id: UserId,
    pub org_id: OrgId,
    /// Undurchsichtiger Persona-Text (wird nicht interpretiert)
    pub persona: String,
    /// Trainings-Szenario, z.B. "B2B SaaS Sales"
    pub playbook: String,
}

/// Antwort des Brokers auf den Sitzungs-Start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSitzung {
    pub session_id: SessionId,
    /// Vorgeschlagene Stream-ID; das Ack des Agenten kann sie ersetzen
    pub stream_id: String,
    /// TCP-Endpunkt des Agenten, z.B. "127.0.0.1:9400"
    pub agent_addr: String,
    pub system_prompt: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Antwort auf den Abschluss-Upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbschlussAntwort {
    pub session_id: SessionId,
    pub status: SitzungsStatus,
    /// Transkriptions-Fehler, falls die Transkription scheiterte
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transkriptions_fehler: Option<String>,
}

/// Sitzungs-Datensatz aus Sicht eines Abfragenden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitzungsAuskunft {
    pub session_id: SessionId,
    pub status: SitzungsStatus,
    #[serde(default)]
    pub transkript: Option<serde_json::Value>,
    #[serde(default)]
    pub bewertung: Option<serde_json::Value>,
    #[serde(default)]
    pub fehler: Option<String>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Sitzungs-Broker aus Sicht des Clients
pub trait SitzungsBroker: Send + Sync {
    /// Legt eine neue Sitzung an und liefert den Agenten-Endpunkt
    fn sitzung_starten(
        &self,
        anfrage: &StartAnfrage,
    ) -> impl Future<Output = Result<BrokerSitzung>> + Send;

    /// Laedt die versiegelte WAV-Aufnahme einer beendeten Sitzung hoch
    fn abschluss_hochladen(
        &self,
        session_id: SessionId,
        wav_bytes: Vec<u8>,
        dauer_sekunden: f64,
    ) -> impl Future<Output = Result<AbschlussAntwort>> + Send;

    /// Fragt den Sitzungs-Datensatz ab (Status, Transkript, Bewertung)
    fn sitzung_abfragen(
        &self,
        session_id: SessionId,
    ) -> impl Future<Output = Result<SitzungsAuskunft>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP-Implementierung
// ---------------------------------------------------------------------------

/// REST-Client fuer den VoiceArena-Broker
#[derive(Debug, Clone)]
pub struct HttpBroker {
    client: reqwest::Client,
    basis_url: String,
}

impl HttpBroker {
    /// Erstellt einen Broker-Client mit hartem Zeitlimit pro Anfrage
    pub fn neu(basis_url: impl Into<String>, zeitlimit: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(zeitlimit)
            .build()
            .map_err(|e| ArenaError::Verbindung(e.to_string()))?;
        Ok(Self {
            client,
            basis_url: basis_url.into(),
        })
    }

    fn anfrage_fehler(e: reqwest::Error) -> ArenaError {
        if e.is_timeout() {
            ArenaError::Zeitlimit(e.to_string())
        } else {
            ArenaError::Verbindung(e.to_string())
        }
    }

    async fn status_pruefen(antwort: reqwest::Response) -> Result<reqwest::Response> {
        let status = antwort.status();
        if status.is_success() {
            return Ok(antwort);
        }
        let nachricht = antwort.text().await.unwrap_or_default();
        if status.as_u16() == 422 {
            return Err(ArenaError::SpracheNichtUnterstuetzt(nachricht));
        }
        Err(ArenaError::Broker {
            status: status.as_u16(),
            nachricht,
        })
    }
}

impl SitzungsBroker for HttpBroker {
    async fn sitzung_starten(&self, anfrage: &StartAnfrage) -> Result<BrokerSitzung> {
        let antwort = self
            .client
            .post(format!("{}/api/sitzungen/start", self.basis_url))
            .json(anfrage)
            .send()
            .await
            .map_err(Self::anfrage_fehler)?;

        let antwort = Self::status_pruefen(antwort).await?;
        let sitzung: BrokerSitzung = antwort
            .json()
            .await
            .map_err(|e| ArenaError::UngueltigeNachricht(e.to_string()))?;

        debug!(
            session_id = %sitzung.session_id,
            agent = %sitzung.agent_addr,
            "Sitzung beim Broker angelegt"
        );
        Ok(sitzung)
    }

    async fn abschluss_hochladen(
        &self,
        session_id: SessionId,
        wav_bytes: Vec<u8>,
        dauer_sekunden: f64,
    ) -> Result<AbschlussAntwort> {
        let teil = reqwest::multipart::Part::bytes(wav_bytes)
            .file_name("aufnahme.wav")
            .mime_str("audio/wav")
            .map_err(|e| ArenaError::UngueltigeNachricht(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("aufnahme", teil)
            .text("dauer_sekunden", dauer_sekunden.to_string());

        let antwort = self
            .client
            .post(format!(
                "{}/api/sitzungen/{}/abschluss",
                self.basis_url, session_id.inner()
            ))
            .multipart(form)
            .send()
            .await
            .map_err(Self::anfrage_fehler)?;

        let antwort = Self::status_pruefen(antwort).await?;
        antwort
            .json()
            .await
            .map_err(|e| ArenaError::UngueltigeNachricht(e.to_string()))
    }

    async fn sitzung_abfragen(&self, session_id: SessionId) -> Result<SitzungsAuskunft> {
        let antwort = self
            .client
            .get(format!(
                "{}/api/sitzungen/{}",
                self.basis_url, session_id.inner()
            ))
            .send()
            .await
            .map_err(Self::anfrage_fehler)?;

        let antwort = Self::status_pruefen(antwort).await?;
        antwort
            .json()
            .await
            .map_err(|e| ArenaError::UngueltigeNachricht(e.to_string()))
    }
}

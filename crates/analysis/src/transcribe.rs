//! Transkriptions-Anbindung
//!
//! Der Dienst bekommt die versiegelte WAV-Aufnahme plus einen
//! textuellen Kontext-Hinweis und liefert ein zeitgestempeltes,
//! sprechermarkiertes Transkript.

use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{AnalyseError, AnalyseResult};
use crate::types::Transkript;

/// Kontext-Hinweis fuer die Transkription
#[derive(Debug, Clone)]
pub struct TranskriptionsKontext {
    /// Sprach-Tag der Sitzung, z.B. "fr-FR"
    pub language: String,
    /// Freitext-Hinweis (Szenario, Persona-Kurzfassung)
    pub hinweis: String,
}

/// Transkriptions-Collaborator
#[allow(async_fn_in_trait)]
pub trait Transkription: Send + Sync {
    /// Transkribiert eine versiegelte WAV-Aufnahme
    async fn transkribieren(
        &self,
        wav_bytes: &[u8],
        kontext: &TranskriptionsKontext,
    ) -> AnalyseResult<Transkript>;

    /// Prueft ob der Dienst erreichbar ist
    async fn erreichbar(&self) -> bool {
        true
    }
}

/// HTTP-Implementierung des Transkriptionsdienstes
#[derive(Debug, Clone)]
pub struct HttpTranskription {
    client: reqwest::Client,
    basis_url: String,
}

impl HttpTranskription {
    /// Erstellt einen Client mit hartem Zeitlimit pro Anfrage
    pub fn neu(basis_url: impl Into<String>, zeitlimit: Duration) -> AnalyseResult<Self> {
        let client = reqwest::Client::builder().timeout(zeitlimit).build()?;
        Ok(Self {
            client,
            basis_url: basis_url.into(),
        })
    }
}

impl Transkription for HttpTranskription {
    #[instrument(skip(self, wav_bytes), fields(bytes = wav_bytes.len()))]
    async fn transkribieren(
        &self,
        wav_bytes: &[u8],
        kontext: &TranskriptionsKontext,
    ) -> AnalyseResult<Transkript> {
        let teil = reqwest::multipart::Part::bytes(wav_bytes.to_vec())
            .file_name("aufnahme.wav")
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .part("audio", teil)
            .text("language", kontext.language.clone())
            .text("hint", kontext.hinweis.clone());

        let antwort = self
            .client
            .post(format!("{}/transcribe", self.basis_url))
            .multipart(form)
            .send()
            .await?;

        if !antwort.status().is_success() {
            return Err(AnalyseError::DienstStatus {
                status: antwort.status().as_u16(),
                nachricht: antwort.text().await.unwrap_or_default(),
            });
        }

        let transkript: Transkript = antwort
            .json()
            .await
            .map_err(|e| AnalyseError::UngueltigeAntwort(e.to_string()))?;

        debug!(beitraege = transkript.beitraege.len(), "Transkript erhalten");
        Ok(transkript)
    }

    async fn erreichbar(&self) -> bool {
        self.client
            .get(format!("{}/health", self.basis_url))
            .send()
            .await
            .map(|a| a.status().is_success())
            .unwrap_or(false)
    }
}

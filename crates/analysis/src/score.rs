//! Bewertungs-Anbindung
//!
//! Der Dienst bekommt Transkript, Sprach-Tag und Kontext und liefert
//! eine strukturierte Mehrdimensions-Bewertung.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{AnalyseError, AnalyseResult};
use crate::types::{Bewertung, Transkript};

/// Bewertungs-Collaborator
#[allow(async_fn_in_trait)]
pub trait BewertungsDienst: Send + Sync {
    /// Bewertet ein Gespraechs-Transkript
    async fn bewerten(
        &self,
        transkript: &Transkript,
        language: &str,
        kontext: &str,
    ) -> AnalyseResult<Bewertung>;

    /// Prueft ob der Dienst erreichbar ist
    async fn erreichbar(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct BewertungsAnfrage<'a> {
    transcript: &'a Transkript,
    language: &'a str,
    context: &'a str,
}

/// HTTP-Implementierung des Bewertungsdienstes
#[derive(Debug, Clone)]
pub struct HttpBewertung {
    client: reqwest::Client,
    basis_url: String,
}

impl HttpBewertung {
    /// Erstellt einen Client mit hartem Zeitlimit pro Anfrage
    pub fn neu(basis_url: impl Into<String>, zeitlimit: Duration) -> AnalyseResult<Self> {
        let client = reqwest::Client::builder().timeout(zeitlimit).build()?;
        Ok(Self {
            client,
            basis_url: basis_url.into(),
        })
    }
}

impl BewertungsDienst for HttpBewertung {
    #[instrument(skip(self, transkript), fields(beitraege = transkript.beitraege.len()))]
    async fn bewerten(
        &self,
        transkript: &Transkript,
        language: &str,
        kontext: &str,
    ) -> AnalyseResult<Bewertung> {
        let antwort = self
            .client
            .post(format!("{}/score", self.basis_url))
            .json(&BewertungsAnfrage {
                transcript: transkript,
                language,
                context: kontext,
            })
            .send()
            .await?;

        if !antwort.status().is_success() {
            return Err(AnalyseError::DienstStatus {
                status: antwort.status().as_u16(),
                nachricht: antwort.text().await.unwrap_or_default(),
            });
        }

        let bewertung: Bewertung = antwort
            .json()
            .await
            .map_err(|e| AnalyseError::UngueltigeAntwort(e.to_string()))?;

        debug!(overall = bewertung.overall, "Bewertung erhalten");
        Ok(bewertung)
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

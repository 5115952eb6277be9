//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Sitzungs-Broker von der
//! konkreten Datenbank. Die SQLite-Implementierung liegt in
//! [`crate::sqlite`]; Tests koennen die Traits mit Attrappen belegen.

use voicearena_core::{SessionId, SitzungsStatus, UserId};

use crate::error::DbError;
use crate::models::{AnrufRecord, NeueSitzung, NeuerAnruf, SitzungsAbschluss, SitzungsRecord};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://voicearena.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://voicearena.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Repository fuer Sitzungs-Datensaetze
#[allow(async_fn_in_trait)]
pub trait SitzungsRepository: Send + Sync {
    /// Legt beim Broker-Start einen Datensatz mit `status = active` an
    async fn anlegen(&self, daten: NeueSitzung<'_>) -> DbResult<SitzungsRecord>;

    /// Laedt eine Sitzung anhand ihrer ID
    async fn laden(&self, id: SessionId) -> DbResult<Option<SitzungsRecord>>;

    /// Setzt den Status mit Uebergangspruefung
    ///
    /// Unerlaubte Wechsel (z.B. aus einem Terminal-Status heraus)
    /// schlagen mit [`DbError::UngueltigerStatusWechsel`] fehl.
    async fn status_setzen(&self, id: SessionId, status: SitzungsStatus)
        -> DbResult<SitzungsRecord>;

    /// Schliesst eine Sitzung ab: `active -> completed`
    ///
    /// Schreibt Aufnahme-Pfad, Transkript, Dauer und gegebenenfalls
    /// den Transkriptions-Fehler in einem Zug.
    async fn abschliessen(
        &self,
        id: SessionId,
        abschluss: SitzungsAbschluss<'_>,
    ) -> DbResult<SitzungsRecord>;

    /// Haengt die Bewertung an: `completed -> scored`
    async fn bewertung_schreiben(
        &self,
        id: SessionId,
        bewertung: &serde_json::Value,
    ) -> DbResult<SitzungsRecord>;

    /// Markiert die Analyse als gescheitert: `completed -> analysis_failed`
    async fn analyse_fehlgeschlagen(&self, id: SessionId, fehler: &str)
        -> DbResult<SitzungsRecord>;
}

/// Repository fuer Anruf-Datensaetze
#[allow(async_fn_in_trait)]
pub trait AnrufRepository: Send + Sync {
    /// Legt den Anruf zur abgeschlossenen Sitzung an
    ///
    /// Ein zweiter Anruf zur selben Sitzung schlaegt mit
    /// [`DbError::Eindeutigkeit`] fehl.
    async fn anlegen(&self, daten: NeuerAnruf<'_>) -> DbResult<AnrufRecord>;

    /// Laedt den Anruf zu einer Sitzung
    async fn fuer_sitzung(&self, session_id: SessionId) -> DbResult<Option<AnrufRecord>>;

    /// Listet die Anrufe eines Benutzers, neueste zuerst
    async fn fuer_benutzer(&self, user_id: UserId) -> DbResult<Vec<AnrufRecord>>;
}

//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;
use voicearena_core::SitzungsStatus;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Ungueltiger Status-Wechsel: {von} -> {nach}")]
    UngueltigerStatusWechsel {
        von: SitzungsStatus,
        nach: SitzungsStatus,
    },

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interner DB-Fehler: {0}")]
    Intern(String),
}

impl From<DbError> for voicearena_core::ArenaError {
    fn from(e: DbError) -> Self {
        voicearena_core::ArenaError::Datenbank(e.to_string())
    }
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn es sich um einen Eindeutigkeitsfehler handelt
    pub fn ist_eindeutigkeit(&self) -> bool {
        matches!(self, Self::Eindeutigkeit(_))
            || matches!(self, Self::Sqlx(e) if {
                let msg = e.to_string();
                msg.contains("UNIQUE") || msg.contains("unique")
            })
    }
}

//! Fehlertypen der Nachbereitungs-Pipeline

use thiserror::Error;

/// Fehler der Transkriptions- und Bewertungs-Pipeline
#[derive(Debug, Error)]
pub enum AnalyseError {
    #[error("Transkription fehlgeschlagen: {0}")]
    Transkription(String),

    #[error("Bewertung fehlgeschlagen: {0}")]
    Bewertung(String),

    #[error("Dienst antwortete mit Status {status}: {nachricht}")]
    DienstStatus { status: u16, nachricht: String },

    #[error("Ungueltige Dienst-Antwort: {0}")]
    UngueltigeAntwort(String),

    #[error("HTTP-Fehler: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Datenbank-Fehler: {0}")]
    Db(#[from] voicearena_db::DbError),
}

pub type AnalyseResult<T> = Result<T, AnalyseError>;

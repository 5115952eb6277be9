//! Fehlertypen der Broker-API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use voicearena_analysis::AnalyseError;
use voicearena_core::SessionId;
use voicearena_db::DbError;

/// Alle Fehler die ein API-Handler zurueckgeben kann
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Sprache nicht unterstuetzt: {0}")]
    SpracheNichtUnterstuetzt(String),

    #[error("Sitzung nicht gefunden: {0}")]
    NichtGefunden(SessionId),

    #[error("Sitzung ist nicht mehr aktiv: {0}")]
    NichtMehrAktiv(SessionId),

    #[error("Ungueltige Anfrage: {0}")]
    UngueltigeAnfrage(String),

    #[error("Datenbank-Fehler: {0}")]
    Datenbank(#[from] DbError),

    #[error("Analyse-Fehler: {0}")]
    Analyse(#[from] AnalyseError),

    #[error("Interner Fehler: {0}")]
    Intern(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP-Statuscode des Fehlers
    ///
    /// Eindeutigkeits- und Status-Wechsel-Verletzungen sind Konflikte
    /// (doppelter Abschluss), kein Serverversagen.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::SpracheNichtUnterstuetzt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NichtGefunden(_) => StatusCode::NOT_FOUND,
            Self::NichtMehrAktiv(_) => StatusCode::CONFLICT,
            Self::UngueltigeAnfrage(_) => StatusCode::BAD_REQUEST,
            Self::Datenbank(e) | Self::Analyse(AnalyseError::Db(e)) => match e {
                DbError::NichtGefunden(_) => StatusCode::NOT_FOUND,
                DbError::Eindeutigkeit(_) | DbError::UngueltigerStatusWechsel { .. } => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Analyse(_) | Self::Intern(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(fehler = %self, "API-Fehler");
        }
        (status, Json(json!({ "fehler": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicearena_core::SitzungsStatus;

    #[test]
    fn statuscodes() {
        assert_eq!(
            ApiError::SpracheNichtUnterstuetzt("xx".into()).http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::NichtGefunden(SessionId::new()).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::NichtMehrAktiv(SessionId::new()).http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn doppelter_abschluss_ist_konflikt() {
        let fehler = ApiError::Datenbank(DbError::UngueltigerStatusWechsel {
            von: SitzungsStatus::Completed,
            nach: SitzungsStatus::Completed,
        });
        assert_eq!(fehler.http_status(), StatusCode::CONFLICT);

        let fehler = ApiError::Analyse(AnalyseError::Db(DbError::Eindeutigkeit(
            "calls.session_id".into(),
        )));
        assert_eq!(fehler.http_status(), StatusCode::CONFLICT);
    }
}

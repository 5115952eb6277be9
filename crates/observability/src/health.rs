//! Aggregierter Health-Check
//!
//! Der Broker prueft seine drei Abhaengigkeiten (Datenbank,
//! Transkriptionsdienst, Bewertungsdienst) mit kurzen Zeitlimits und
//! fasst sie hier zu einer Antwort zusammen. Ohne Datenbank ist der
//! Broker funktionsunfaehig (`unhealthy`, 503); ein unerreichbarer
//! Nebendienst degradiert nur (`degraded`, 200), damit die Probe
//! laufende Sitzungen nicht abschiesst.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};

/// Gesamtstatus des Health-Checks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Leitet den Gesamtstatus aus den Einzelpruefungen ab
    pub fn aus_teilen(db: bool, transkription: bool, bewertung: bool) -> Self {
        if !db {
            HealthStatus::Unhealthy
        } else if !transkription || !bewertung {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Antwort von `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_erreichbar: bool,
    pub transkription_erreichbar: bool,
    pub bewertung_erreichbar: bool,
}

impl HealthResponse {
    /// Baut die Antwort aus den drei Einzelpruefungen
    pub fn neu(db: bool, transkription: bool, bewertung: bool, uptime_seconds: u64) -> Self {
        Self {
            status: HealthStatus::aus_teilen(db, transkription, bewertung),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
            db_erreichbar: db,
            transkription_erreichbar: transkription,
            bewertung_erreichbar: bewertung,
        }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alles_gesund() {
        let antwort = HealthResponse::neu(true, true, true, 42);
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.status.http_status(), StatusCode::OK);
    }

    #[test]
    fn ohne_datenbank_unhealthy() {
        assert_eq!(
            HealthStatus::aus_teilen(false, true, true),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::Unhealthy.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn nebendienst_degradiert_nur() {
        assert_eq!(
            HealthStatus::aus_teilen(true, false, true),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::aus_teilen(true, true, false),
            HealthStatus::Degraded
        );
        assert_eq!(HealthStatus::Degraded.http_status(), StatusCode::OK);
    }

    #[test]
    fn antwort_serialisierung() {
        let antwort = HealthResponse::neu(true, false, true, 3600);
        let json = serde_json::to_string(&antwort).unwrap();
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"transkription_erreichbar\":false"));
        assert!(json.contains("\"bewertung_erreichbar\":true"));
    }

    #[test]
    fn antwort_deserialisierung() {
        let json = r#"{"status":"healthy","version":"0.1.0","uptime_seconds":100,"db_erreichbar":true,"transkription_erreichbar":true,"bewertung_erreichbar":true}"#;
        let antwort: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert!(antwort.db_erreichbar);
    }
}

//! Aggregierter Health-Check des Brokers

use std::time::Duration;

use axum::extract::State;
use tokio::time::timeout;

use voicearena_analysis::{BewertungsDienst, Transkription};
use voicearena_observability::HealthResponse;

use crate::state::AppState;

/// Zeitlimit pro Einzelpruefung; die Probe darf nicht haengen
const PRUEF_ZEITLIMIT: Duration = Duration::from_secs(2);

/// `GET /health`
///
/// Prueft Datenbank, Transkriptions- und Bewertungsdienst parallel.
/// Ohne Datenbank antwortet der Broker 503, unerreichbare Nebendienste
/// degradieren nur.
pub async fn health(State(state): State<AppState>) -> HealthResponse {
    let (db, transkription, bewertung) = tokio::join!(
        state.db.ping(),
        timeout(PRUEF_ZEITLIMIT, state.transkription.erreichbar()),
        timeout(PRUEF_ZEITLIMIT, state.bewertung.erreichbar()),
    );

    HealthResponse::neu(
        db,
        transkription.unwrap_or(false),
        bewertung.unwrap_or(false),
        state.gestartet.elapsed().as_secs(),
    )
}

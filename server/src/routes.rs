//! Route-Definitionen der Broker-API

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Obergrenze fuer Abschluss-Uploads; eine halbe Stunde PCM-WAV
/// liegt bei rund 160 MB
const UPLOAD_LIMIT_BYTES: usize = 256 * 1024 * 1024;

/// Erstellt den vollstaendigen API-Router
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/sitzungen/start",
            post(handlers::sitzungen::sitzung_starten),
        )
        .route(
            "/api/sitzungen/:id/abschluss",
            post(handlers::sitzungen::sitzung_abschliessen),
        )
        .route(
            "/api/sitzungen/:id",
            get(handlers::sitzungen::sitzung_abfragen),
        )
        .route("/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
}

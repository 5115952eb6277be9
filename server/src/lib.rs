//! voicearena-server – Bibliotheks-Root
//!
//! Der Broker legt Sitzungen an, vermittelt den Agent-Endpunkt,
//! nimmt nach Sitzungsende die versiegelte Aufnahme entgegen und
//! stoesst Transkription und Bewertung an.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use anyhow::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Haelt den laufenden Broker zusammen
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Broker aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Broker und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let bind = self.config.server.bind.clone();
        let state = AppState::aufbauen(self.config).await?;

        let app = routes::api_router()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(&bind).await?;
        tracing::info!(adresse = %bind, "Broker gestartet");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Broker beendet");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown-Signal empfangen"),
        Err(e) => tracing::error!(fehler = %e, "Shutdown-Signal nicht verfuegbar"),
    }
}

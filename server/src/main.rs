//! VoiceArena Broker – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den
//! Broker.

use anyhow::Result;
use voicearena_observability::logging_initialisieren;
use voicearena_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("VOICEARENA_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "VoiceArena Broker wird initialisiert"
    );

    Server::neu(config).starten().await
}

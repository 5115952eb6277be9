//! VoiceArena Client – Einstiegspunkt
//!
//! Fuehrt eine Live-Sitzung von Anfang bis Ende: Sitzung beim Broker
//! anfordern, mit dem Agenten sprechen, auf Kommando beenden und
//! anschliessend das Bewertungs-Ergebnis abfragen.
//!
//! Kommandos auf stdin, eines pro Zeile:
//! - `stumm` / `laut`: Mikrofon-Versand aus- und wieder einschalten
//! - `status`: aktuelle Phase und Mikrofon-Zustand anzeigen
//! - `ende` (oder Ctrl-C / EOF): Sitzung beenden

mod config;

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use voicearena_core::{OrgId, UserId};
use voicearena_engine::{
    EngineConfig, HttpBroker, MikrofonZustand, SessionController, SitzungsAuskunft,
};
use voicearena_observability::logging_initialisieren;

use config::ClientConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("VOICEARENA_CLIENT_CONFIG").unwrap_or_else(|_| "client.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        broker = %config.broker.url,
        language = %config.sitzung.language,
        "VoiceArena Client startet"
    );

    let broker = HttpBroker::neu(
        config.broker.url.clone(),
        Duration::from_secs(config.broker.zeitlimit_sekunden),
    )?;
    let controller = SessionController::neu(broker, engine_config(&config));

    let session_id = controller.starten().await?;
    println!("Sitzung {session_id} laeuft. Kommandos: stumm | laut | status | ende");

    kommando_schleife(&controller).await?;

    println!("Sitzung wird beendet …");
    let session_id = controller.beenden().await?;

    // Die Bewertung laeuft losgeloest auf dem Broker; hier nur abfragen
    let auskunft = controller
        .bewertung_abwarten(
            session_id,
            config.abfrage.versuche,
            Duration::from_secs(config.abfrage.intervall_sekunden),
        )
        .await?;
    ergebnis_ausgeben(&auskunft);

    Ok(())
}

fn engine_config(config: &ClientConfig) -> EngineConfig {
    let user_id = config.sitzung.user_id.map(UserId).unwrap_or_default();
    let org_id = config.sitzung.org_id.map(OrgId).unwrap_or_default();

    let mut engine = EngineConfig::neu(user_id, org_id);
    engine.language = config.sitzung.language.clone();
    engine.playbook = config.sitzung.playbook.clone();
    engine.persona = config.sitzung.persona.clone();
    engine.audio.input_device = config.audio.eingabegeraet.clone();
    engine.audio.output_device = config.audio.ausgabegeraet.clone();
    engine
}

/// Liest Kommandos von stdin bis `ende`, EOF oder Ctrl-C
async fn kommando_schleife<B: voicearena_engine::SitzungsBroker + 'static>(
    controller: &SessionController<B>,
) -> Result<()> {
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            zeile = zeilen.next_line() => match zeile? {
                Some(zeile) => match zeile.trim() {
                    "" => {}
                    "stumm" => {
                        controller.stummschalten().await?;
                        println!("Mikrofon stumm (Aufnahme laeuft weiter)");
                    }
                    "laut" => {
                        controller.freischalten().await?;
                        println!("Mikrofon aktiv");
                    }
                    "status" => {
                        let mikro = match controller.mikrofon().await {
                            Some(MikrofonZustand::Aktiv) => "aktiv",
                            Some(MikrofonZustand::Stumm) => "stumm",
                            None => "-",
                        };
                        println!("Phase: {}, Mikrofon: {mikro}", controller.phase());
                    }
                    "ende" => return Ok(()),
                    unbekannt => println!("Unbekanntes Kommando: {unbekannt}"),
                },
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

fn ergebnis_ausgeben(auskunft: &SitzungsAuskunft) {
    println!("Sitzung {}: Status {}", auskunft.session_id, auskunft.status);

    if let Some(fehler) = &auskunft.fehler {
        println!("Gemeldeter Fehler: {fehler}");
    }
    match &auskunft.bewertung {
        Some(bewertung) => match serde_json::to_string_pretty(bewertung) {
            Ok(text) => println!("Bewertung:\n{text}"),
            Err(e) => warn!(fehler = %e, "Bewertung nicht darstellbar"),
        },
        None => {
            // Erschoepfte Abfragen sind kein Fehler; die Bewertung kann
            // noch ausstehen und spaeter erneut abgefragt werden.
            println!("Noch keine Bewertung vorhanden (Sitzung: {})", auskunft.status);
        }
    }
}

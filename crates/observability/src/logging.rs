//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, mit der Konfigurationsdatei
//! als Rueckfallebene:
//! - `VA_LOG_LEVEL`: Log-Level (trace/debug/info/warn/error), Standard: info
//! - `VA_LOG_FORMAT`: Format (text/json), Standard: text

use tracing_subscriber::{fmt, EnvFilter};

/// Initialisiert das Logging-System.
///
/// `level` und `format` kommen aus der Konfiguration; die
/// Umgebungsvariablen `VA_LOG_LEVEL` und `VA_LOG_FORMAT` gewinnen,
/// wenn sie gesetzt sind. `VA_LOG_LEVEL` akzeptiert auch volle
/// EnvFilter-Direktiven wie `info,voicearena_engine=debug`.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env("VA_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env =
        std::env::var("VA_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    match format_env.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

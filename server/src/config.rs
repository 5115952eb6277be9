//! Broker-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Broker ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use voicearena_observability::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Broker-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP-Einstellungen des Brokers
    pub server: ServerEinstellungen,
    /// Agent-Endpunkt der an Clients ausgegeben wird
    pub agent: AgentEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Ablage der versiegelten Aufnahmen
    pub speicher: SpeicherEinstellungen,
    /// Transkriptions- und Bewertungsdienst
    pub dienste: DienstEinstellungen,
    /// Zugelassene Sprach-Tags
    pub sprachen: SprachEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// HTTP-Einstellungen des Brokers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Bind-Adresse der REST-API
    pub bind: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8800".into(),
        }
    }
}

/// Agent-Endpunkt der an Clients ausgegeben wird
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEinstellungen {
    /// TCP-Adresse des Konversations-Agenten
    pub addr: String,
}

impl Default for AgentEinstellungen {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9400".into(),
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://voicearena.db".into(),
            max_verbindungen: 5,
        }
    }
}

/// Ablage der versiegelten Aufnahmen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Verzeichnis fuer WAV-Aufnahmen
    pub aufnahme_verzeichnis: String,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            aufnahme_verzeichnis: "aufnahmen".into(),
        }
    }
}

/// Transkriptions- und Bewertungsdienst
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DienstEinstellungen {
    /// Basis-URL des Transkriptionsdienstes
    pub transkription_url: String,
    /// Basis-URL des Bewertungsdienstes
    pub bewertung_url: String,
    /// Zeitlimit pro Dienst-Anfrage in Sekunden
    pub zeitlimit_sekunden: u64,
}

impl Default for DienstEinstellungen {
    fn default() -> Self {
        Self {
            transkription_url: "http://127.0.0.1:9500".into(),
            bewertung_url: "http://127.0.0.1:9600".into(),
            zeitlimit_sekunden: 30,
        }
    }
}

/// Zugelassene Sprach-Tags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SprachEinstellungen {
    pub verfuegbar: Vec<String>,
}

impl Default for SprachEinstellungen {
    fn default() -> Self {
        Self {
            verfuegbar: vec![
                "en-US".into(),
                "de-DE".into(),
                "fr-FR".into(),
                "es-ES".into(),
            ],
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if !log_level_gueltig(&config.logging.level) {
            tracing::warn!(level = %config.logging.level, "Unbekanntes Log-Level");
        }
        if !log_format_gueltig(&config.logging.format) {
            tracing::warn!(format = %config.logging.format, "Unbekanntes Log-Format");
        }

        Ok(config)
    }

    /// Prueft ob ein Sprach-Tag zugelassen ist
    pub fn sprache_zugelassen(&self, tag: &str) -> bool {
        self.sprachen.verfuegbar.iter().any(|s| s == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:8800");
        assert_eq!(cfg.datenbank.max_verbindungen, 5);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.sprache_zugelassen("fr-FR"));
        assert!(!cfg.sprache_zugelassen("xx-XX"));
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            bind = "127.0.0.1:9000"

            [agent]
            addr = "10.0.0.5:9400"

            [sprachen]
            verfuegbar = ["fr-FR"]
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.agent.addr, "10.0.0.5:9400");
        assert!(cfg.sprache_zugelassen("fr-FR"));
        assert!(!cfg.sprache_zugelassen("en-US"));
        // Nicht angegebene Sektionen behalten Standardwerte
        assert_eq!(cfg.dienste.zeitlimit_sekunden, 30);
        assert_eq!(cfg.speicher.aufnahme_verzeichnis, "aufnahmen");
    }
}

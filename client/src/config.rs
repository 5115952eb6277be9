//! Client-Konfiguration
//!
//! Gleiche Mechanik wie beim Broker: TOML-Datei mit Standardwerten
//! fuer jede Sektion, sodass der Client auch ohne Datei startet.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voicearena_observability::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Broker-Endpunkt
    pub broker: BrokerEinstellungen,
    /// Parameter der zu startenden Sitzung
    pub sitzung: SitzungsEinstellungen,
    /// Audio-Geraete (None = Systemstandard)
    pub audio: AudioEinstellungen,
    /// Abfrage des Bewertungs-Ergebnisses nach dem Ende
    pub abfrage: AbfrageEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Broker-Endpunkt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerEinstellungen {
    /// Basis-URL der Broker-REST-API
    pub url: String,
    /// Zeitlimit pro Broker-Anfrage in Sekunden
    pub zeitlimit_sekunden: u64,
}

impl Default for BrokerEinstellungen {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8800".into(),
            zeitlimit_sekunden: 10,
        }
    }
}

/// Parameter der zu startenden Sitzung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Sprach-Tag, z.B. "fr-FR"
    pub language: String,
    /// Trainings-Szenario
    pub playbook: String,
    /// Undurchsichtiger Persona-Text fuer den Agenten
    pub persona: String,
    /// Benutzer-ID; ohne Angabe wird eine neue erzeugt
    pub user_id: Option<Uuid>,
    /// Organisations-ID; ohne Angabe wird eine neue erzeugt
    pub org_id: Option<Uuid>,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            playbook: "B2B SaaS Sales".into(),
            persona: String::new(),
            user_id: None,
            org_id: None,
        }
    }
}

/// Audio-Geraete
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Name des Eingabegeraets (None = Standard)
    pub eingabegeraet: Option<String>,
    /// Name des Ausgabegeraets (None = Standard)
    pub ausgabegeraet: Option<String>,
}

/// Abfrage des Bewertungs-Ergebnisses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbfrageEinstellungen {
    /// Hoechstzahl der Abfragen nach dem Sitzungsende
    pub versuche: u32,
    /// Abstand zwischen zwei Abfragen in Sekunden
    pub intervall_sekunden: u64,
}

impl Default for AbfrageEinstellungen {
    fn default() -> Self {
        Self {
            versuche: 30,
            intervall_sekunden: 2,
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

impl ClientConfig {
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
}

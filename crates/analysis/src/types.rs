//! Transkript- und Bewertungs-Typen
//!
//! Die Feldnamen entsprechen dem JSON der Dienste und werden
//! unveraendert in der Datenbank abgelegt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sprecher eines Gespraechsbeitrags
///
/// Der Transkriptionsdienst liefert fuer die Agent-Seite teils
/// "assistant"; das wird beim Einlesen auf `Agent` abgebildet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprecherRolle {
    User,
    #[serde(alias = "assistant")]
    Agent,
}

/// Ein Gespraechsbeitrag mit Zeitstempel in Sekunden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranskriptBeitrag {
    pub role: SprecherRolle,
    pub text: String,
    pub timestamp: f64,
}

/// Zeitgestempeltes, sprechermarkiertes Transkript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transkript {
    pub beitraege: Vec<TranskriptBeitrag>,
}

impl Transkript {
    pub fn ist_leer(&self) -> bool {
        self.beitraege.is_empty()
    }

    /// Serialisiert das Transkript fuer die Ablage in der Datenbank
    pub fn als_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Gespraechstext als Fliesstext, Beitrag pro Zeile
    pub fn als_text(&self) -> String {
        self.beitraege
            .iter()
            .map(|b| {
                let rolle = match b.role {
                    SprecherRolle::User => "User",
                    SprecherRolle::Agent => "Agent",
                };
                format!("{rolle}: {}", b.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Strukturierte Mehrdimensions-Bewertung eines Gespraechs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bewertung {
    /// Gesamtwert 0-100
    pub overall: u8,
    /// Einzeldimensionen 0-100, z.B. "Einwandbehandlung"
    #[serde(default)]
    pub dimensions: BTreeMap<String, u8>,
    /// Qualitative Zusammenfassung
    #[serde(default)]
    pub summary: String,
}

impl Bewertung {
    pub fn als_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

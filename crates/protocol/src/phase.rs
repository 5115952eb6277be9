//! Phasen-Modell der Agenten-Verbindung
//!
//! Eine Verbindung durchlaeuft ihre Phasen strikt vorwaerts:
//! `Idle -> Opening -> Open`. Aus `Open` heraus wechselt sie bei einem
//! Barge-in nach `Interrupted` und mit dem naechsten Media-Frame wieder
//! zurueck. `Closed` ist terminal; eine geschlossene Verbindung wird nie
//! wiederverwendet, der Aufrufer baut stattdessen eine neue auf.

use serde::{Deserialize, Serialize};

/// Phase einer Agenten-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportPhase {
    /// Kein Verbindungsversuch gestartet
    Idle,
    /// Start gesendet, warte auf Ack
    Opening,
    /// Handshake abgeschlossen, Media fliesst
    Open,
    /// Agent-Ausgabe per Clear unterbrochen
    Interrupted,
    /// Verbindung beendet (terminal)
    Closed,
}

impl TransportPhase {
    /// Prueft ob ein Wechsel in die Zielphase erlaubt ist
    pub fn kann_wechseln_zu(&self, ziel: TransportPhase) -> bool {
        use TransportPhase::*;
        matches!(
            (self, ziel),
            (Idle, Opening)
                | (Opening, Open)
                | (Opening, Closed)
                | (Open, Interrupted)
                | (Open, Closed)
                | (Interrupted, Open)
                | (Interrupted, Closed)
        )
    }

    /// Terminal-Phasen erlauben keinen weiteren Wechsel
    pub fn ist_terminal(&self) -> bool {
        matches!(self, TransportPhase::Closed)
    }

    /// Media-Frames duerfen nur in offenen Phasen fliessen
    pub fn ist_offen(&self) -> bool {
        matches!(self, TransportPhase::Open | TransportPhase::Interrupted)
    }
}

impl std::fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportPhase::Idle => "idle",
            TransportPhase::Opening => "opening",
            TransportPhase::Open => "open",
            TransportPhase::Interrupted => "interrupted",
            TransportPhase::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Ungueltiger Phasenwechsel
#[derive(Debug, Clone, thiserror::Error)]
#[error("Ungueltiger Phasenwechsel: {von} -> {nach}")]
pub struct UngueltigerUebergang {
    pub von: TransportPhase,
    pub nach: TransportPhase,
}

/// Phasen-Maschine mit validierten Uebergaengen
///
/// Haelt die aktuelle Phase und lehnt unerlaubte Wechsel ab. Die
/// Maschine selbst ist nicht thread-sicher; der Besitzer synchronisiert.
#[derive(Debug, Clone)]
pub struct PhasenMaschine {
    aktuell: TransportPhase,
}

impl PhasenMaschine {
    /// Neue Maschine in `Idle`
    pub fn new() -> Self {
        Self {
            aktuell: TransportPhase::Idle,
        }
    }

    /// Aktuelle Phase
    pub fn phase(&self) -> TransportPhase {
        self.aktuell
    }

    /// Wechselt in die Zielphase, falls erlaubt
    pub fn wechseln(&mut self, ziel: TransportPhase) -> Result<(), UngueltigerUebergang> {
        if !self.aktuell.kann_wechseln_zu(ziel) {
            return Err(UngueltigerUebergang {
                von: self.aktuell,
                nach: ziel,
            });
        }
        self.aktuell = ziel;
        Ok(())
    }
}

impl Default for PhasenMaschine {
    fn default() -> Self {
        Self::new()
    }
}

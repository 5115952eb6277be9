//! Lebenszyklus-Status eines dauerhaften Sitzungs-Datensatzes
//!
//! Der Status wandert einspurig: `active -> completed -> {scored |
//! analysis_failed}`. Die beiden Endzustaende sind terminal – eine
//! fehlgeschlagene Analyse wird nicht automatisch wiederholt.

use serde::{Deserialize, Serialize};

/// Status eines Sitzungs-Datensatzes in der Datenbank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SitzungsStatus {
    /// Sitzung laeuft (Datensatz beim Broker-Start angelegt)
    Active,
    /// Sitzung beendet, Aufnahme und Transkript liegen vor
    Completed,
    /// Bewertung erfolgreich angehaengt (terminal)
    Scored,
    /// Bewertung fehlgeschlagen (terminal)
    AnalysisFailed,
}

impl SitzungsStatus {
    /// Gibt die Datenbank-Repraesentation zurueck
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Scored => "scored",
            Self::AnalysisFailed => "analysis_failed",
        }
    }

    /// Prueft ob der Uebergang zu `neu` erlaubt ist
    pub fn kann_wechseln_zu(&self, neu: SitzungsStatus) -> bool {
        matches!(
            (self, neu),
            (Self::Active, Self::Completed)
                | (Self::Completed, Self::Scored)
                | (Self::Completed, Self::AnalysisFailed)
        )
    }

    /// Terminal-Status? Dann findet kein weiterer Uebergang statt.
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Scored | Self::AnalysisFailed)
    }
}

impl std::fmt::Display for SitzungsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl std::str::FromStr for SitzungsStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "scored" => Ok(Self::Scored),
            "analysis_failed" => Ok(Self::AnalysisFailed),
            other => Err(format!("Unbekannter Sitzungs-Status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_rundreise() {
        for s in [
            SitzungsStatus::Active,
            SitzungsStatus::Completed,
            SitzungsStatus::Scored,
            SitzungsStatus::AnalysisFailed,
        ] {
            assert_eq!(SitzungsStatus::from_str(s.als_str()).unwrap(), s);
        }
    }

    #[test]
    fn erlaubte_uebergaenge() {
        assert!(SitzungsStatus::Active.kann_wechseln_zu(SitzungsStatus::Completed));
        assert!(SitzungsStatus::Completed.kann_wechseln_zu(SitzungsStatus::Scored));
        assert!(SitzungsStatus::Completed.kann_wechseln_zu(SitzungsStatus::AnalysisFailed));
    }

    #[test]
    fn verbotene_uebergaenge() {
        // Rueckwaerts oder aus einem Terminal-Status heraus: nie erlaubt
        assert!(!SitzungsStatus::Completed.kann_wechseln_zu(SitzungsStatus::Active));
        assert!(!SitzungsStatus::Scored.kann_wechseln_zu(SitzungsStatus::Completed));
        assert!(!SitzungsStatus::AnalysisFailed.kann_wechseln_zu(SitzungsStatus::Scored));
        assert!(!SitzungsStatus::Active.kann_wechseln_zu(SitzungsStatus::Scored));
    }

    #[test]
    fn terminal_erkennung() {
        assert!(SitzungsStatus::Scored.ist_terminal());
        assert!(SitzungsStatus::AnalysisFailed.ist_terminal());
        assert!(!SitzungsStatus::Active.ist_terminal());
        assert!(!SitzungsStatus::Completed.ist_terminal());
    }

    #[test]
    fn status_ist_serde_kompatibel() {
        let json = serde_json::to_string(&SitzungsStatus::AnalysisFailed).unwrap();
        assert_eq!(json, "\"analysis_failed\"");
        let s: SitzungsStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(s, SitzungsStatus::AnalysisFailed);
    }
}

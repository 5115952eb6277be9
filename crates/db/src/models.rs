//! Datensatz-Typen der dauerhaften Ablage

use chrono::{DateTime, Utc};
use voicearena_core::{CallId, OrgId, SessionId, SitzungsStatus, UserId};

/// Dauerhafter Sitzungs-Datensatz (Tabelle `voice_sessions`)
///
/// Wird beim Broker-Start mit `status = active` angelegt. Aufnahme,
/// Transkript und Bewertung kommen erst nach Sitzungsende dazu.
#[derive(Debug, Clone)]
pub struct SitzungsRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub org_id: OrgId,
    /// Sprach-Tag der Sitzung, z.B. "fr-FR"
    pub language: String,
    /// Trainings-Szenario, z.B. "B2B SaaS Sales"
    pub scenario: String,
    /// Persona-Text, als opaker String uebernommen
    pub persona: String,
    pub status: SitzungsStatus,
    /// Pfad der gespeicherten WAV-Aufnahme
    pub aufnahme_pfad: Option<String>,
    /// Transkript als JSON (Liste von Gespraechsbeitraegen)
    pub transkript: Option<serde_json::Value>,
    /// Bewertung als JSON (Gesamtwert, Dimensionen, Zusammenfassung)
    pub bewertung: Option<serde_json::Value>,
    /// Letzter Pipeline-Fehler (Transkription oder Bewertung)
    pub fehler: Option<String>,
    pub dauer_sekunden: Option<f64>,
    pub erstellt_am: DateTime<Utc>,
    pub beendet_am: Option<DateTime<Utc>>,
}

/// Eingabedaten fuer einen neuen Sitzungs-Datensatz
#[derive(Debug, Clone)]
pub struct NeueSitzung<'a> {
    pub id: SessionId,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub language: &'a str,
    pub scenario: &'a str,
    pub persona: &'a str,
}

/// Abschluss-Daten einer beendeten Sitzung
///
/// `transkript = None` bedeutet: Transkription fehlgeschlagen; der
/// Datensatz wird trotzdem abgeschlossen und `fehler` gesetzt.
#[derive(Debug, Clone)]
pub struct SitzungsAbschluss<'a> {
    pub aufnahme_pfad: Option<&'a str>,
    pub transkript: Option<&'a serde_json::Value>,
    pub fehler: Option<&'a str>,
    pub dauer_sekunden: f64,
}

/// Dauerhafter Anruf-Datensatz (Tabelle `calls`)
///
/// Genau ein Anruf pro abgeschlossener Sitzung; die Eindeutigkeit
/// sichert die Datenbank ueber `UNIQUE(session_id)`.
#[derive(Debug, Clone)]
pub struct AnrufRecord {
    pub id: CallId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub language: String,
    pub scenario: String,
    pub dauer_sekunden: f64,
    pub erstellt_am: DateTime<Utc>,
}

/// Eingabedaten fuer einen neuen Anruf-Datensatz
#[derive(Debug, Clone)]
pub struct NeuerAnruf<'a> {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub language: &'a str,
    pub scenario: &'a str,
    pub dauer_sekunden: f64,
}

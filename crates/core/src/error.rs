//! Fehlertypen fuer VoiceArena
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer VoiceArena
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Alle moeglichen Fehler im VoiceArena-System
#[derive(Debug, Error)]
pub enum ArenaError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Broker ---
    #[error("Broker-Anfrage fehlgeschlagen (Status {status}): {nachricht}")]
    Broker { status: u16, nachricht: String },

    #[error("Sprache nicht unterstuetzt: {0}")]
    SpracheNichtUnterstuetzt(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Kein Acknowledgement vom Agenten erhalten")]
    KeinAck,

    // --- Sitzung ---
    #[error("Sitzung laeuft bereits")]
    SitzungLaeuftBereits,

    #[error("Keine aktive Sitzung")]
    KeineAktiveSitzung,

    // --- Audio ---
    #[error("Audiofehler: {0}")]
    Audio(String),

    // --- Nachbereitung ---
    #[error("Transkription fehlgeschlagen: {0}")]
    Transkription(String),

    #[error("Bewertung fehlgeschlagen: {0}")]
    Bewertung(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Datenbank ---
    #[error("Datenbankfehler: {0}")]
    Datenbank(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ArenaError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler aus dem Netzwerk stammt
    ///
    /// Netzwerkfehler beenden die laufende Sitzung, werden aber nie
    /// automatisch wiederholt – die bereits aufgenommene Seite wird
    /// trotzdem versiegelt und hochgeladen.
    pub fn ist_netzwerk(&self) -> bool {
        matches!(
            self,
            Self::Verbindung(_) | Self::Getrennt(_) | Self::Zeitlimit(_)
        )
    }
}

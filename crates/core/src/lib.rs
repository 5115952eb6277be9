//! voicearena-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen VoiceArena-Crates gemeinsam genutzt werden: ID-Newtypes, den
//! zentralen Fehler-Enum und den Lebenszyklus-Status einer Sitzung.

pub mod error;
pub mod status;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ArenaError, Result};
pub use status::SitzungsStatus;
pub use types::{CallId, OrgId, SessionId, UserId};

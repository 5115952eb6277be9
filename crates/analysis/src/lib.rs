//! Nachbereitung abgeschlossener Sprech-Sitzungen
//!
//! Die Aufnahme einer Sitzung durchlaeuft zwei externe Dienste:
//! Transkription (WAV zu Gespraechs-Transkript) und Bewertung
//! (Transkript zu Punktzahl). Beide sind als Traits geschnitten,
//! damit Tests ohne laufende Dienste auskommen; die HTTP-Anbindungen
//! sprechen schlichtes JSON ueber `reqwest`.
//!
//! [`pipeline`] verdrahtet beide Stufen mit den Datenbank-Repositories.

pub mod error;
pub mod pipeline;
pub mod score;
pub mod transcribe;
pub mod types;

pub use error::{AnalyseError, AnalyseResult};
pub use pipeline::{
    abschluss_verarbeiten, bewertung_nachlauf, AbschlussEingabe, AbschlussErgebnis,
};
pub use score::{BewertungsDienst, HttpBewertung};
pub use transcribe::{HttpTranskription, Transkription, TranskriptionsKontext};
pub use types::{Bewertung, SprecherRolle, Transkript, TranskriptBeitrag};

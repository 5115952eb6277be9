//! # VoiceArena DB
//!
//! Dauerhafte Ablage der Sitzungs- und Anruf-Datensaetze hinter dem
//! Repository-Pattern. Die SQLite-Implementierung (WAL-Modus,
//! eingebettete Migrationen) ist der Standard; Tests laufen gegen
//! eine In-Memory-Datenbank.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use models::{AnrufRecord, NeueSitzung, NeuerAnruf, SitzungsAbschluss, SitzungsRecord};
pub use repository::{AnrufRepository, DatabaseConfig, DbResult, SitzungsRepository};
pub use sqlite::SqliteDb;

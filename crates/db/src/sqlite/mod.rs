//! SQLite-Implementierung der Repositories

mod anrufe;
mod pool;
mod sitzungen;

pub use pool::SqliteDb;

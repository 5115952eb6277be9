//! # voicearena-observability
//!
//! Observability fuer VoiceArena:
//! - Structured Logging via tracing-subscriber (`VA_LOG_LEVEL`,
//!   `VA_LOG_FORMAT`)
//! - Typen fuer den aggregierten Health-Check des Brokers

pub mod health;
pub mod logging;

pub use health::{HealthResponse, HealthStatus};
pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};

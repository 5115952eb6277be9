//! Geteilter Zustand der Broker-Handler

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use voicearena_analysis::{HttpBewertung, HttpTranskription};
use voicearena_core::SessionId;
use voicearena_db::{DatabaseConfig, SqliteDb};

use crate::config::ServerConfig;

/// Eintrag im Register der laufenden Sitzungen
///
/// Das Entfernen des Eintrags ist die Eintrittskarte fuer den
/// Abschluss: genau eine Anfrage bekommt ihn.
#[derive(Debug, Clone)]
pub struct LiveSitzung {
    pub stream_id: String,
    pub begonnen: DateTime<Utc>,
}

/// Axum-State des Brokers
#[derive(Clone)]
pub struct AppState {
    pub db: SqliteDb,
    pub transkription: HttpTranskription,
    pub bewertung: HttpBewertung,
    /// Laufende Sitzungen, vom Start bis zum Abschluss
    pub live: Arc<DashMap<SessionId, LiveSitzung>>,
    pub config: Arc<ServerConfig>,
    pub gestartet: Instant,
}

impl AppState {
    /// Baut den State aus der Konfiguration auf
    ///
    /// Oeffnet die Datenbank (inklusive Migrationen) und erstellt die
    /// HTTP-Clients fuer Transkription und Bewertung.
    pub async fn aufbauen(config: ServerConfig) -> anyhow::Result<Self> {
        let db = SqliteDb::oeffnen(&DatabaseConfig {
            url: config.datenbank.url.clone(),
            max_verbindungen: config.datenbank.max_verbindungen,
            sqlite_wal: true,
        })
        .await?;

        Self::mit_db(config, db)
    }

    /// Baut den State mit einer bereits geoeffneten Datenbank
    pub fn mit_db(config: ServerConfig, db: SqliteDb) -> anyhow::Result<Self> {
        let zeitlimit = Duration::from_secs(config.dienste.zeitlimit_sekunden);
        let transkription =
            HttpTranskription::neu(config.dienste.transkription_url.clone(), zeitlimit)?;
        let bewertung = HttpBewertung::neu(config.dienste.bewertung_url.clone(), zeitlimit)?;

        Ok(Self {
            db,
            transkription,
            bewertung,
            live: Arc::new(DashMap::new()),
            config: Arc::new(config),
            gestartet: Instant::now(),
        })
    }
}

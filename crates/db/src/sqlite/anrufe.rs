//! SQLite-Implementierung des AnrufRepository

use chrono::Utc;
use uuid::Uuid;
use voicearena_core::{CallId, OrgId, SessionId, UserId};

use crate::error::DbError;
use crate::models::{AnrufRecord, NeuerAnruf};
use crate::repository::{AnrufRepository, DbResult};
use crate::sqlite::pool::SqliteDb;

impl AnrufRepository for SqliteDb {
    async fn anlegen(&self, daten: NeuerAnruf<'_>) -> DbResult<AnrufRecord> {
        let id = CallId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO calls (id, session_id, user_id, org_id, language, scenario, dauer_sekunden, erstellt_am)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.inner().to_string())
        .bind(daten.session_id.inner().to_string())
        .bind(daten.user_id.inner().to_string())
        .bind(daten.org_id.inner().to_string())
        .bind(daten.language)
        .bind(daten.scenario)
        .bind(daten.dauer_sekunden)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!(
                    "Anruf fuer Sitzung {} existiert bereits",
                    daten.session_id
                ))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(AnrufRecord {
            id,
            session_id: daten.session_id,
            user_id: daten.user_id,
            org_id: daten.org_id,
            language: daten.language.to_string(),
            scenario: daten.scenario.to_string(),
            dauer_sekunden: daten.dauer_sekunden,
            erstellt_am: now,
        })
    }

    async fn fuer_sitzung(&self, session_id: SessionId) -> DbResult<Option<AnrufRecord>> {
        let row = sqlx::query(
            "SELECT id, session_id, user_id, org_id, language, scenario, dauer_sekunden, erstellt_am
             FROM calls WHERE session_id = ?",
        )
        .bind(session_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_anruf(&r)).transpose()
    }

    async fn fuer_benutzer(&self, user_id: UserId) -> DbResult<Vec<AnrufRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, user_id, org_id, language, scenario, dauer_sekunden, erstellt_am
             FROM calls WHERE user_id = ? ORDER BY erstellt_am DESC",
        )
        .bind(user_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_anruf).collect()
    }
}

fn row_to_anruf(row: &sqlx::sqlite::SqliteRow) -> DbResult<AnrufRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{id_str}': {e}")))?;

    let session_str: String = row.try_get("session_id")?;
    let session_id = Uuid::parse_str(&session_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{session_str}': {e}")))?;

    let user_str: String = row.try_get("user_id")?;
    let user_id = Uuid::parse_str(&user_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{user_str}': {e}")))?;

    let org_str: String = row.try_get("org_id")?;
    let org_id = Uuid::parse_str(&org_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{org_str}': {e}")))?;

    let erstellt_str: String = row.try_get("erstellt_am")?;
    let erstellt_am = chrono::DateTime::parse_from_rfc3339(&erstellt_str)
        .map_err(|e| DbError::intern(format!("Ungueltige erstellt_am '{erstellt_str}': {e}")))?
        .with_timezone(&Utc);

    Ok(AnrufRecord {
        id: CallId(id),
        session_id: SessionId(session_id),
        user_id: UserId(user_id),
        org_id: OrgId(org_id),
        language: row.try_get("language")?,
        scenario: row.try_get("scenario")?,
        dauer_sekunden: row.try_get("dauer_sekunden")?,
        erstellt_am,
    })
}

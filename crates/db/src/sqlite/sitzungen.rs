//! SQLite-Implementierung des SitzungsRepository

use chrono::Utc;
use uuid::Uuid;
use voicearena_core::{OrgId, SessionId, SitzungsStatus, UserId};

use crate::error::DbError;
use crate::models::{NeueSitzung, SitzungsAbschluss, SitzungsRecord};
use crate::repository::{DbResult, SitzungsRepository};
use crate::sqlite::pool::SqliteDb;

const SELECT_SPALTEN: &str = "SELECT id, user_id, org_id, language, scenario, persona, status, \
     aufnahme_pfad, transkript, bewertung, fehler, dauer_sekunden, erstellt_am, beendet_am \
     FROM voice_sessions";

impl SitzungsRepository for SqliteDb {
    async fn anlegen(&self, daten: NeueSitzung<'_>) -> DbResult<SitzungsRecord> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO voice_sessions (id, user_id, org_id, language, scenario, persona, status, erstellt_am)
             VALUES (?, ?, ?, ?, ?, ?, 'active', ?)",
        )
        .bind(daten.id.inner().to_string())
        .bind(daten.user_id.inner().to_string())
        .bind(daten.org_id.inner().to_string())
        .bind(daten.language)
        .bind(daten.scenario)
        .bind(daten.persona)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!("Sitzung {} bereits vorhanden", daten.id))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(SitzungsRecord {
            id: daten.id,
            user_id: daten.user_id,
            org_id: daten.org_id,
            language: daten.language.to_string(),
            scenario: daten.scenario.to_string(),
            persona: daten.persona.to_string(),
            status: SitzungsStatus::Active,
            aufnahme_pfad: None,
            transkript: None,
            bewertung: None,
            fehler: None,
            dauer_sekunden: None,
            erstellt_am: now,
            beendet_am: None,
        })
    }

    async fn laden(&self, id: SessionId) -> DbResult<Option<SitzungsRecord>> {
        let sql = format!("{SELECT_SPALTEN} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_sitzung(&r)).transpose()
    }

    async fn status_setzen(
        &self,
        id: SessionId,
        status: SitzungsStatus,
    ) -> DbResult<SitzungsRecord> {
        let aktuell = self
            .laden(id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Sitzung {id}")))?;

        if !aktuell.status.kann_wechseln_zu(status) {
            return Err(DbError::UngueltigerStatusWechsel {
                von: aktuell.status,
                nach: status,
            });
        }

        // Bedingtes UPDATE: der alte Status ist Teil der WHERE-Klausel,
        // konkurrierende Wechsel verlieren deterministisch.
        let affected = sqlx::query("UPDATE voice_sessions SET status = ? WHERE id = ? AND status = ?")
            .bind(status.als_str())
            .bind(id.inner().to_string())
            .bind(aktuell.status.als_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            let jetzt = self
                .laden(id)
                .await?
                .ok_or_else(|| DbError::nicht_gefunden(format!("Sitzung {id}")))?;
            return Err(DbError::UngueltigerStatusWechsel {
                von: jetzt.status,
                nach: status,
            });
        }

        self.laden(id)
            .await?
            .ok_or_else(|| DbError::intern("Sitzung nach Status-Wechsel nicht gefunden"))
    }

    async fn abschliessen(
        &self,
        id: SessionId,
        abschluss: SitzungsAbschluss<'_>,
    ) -> DbResult<SitzungsRecord> {
        let beendet = Utc::now();
        let transkript_text = abschluss.transkript.map(|t| t.to_string());

        let affected = sqlx::query(
            "UPDATE voice_sessions
             SET status = 'completed', aufnahme_pfad = ?, transkript = ?, fehler = ?,
                 dauer_sekunden = ?, beendet_am = ?
             WHERE id = ? AND status = 'active'",
        )
        .bind(abschluss.aufnahme_pfad)
        .bind(transkript_text)
        .bind(abschluss.fehler)
        .bind(abschluss.dauer_sekunden)
        .bind(beendet.to_rfc3339())
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            let jetzt = self
                .laden(id)
                .await?
                .ok_or_else(|| DbError::nicht_gefunden(format!("Sitzung {id}")))?;
            return Err(DbError::UngueltigerStatusWechsel {
                von: jetzt.status,
                nach: SitzungsStatus::Completed,
            });
        }

        self.laden(id)
            .await?
            .ok_or_else(|| DbError::intern("Sitzung nach Abschluss nicht gefunden"))
    }

    async fn bewertung_schreiben(
        &self,
        id: SessionId,
        bewertung: &serde_json::Value,
    ) -> DbResult<SitzungsRecord> {
        let affected = sqlx::query(
            "UPDATE voice_sessions SET status = 'scored', bewertung = ?
             WHERE id = ? AND status = 'completed'",
        )
        .bind(bewertung.to_string())
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            let jetzt = self
                .laden(id)
                .await?
                .ok_or_else(|| DbError::nicht_gefunden(format!("Sitzung {id}")))?;
            return Err(DbError::UngueltigerStatusWechsel {
                von: jetzt.status,
                nach: SitzungsStatus::Scored,
            });
        }

        self.laden(id)
            .await?
            .ok_or_else(|| DbError::intern("Sitzung nach Bewertung nicht gefunden"))
    }

    async fn analyse_fehlgeschlagen(
        &self,
        id: SessionId,
        fehler: &str,
    ) -> DbResult<SitzungsRecord> {
        let affected = sqlx::query(
            "UPDATE voice_sessions SET status = 'analysis_failed', fehler = ?
             WHERE id = ? AND status = 'completed'",
        )
        .bind(fehler)
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            let jetzt = self
                .laden(id)
                .await?
                .ok_or_else(|| DbError::nicht_gefunden(format!("Sitzung {id}")))?;
            return Err(DbError::UngueltigerStatusWechsel {
                von: jetzt.status,
                nach: SitzungsStatus::AnalysisFailed,
            });
        }

        self.laden(id)
            .await?
            .ok_or_else(|| DbError::intern("Sitzung nach Analyse-Fehler nicht gefunden"))
    }
}

fn row_to_sitzung(row: &sqlx::sqlite::SqliteRow) -> DbResult<SitzungsRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{id_str}': {e}")))?;

    let user_str: String = row.try_get("user_id")?;
    let user_id = Uuid::parse_str(&user_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{user_str}': {e}")))?;

    let org_str: String = row.try_get("org_id")?;
    let org_id = Uuid::parse_str(&org_str)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID '{org_str}': {e}")))?;

    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<SitzungsStatus>()
        .map_err(DbError::UngueltigeDaten)?;

    let transkript: Option<String> = row.try_get("transkript")?;
    let transkript = transkript
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    let bewertung: Option<String> = row.try_get("bewertung")?;
    let bewertung = bewertung
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    let erstellt_str: String = row.try_get("erstellt_am")?;
    let erstellt_am = chrono::DateTime::parse_from_rfc3339(&erstellt_str)
        .map_err(|e| DbError::intern(format!("Ungueltige erstellt_am '{erstellt_str}': {e}")))?
        .with_timezone(&Utc);

    let beendet: Option<String> = row.try_get("beendet_am")?;
    let beendet_am = beendet
        .as_deref()
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::intern(format!("Ungueltige beendet_am '{s}': {e}")))
        })
        .transpose()?;

    Ok(SitzungsRecord {
        id: SessionId(id),
        user_id: UserId(user_id),
        org_id: OrgId(org_id),
        language: row.try_get("language")?,
        scenario: row.try_get("scenario")?,
        persona: row.try_get("persona")?,
        status,
        aufnahme_pfad: row.try_get("aufnahme_pfad")?,
        transkript,
        bewertung,
        fehler: row.try_get("fehler")?,
        dauer_sekunden: row.try_get("dauer_sekunden")?,
        erstellt_am,
        beendet_am,
    })
}

//! REST-Handler fuer Sitzungs-Endpunkte
//!
//! Der Abschluss arbeitet mit einer Eintrittskarte: das Entfernen des
//! Live-Eintrags entscheidet, welche Anfrage die Sitzung abschliessen
//! darf. Damit entsteht nie ein zweiter Anruf-Datensatz, auch wenn
//! zwei Uploads gleichzeitig eintreffen; die Datenbank sichert das
//! zusaetzlich ueber `UNIQUE(session_id)` ab.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use voicearena_analysis::{abschluss_verarbeiten, bewertung_nachlauf, AbschlussEingabe};
use voicearena_core::{OrgId, SessionId, SitzungsStatus, UserId};
use voicearena_db::{NeueSitzung, SitzungsRepository};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, LiveSitzung};

// ---------------------------------------------------------------------------
// Wire-Typen
// ---------------------------------------------------------------------------

/// Anfrage an `POST /api/sitzungen/start`
#[derive(Debug, Deserialize)]
pub struct StartKoerper {
    pub language_code: String,
    pub user_id: UserId,
    pub org_id: OrgId,
    /// Undurchsichtiger Persona-Text, wird unveraendert weitergereicht
    #[serde(default)]
    pub persona: String,
    /// Trainings-Szenario
    #[serde(default)]
    pub playbook: String,
}

/// Antwort auf den Sitzungs-Start
#[derive(Debug, Serialize)]
pub struct StartAntwort {
    pub session_id: SessionId,
    pub stream_id: String,
    pub agent_addr: String,
    pub system_prompt: String,
    pub metadata: serde_json::Value,
}

/// Antwort auf den Abschluss-Upload
#[derive(Debug, Serialize)]
pub struct AbschlussAntwort {
    pub session_id: SessionId,
    pub status: SitzungsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transkriptions_fehler: Option<String>,
}

/// Sitzungs-Datensatz fuer Abfragende
#[derive(Debug, Serialize)]
pub struct SitzungsAuskunft {
    pub session_id: SessionId,
    pub status: SitzungsStatus,
    pub transkript: Option<serde_json::Value>,
    pub bewertung: Option<serde_json::Value>,
    pub fehler: Option<String>,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// `POST /api/sitzungen/start`
///
/// Prueft die Sprache, legt den Datensatz mit `status = active` an und
/// traegt die Sitzung ins Live-Register ein.
pub async fn sitzung_starten(
    State(state): State<AppState>,
    Json(anfrage): Json<StartKoerper>,
) -> ApiResult<Json<StartAntwort>> {
    if !state.config.sprache_zugelassen(&anfrage.language_code) {
        return Err(ApiError::SpracheNichtUnterstuetzt(anfrage.language_code));
    }

    let id = SessionId::new();
    let sitzung = SitzungsRepository::anlegen(
        &state.db,
        NeueSitzung {
            id,
            user_id: anfrage.user_id,
            org_id: anfrage.org_id,
            language: &anfrage.language_code,
            scenario: &anfrage.playbook,
            persona: &anfrage.persona,
        },
    )
    .await?;

    let stream_id = format!("arena_agent_{}", anfrage.user_id.inner());
    state.live.insert(
        id,
        LiveSitzung {
            stream_id: stream_id.clone(),
            begonnen: Utc::now(),
        },
    );

    info!(
        session_id = %id,
        user_id = %anfrage.user_id,
        language = %sitzung.language,
        "Sitzung angelegt"
    );

    Ok(Json(StartAntwort {
        session_id: id,
        stream_id,
        agent_addr: state.config.agent.addr.clone(),
        system_prompt: sitzung.persona,
        metadata: json!({
            "language_code": sitzung.language,
            "user_id": anfrage.user_id,
            "org_id": anfrage.org_id,
            "playbook": sitzung.scenario,
        }),
    }))
}

/// `POST /api/sitzungen/:id/abschluss`
///
/// Multipart-Teile: `aufnahme` (WAV) und `dauer_sekunden`. Antwortet
/// nach Transkription und Datensatz-Erzeugung; die Bewertung laeuft
/// als losgeloeste Task weiter.
pub async fn sitzung_abschliessen(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    mut teile: Multipart,
) -> ApiResult<Json<AbschlussAntwort>> {
    let (wav_bytes, dauer_sekunden) = abschluss_teile_lesen(&mut teile).await?;

    // Eintrittskarte: nur wer den Live-Eintrag entfernt, schliesst ab
    let eintrag = match state.live.remove(&id) {
        Some((_, eintrag)) => eintrag,
        None => {
            return match SitzungsRepository::laden(&state.db, id).await? {
                Some(_) => Err(ApiError::NichtMehrAktiv(id)),
                None => Err(ApiError::NichtGefunden(id)),
            };
        }
    };

    let pfad_text = aufnahme_speichern(&state, id, &wav_bytes).await?;

    let ergebnis = match abschluss_verarbeiten(
        &state.db,
        &state.transkription,
        AbschlussEingabe {
            session_id: id,
            wav_bytes: &wav_bytes,
            aufnahme_pfad: Some(&pfad_text),
            dauer_sekunden,
        },
    )
    .await
    {
        Ok(ergebnis) => ergebnis,
        Err(fehler) => {
            // Eintrittskarte zurueckgeben, der Upload darf wiederholt werden
            state.live.insert(id, eintrag);
            return Err(fehler.into());
        }
    };

    // Bewertung nur mit Transkript; ohne bleibt die Sitzung `completed`
    if let Some(transkript) = ergebnis.transkript.clone() {
        let db = state.db.clone();
        let dienst = state.bewertung.clone();
        let language = ergebnis.sitzung.language.clone();
        let kontext = ergebnis.sitzung.scenario.clone();
        tokio::spawn(async move {
            if let Err(e) = bewertung_nachlauf(db, dienst, id, transkript, language, kontext).await
            {
                warn!(session_id = %id, fehler = %e, "Bewertungs-Nachlauf fehlgeschlagen");
            }
        });
    }

    info!(
        session_id = %id,
        stream_id = %eintrag.stream_id,
        dauer_sekunden,
        transkribiert = ergebnis.transkript.is_some(),
        "Sitzung abgeschlossen"
    );

    Ok(Json(AbschlussAntwort {
        session_id: id,
        status: ergebnis.sitzung.status,
        transkriptions_fehler: ergebnis.transkriptions_fehler,
    }))
}

/// `GET /api/sitzungen/:id`
pub async fn sitzung_abfragen(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> ApiResult<Json<SitzungsAuskunft>> {
    let sitzung = SitzungsRepository::laden(&state.db, id)
        .await?
        .ok_or(ApiError::NichtGefunden(id))?;

    Ok(Json(SitzungsAuskunft {
        session_id: sitzung.id,
        status: sitzung.status,
        transkript: sitzung.transkript,
        bewertung: sitzung.bewertung,
        fehler: sitzung.fehler,
    }))
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Liest die Multipart-Teile `aufnahme` und `dauer_sekunden`
async fn abschluss_teile_lesen(teile: &mut Multipart) -> ApiResult<(Vec<u8>, f64)> {
    let mut wav_bytes: Option<Vec<u8>> = None;
    let mut dauer_sekunden: Option<f64> = None;

    while let Some(feld) = teile
        .next_field()
        .await
        .map_err(|e| ApiError::UngueltigeAnfrage(e.to_string()))?
    {
        let name = feld.name().unwrap_or_default().to_string();
        match name.as_str() {
            "aufnahme" => {
                let bytes = feld
                    .bytes()
                    .await
                    .map_err(|e| ApiError::UngueltigeAnfrage(e.to_string()))?;
                wav_bytes = Some(bytes.to_vec());
            }
            "dauer_sekunden" => {
                let text = feld
                    .text()
                    .await
                    .map_err(|e| ApiError::UngueltigeAnfrage(e.to_string()))?;
                let wert = text.trim().parse().map_err(|_| {
                    ApiError::UngueltigeAnfrage(format!("dauer_sekunden unlesbar: {text}"))
                })?;
                dauer_sekunden = Some(wert);
            }
            _ => {}
        }
    }

    let wav_bytes = wav_bytes
        .ok_or_else(|| ApiError::UngueltigeAnfrage("Multipart-Teil 'aufnahme' fehlt".into()))?;
    let dauer_sekunden = dauer_sekunden.ok_or_else(|| {
        ApiError::UngueltigeAnfrage("Multipart-Teil 'dauer_sekunden' fehlt".into())
    })?;
    Ok((wav_bytes, dauer_sekunden))
}

/// Legt die WAV-Datei im Aufnahme-Verzeichnis ab
async fn aufnahme_speichern(
    state: &AppState,
    id: SessionId,
    wav_bytes: &[u8],
) -> ApiResult<String> {
    let verzeichnis = std::path::Path::new(&state.config.speicher.aufnahme_verzeichnis);
    tokio::fs::create_dir_all(verzeichnis)
        .await
        .map_err(|e| ApiError::Intern(anyhow::anyhow!("Aufnahme-Verzeichnis: {e}")))?;

    let pfad = verzeichnis.join(format!("{}.wav", id.inner()));
    tokio::fs::write(&pfad, wav_bytes)
        .await
        .map_err(|e| ApiError::Intern(anyhow::anyhow!("Aufnahme schreiben: {e}")))?;

    Ok(pfad.to_string_lossy().into_owned())
}

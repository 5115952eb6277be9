//! Nachbereitungs-Pipeline einer beendeten Sitzung
//!
//! Zwei Stufen mit getrennter Fehlertoleranz:
//!
//! 1. [`abschluss_verarbeiten`] laeuft synchron im Abschluss-Handler:
//!    Transkription anfragen, Sitzung abschliessen, Anruf anlegen.
//!    Eine gescheiterte Transkription verhindert den Datensatz NICHT;
//!    der Fehler wird am Datensatz vermerkt und dem Aufrufer gemeldet.
//! 2. [`bewertung_nachlauf`] laeuft als losgeloeste Hintergrund-Task:
//!    Bewertung anfragen und `scored` bzw. `analysis_failed` setzen.
//!    Beobachter entdecken das Ergebnis per Abfrage des Datensatzes,
//!    nicht ueber einen Rueckkanal.

use tracing::{info, warn};
use voicearena_core::SessionId;
use voicearena_db::{
    AnrufRecord, AnrufRepository, NeuerAnruf, SitzungsAbschluss, SitzungsRecord,
    SitzungsRepository,
};

use crate::error::AnalyseResult;
use crate::score::BewertungsDienst;
use crate::transcribe::{Transkription, TranskriptionsKontext};
use crate::types::Transkript;

/// Eingabedaten fuer den Sitzungs-Abschluss
#[derive(Debug)]
pub struct AbschlussEingabe<'a> {
    pub session_id: SessionId,
    /// Versiegelte Aufnahme als WAV
    pub wav_bytes: &'a [u8],
    /// Ablage-Pfad der Aufnahme, falls schon gespeichert
    pub aufnahme_pfad: Option<&'a str>,
    pub dauer_sekunden: f64,
}

/// Ergebnis des Sitzungs-Abschlusses
#[derive(Debug)]
pub struct AbschlussErgebnis {
    pub sitzung: SitzungsRecord,
    pub anruf: AnrufRecord,
    /// Transkript, falls die Transkription gelang
    pub transkript: Option<Transkript>,
    /// Transkriptions-Fehler, dem Aufrufer gemeldet statt verschluckt
    pub transkriptions_fehler: Option<String>,
}

/// Schliesst eine Sitzung ab: Transkription, Datensaetze, Anruf
///
/// Der zweite Abschluss derselben Sitzung schlaegt am Status-Wechsel
/// fehl; es entsteht nie ein zweiter Anruf-Datensatz.
pub async fn abschluss_verarbeiten<R, T>(
    repo: &R,
    transkription: &T,
    eingabe: AbschlussEingabe<'_>,
) -> AnalyseResult<AbschlussErgebnis>
where
    R: SitzungsRepository + AnrufRepository,
    T: Transkription,
{
    let sitzung = SitzungsRepository::laden(repo, eingabe.session_id)
        .await?
        .ok_or_else(|| {
            voicearena_db::DbError::nicht_gefunden(format!("Sitzung {}", eingabe.session_id))
        })?;

    let kontext = TranskriptionsKontext {
        language: sitzung.language.clone(),
        hinweis: sitzung.scenario.clone(),
    };

    let (transkript, transkriptions_fehler) =
        match transkription.transkribieren(eingabe.wav_bytes, &kontext).await {
            Ok(t) => (Some(t), None),
            Err(e) => {
                warn!(
                    session_id = %eingabe.session_id,
                    fehler = %e,
                    "Transkription fehlgeschlagen, Sitzung wird trotzdem abgeschlossen"
                );
                (None, Some(e.to_string()))
            }
        };

    let transkript_json = transkript.as_ref().map(|t| t.als_json());
    let abgeschlossen = SitzungsRepository::abschliessen(
        repo,
        eingabe.session_id,
        SitzungsAbschluss {
            aufnahme_pfad: eingabe.aufnahme_pfad,
            transkript: transkript_json.as_ref(),
            fehler: transkriptions_fehler.as_deref(),
            dauer_sekunden: eingabe.dauer_sekunden,
        },
    )
    .await?;

    let anruf = AnrufRepository::anlegen(
        repo,
        NeuerAnruf {
            session_id: abgeschlossen.id,
            user_id: abgeschlossen.user_id,
            org_id: abgeschlossen.org_id,
            language: &abgeschlossen.language,
            scenario: &abgeschlossen.scenario,
            dauer_sekunden: eingabe.dauer_sekunden,
        },
    )
    .await?;

    info!(
        session_id = %abgeschlossen.id,
        anruf_id = %anruf.id,
        dauer = eingabe.dauer_sekunden,
        "Sitzung abgeschlossen"
    );

    Ok(AbschlussErgebnis {
        sitzung: abgeschlossen,
        anruf,
        transkript,
        transkriptions_fehler,
    })
}

/// Losgeloeste Bewertungs-Stufe nach dem Abschluss
///
/// Nimmt alle Eingaben besitzend entgegen, damit der Aufrufer die
/// Funktion direkt in `tokio::spawn` stecken kann. Scheitert die
/// Bewertung, wird die Sitzung `analysis_failed`; das ist terminal
/// und wird nicht automatisch wiederholt.
pub async fn bewertung_nachlauf<R, B>(
    repo: R,
    dienst: B,
    session_id: SessionId,
    transkript: Transkript,
    language: String,
    kontext: String,
) -> AnalyseResult<SitzungsRecord>
where
    R: SitzungsRepository,
    B: BewertungsDienst,
{
    match dienst.bewerten(&transkript, &language, &kontext).await {
        Ok(bewertung) => {
            let record = repo
                .bewertung_schreiben(session_id, &bewertung.als_json())
                .await?;
            info!(session_id = %session_id, overall = bewertung.overall, "Sitzung bewertet");
            Ok(record)
        }
        Err(e) => {
            warn!(session_id = %session_id, fehler = %e, "Bewertung fehlgeschlagen");
            let record = repo
                .analyse_fehlgeschlagen(session_id, &e.to_string())
                .await?;
            Ok(record)
        }
    }
}

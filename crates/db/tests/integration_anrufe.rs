//! Integration-Tests fuer AnrufRepository (In-Memory SQLite)

use voicearena_core::{OrgId, SessionId, UserId};
use voicearena_db::{
    AnrufRepository, DbError, NeueSitzung, NeuerAnruf, SitzungsRepository, SqliteDb,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn sitzung_anlegen(db: &SqliteDb, user_id: UserId) -> SessionId {
    let id = SessionId::new();
    SitzungsRepository::anlegen(
        db,
        NeueSitzung {
            id,
            user_id,
            org_id: OrgId::new(),
            language: "en-US",
            scenario: "B2B SaaS Sales",
            persona: "persona",
        },
    )
    .await
    .expect("Sitzung anlegen fehlgeschlagen");
    id
}

#[tokio::test]
async fn anruf_anlegen_und_finden() {
    let db = db().await;
    let user_id = UserId::new();
    let session_id = sitzung_anlegen(&db, user_id).await;

    let anruf = AnrufRepository::anlegen(
        &db,
        NeuerAnruf {
            session_id,
            user_id,
            org_id: OrgId::new(),
            language: "en-US",
            scenario: "B2B SaaS Sales",
            dauer_sekunden: 42.5,
        },
    )
    .await
    .expect("Anruf anlegen fehlgeschlagen");

    assert_eq!(anruf.session_id, session_id);
    assert_eq!(anruf.dauer_sekunden, 42.5);

    let gefunden = db
        .fuer_sitzung(session_id)
        .await
        .unwrap()
        .expect("Anruf sollte gefunden werden");
    assert_eq!(gefunden.id, anruf.id);
}

#[tokio::test]
async fn zweiter_anruf_zur_selben_sitzung_schlaegt_fehl() {
    // Genau ein Anruf pro Sitzung, auch bei konkurrierenden Abschluessen
    let db = db().await;
    let user_id = UserId::new();
    let session_id = sitzung_anlegen(&db, user_id).await;

    let daten = NeuerAnruf {
        session_id,
        user_id,
        org_id: OrgId::new(),
        language: "en-US",
        scenario: "B2B SaaS Sales",
        dauer_sekunden: 10.0,
    };

    AnrufRepository::anlegen(&db, daten.clone()).await.unwrap();

    let zweiter = AnrufRepository::anlegen(&db, daten).await;
    assert!(matches!(zweiter, Err(DbError::Eindeutigkeit(_))));
    assert!(zweiter.unwrap_err().ist_eindeutigkeit());
}

#[tokio::test]
async fn anruf_ohne_sitzung_verletzt_fremdschluessel() {
    let db = db().await;

    let ergebnis = AnrufRepository::anlegen(
        &db,
        NeuerAnruf {
            session_id: SessionId::new(),
            user_id: UserId::new(),
            org_id: OrgId::new(),
            language: "en-US",
            scenario: "B2B SaaS Sales",
            dauer_sekunden: 1.0,
        },
    )
    .await;

    assert!(ergebnis.is_err());
}

#[tokio::test]
async fn benutzer_liste_neueste_zuerst() {
    let db = db().await;
    let user_id = UserId::new();

    for _ in 0..3 {
        let session_id = sitzung_anlegen(&db, user_id).await;
        AnrufRepository::anlegen(
            &db,
            NeuerAnruf {
                session_id,
                user_id,
                org_id: OrgId::new(),
                language: "en-US",
                scenario: "B2B SaaS Sales",
                dauer_sekunden: 5.0,
            },
        )
        .await
        .unwrap();
        // RFC3339-Sortierung braucht unterschiedliche Zeitstempel
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let anrufe = db.fuer_benutzer(user_id).await.unwrap();
    assert_eq!(anrufe.len(), 3);
    for paar in anrufe.windows(2) {
        assert!(paar[0].erstellt_am >= paar[1].erstellt_am);
    }

    // Fremder Benutzer sieht nichts
    assert!(db.fuer_benutzer(UserId::new()).await.unwrap().is_empty());
}

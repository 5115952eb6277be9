//! Integration-Tests der Broker-API (echtes HTTP auf dem Loopback)
//!
//! Transkriptions- und Bewertungsdienst werden als kleine axum-Router
//! nachgestellt; der Broker selbst laeuft mit In-Memory-Datenbank und
//! einem Wegwerf-Verzeichnis fuer die Aufnahmen.

use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::sleep;

use voicearena_core::{SessionId, SitzungsStatus};
use voicearena_db::{SitzungsRepository, SqliteDb};
use voicearena_server::config::ServerConfig;
use voicearena_server::routes::api_router;
use voicearena_server::state::AppState;

/// Startet einen Router auf einem freien Loopback-Port
async fn ausliefern(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Nachgestellte Nebendienste: Transkription, Bewertung, Health
async fn stub_dienste() -> String {
    let router = Router::new()
        .route(
            "/transcribe",
            post(|| async {
                Json(json!([
                    {"role": "user", "text": "Bonjour, j'appelle au sujet de votre offre.", "timestamp": 0.0},
                    {"role": "assistant", "text": "Bien sur, de quoi s'agit-il?", "timestamp": 1.8}
                ]))
            }),
        )
        .route(
            "/score",
            post(|| async {
                Json(json!({
                    "overall": 74,
                    "dimensions": {"Einwandbehandlung": 68, "Abschluss": 80},
                    "summary": "Solides Gespraech."
                }))
            }),
        )
        .route("/health", get(|| async { "ok" }));
    ausliefern(router).await
}

async fn test_state(aufnahmen: &TempDir, dienste_url: &str) -> AppState {
    let mut config = ServerConfig::default();
    config.speicher.aufnahme_verzeichnis = aufnahmen.path().to_string_lossy().into_owned();
    config.dienste.transkription_url = dienste_url.into();
    config.dienste.bewertung_url = dienste_url.into();
    config.dienste.zeitlimit_sekunden = 5;

    let db = SqliteDb::in_memory().await.unwrap();
    AppState::mit_db(config, db).unwrap()
}

async fn broker(state: AppState) -> String {
    ausliefern(api_router().with_state(state)).await
}

async fn sitzung_starten(
    client: &reqwest::Client,
    basis: &str,
    sprache: &str,
) -> reqwest::Response {
    client
        .post(format!("{basis}/api/sitzungen/start"))
        .json(&json!({
            "language_code": sprache,
            "user_id": uuid::Uuid::new_v4(),
            "org_id": uuid::Uuid::new_v4(),
            "persona": "Du bist Marie, skeptische Einkaufsleiterin.",
            "playbook": "B2B SaaS Sales",
        }))
        .send()
        .await
        .unwrap()
}

async fn aufnahme_hochladen(
    client: &reqwest::Client,
    basis: &str,
    session_id: &str,
    dauer_sekunden: f64,
) -> reqwest::Response {
    let teil = reqwest::multipart::Part::bytes(vec![0u8; 64])
        .file_name("aufnahme.wav")
        .mime_str("audio/wav")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .part("aufnahme", teil)
        .text("dauer_sekunden", dauer_sekunden.to_string());

    client
        .post(format!("{basis}/api/sitzungen/{session_id}/abschluss"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn unbekannte_sprache_ist_unverarbeitbar() {
    let aufnahmen = TempDir::new().unwrap();
    let dienste = stub_dienste().await;
    let basis = broker(test_state(&aufnahmen, &dienste).await).await;
    let client = reqwest::Client::new();

    let antwort = sitzung_starten(&client, &basis, "xx-XX").await;
    assert_eq!(antwort.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let koerper: Value = antwort.json().await.unwrap();
    assert!(koerper["fehler"].as_str().unwrap().contains("xx-XX"));

    // Zugelassene Sprache geht durch und liefert den Agent-Endpunkt
    let antwort = sitzung_starten(&client, &basis, "fr-FR").await;
    assert_eq!(antwort.status(), reqwest::StatusCode::OK);
    let koerper: Value = antwort.json().await.unwrap();
    assert_eq!(koerper["agent_addr"], "127.0.0.1:9400");
    assert!(koerper["stream_id"]
        .as_str()
        .unwrap()
        .starts_with("arena_agent_"));
}

#[tokio::test]
async fn abschluss_einmal_dann_konflikt() {
    let aufnahmen = TempDir::new().unwrap();
    let dienste = stub_dienste().await;
    let basis = broker(test_state(&aufnahmen, &dienste).await).await;
    let client = reqwest::Client::new();

    let start: Value = sitzung_starten(&client, &basis, "fr-FR")
        .await
        .json()
        .await
        .unwrap();
    let session_id = start["session_id"].as_str().unwrap().to_string();

    let antwort = aufnahme_hochladen(&client, &basis, &session_id, 7.5).await;
    assert_eq!(antwort.status(), reqwest::StatusCode::OK);
    let koerper: Value = antwort.json().await.unwrap();
    assert_eq!(koerper["status"], "completed");
    assert!(koerper.get("transkriptions_fehler").is_none());

    // Die Aufnahme liegt im Ablage-Verzeichnis
    assert!(aufnahmen
        .path()
        .join(format!("{session_id}.wav"))
        .exists());

    // Die Bewertung laeuft losgeloest; per Abfrage abwarten
    let mut versuche = 0;
    let koerper = loop {
        let antwort = client
            .get(format!("{basis}/api/sitzungen/{session_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(antwort.status(), reqwest::StatusCode::OK);
        let koerper: Value = antwort.json().await.unwrap();
        if koerper["status"] == "scored" {
            break koerper;
        }
        versuche += 1;
        assert!(versuche < 100, "Sitzung wurde nie bewertet: {koerper}");
        sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(koerper["bewertung"]["overall"], 74);
    assert_eq!(koerper["transkript"][0]["role"], "user");

    // Zweiter Upload derselben Sitzung ist ein Konflikt
    let antwort = aufnahme_hochladen(&client, &basis, &session_id, 7.5).await;
    assert_eq!(antwort.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn fehlschlag_gibt_die_eintrittskarte_zurueck() {
    let aufnahmen = TempDir::new().unwrap();
    let dienste = stub_dienste().await;
    let state = test_state(&aufnahmen, &dienste).await;
    let basis = broker(state.clone()).await;
    let client = reqwest::Client::new();

    let start: Value = sitzung_starten(&client, &basis, "en-US")
        .await
        .json()
        .await
        .unwrap();
    let id = SessionId(start["session_id"].as_str().unwrap().parse().unwrap());

    // Datensatz hinter dem Ruecken des Handlers abschliessen: die
    // Nachbereitung scheitert dann am Status-Wechsel
    SitzungsRepository::status_setzen(&state.db, id, SitzungsStatus::Completed)
        .await
        .unwrap();

    let antwort = aufnahme_hochladen(&client, &basis, &id.inner().to_string(), 3.0).await;
    assert_eq!(antwort.status(), reqwest::StatusCode::CONFLICT);

    // Der Live-Eintrag ist wieder da, der Upload darf wiederholt werden
    assert!(state.live.contains_key(&id));
}

#[tokio::test]
async fn unbekannte_sitzung_ist_nicht_gefunden() {
    let aufnahmen = TempDir::new().unwrap();
    let dienste = stub_dienste().await;
    let basis = broker(test_state(&aufnahmen, &dienste).await).await;
    let client = reqwest::Client::new();

    let fremde_id = uuid::Uuid::new_v4();
    let antwort = client
        .get(format!("{basis}/api/sitzungen/{fremde_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(antwort.status(), reqwest::StatusCode::NOT_FOUND);

    let antwort = aufnahme_hochladen(&client, &basis, &fremde_id.to_string(), 1.0).await;
    assert_eq!(antwort.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_spiegelt_die_einzelpruefungen() {
    let aufnahmen = TempDir::new().unwrap();
    let client = reqwest::Client::new();

    // Alles erreichbar: healthy
    let dienste = stub_dienste().await;
    let state = test_state(&aufnahmen, &dienste).await;
    let basis = broker(state.clone()).await;
    let antwort = client.get(format!("{basis}/health")).send().await.unwrap();
    assert_eq!(antwort.status(), reqwest::StatusCode::OK);
    let koerper: Value = antwort.json().await.unwrap();
    assert_eq!(koerper["status"], "healthy");

    // Nebendienste weg: degradiert, aber weiterhin 200
    let mut config = ServerConfig::default();
    config.dienste.transkription_url = "http://127.0.0.1:9".into();
    config.dienste.bewertung_url = "http://127.0.0.1:9".into();
    config.dienste.zeitlimit_sekunden = 1;
    let degradiert = AppState::mit_db(config, SqliteDb::in_memory().await.unwrap()).unwrap();
    let basis_degradiert = broker(degradiert).await;
    let antwort = client
        .get(format!("{basis_degradiert}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(antwort.status(), reqwest::StatusCode::OK);
    let koerper: Value = antwort.json().await.unwrap();
    assert_eq!(koerper["status"], "degraded");
    assert_eq!(koerper["db_erreichbar"], true);
    assert_eq!(koerper["transkription_erreichbar"], false);

    // Datenbank weg: unhealthy mit 503
    state.db.pool().close().await;
    let antwort = client.get(format!("{basis}/health")).send().await.unwrap();
    assert_eq!(
        antwort.status(),
        reqwest::StatusCode::SERVICE_UNAVAILABLE
    );
    let koerper: Value = antwort.json().await.unwrap();
    assert_eq!(koerper["status"], "unhealthy");
    assert_eq!(koerper["db_erreichbar"], false);
}

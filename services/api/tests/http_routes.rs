//! Drives the real router over HTTP against the in-memory store:
//! the role gate, CORS preflight, uploads and import polling.

use std::sync::Arc;
use std::time::Duration;

use api_lib::config::Config;
use api_lib::web::{create_router, state::AppState};
use reqwest::{multipart, Client, Method, StatusCode};
use results_portal_core::import::REQUIRED_COLUMNS;
use results_portal_core::MemoryStore;
use serde_json::{json, Value};
use uuid::Uuid;

const ORIGIN: &str = "http://localhost:3000";

async fn spawn_app() -> String {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
        _ => None,
    })
    .unwrap();
    let state = Arc::new(AppState::new(Arc::new(MemoryStore::new()), Arc::new(config)));
    let router = create_router(state).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn upload(file_name: &str, bytes: Vec<u8>) -> multipart::Form {
    let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
    multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn staff_routes_need_an_admin_or_staff_role() {
    let base = spawn_app().await;
    let client = Client::new();
    let url = format!("{}/imports/{}", base, Uuid::new_v4());

    let anonymous = client.get(&url).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    let student = client
        .get(&url)
        .header("x-user-role", "student")
        .send()
        .await
        .unwrap();
    assert_eq!(student.status(), StatusCode::FORBIDDEN);

    let staff = client
        .get(&url)
        .header("x-user-role", "staff")
        .send()
        .await
        .unwrap();
    assert_eq!(staff.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_are_listed_publicly_but_created_by_staff() {
    let base = spawn_app().await;
    let client = Client::new();
    let url = format!("{}/sessions", base);

    let refused = client
        .post(&url)
        .json(&json!({ "name": "2026" }))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let created = client
        .post(&url)
        .header("x-user-role", "admin")
        .json(&json!({ "name": "2026" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let listed: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed[0]["name"], "2026");
}

#[tokio::test]
async fn preflight_allows_the_role_header() {
    let base = spawn_app().await;
    let response = Client::new()
        .request(Method::OPTIONS, format!("{}/results", base))
        .header("origin", ORIGIN)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,x-user-role")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let allowed = response
        .headers()
        .get("access-control-allow-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-user-role"), "allowed headers: {}", allowed);
}

#[tokio::test]
async fn oversize_upload_is_payload_too_large() {
    let base = spawn_app().await;
    let response = Client::new()
        .post(format!("{}/imports", base))
        .header("x-user-role", "staff")
        .multipart(upload("big.csv", vec![b'a'; 2048]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn uploaded_csv_is_imported_in_the_background() {
    let base = spawn_app().await;
    let client = Client::new();
    let csv = format!(
        "{}\nGK,2026-02-08,2026,Class 5,501,,Asha,,,70,,\n",
        REQUIRED_COLUMNS.join(",")
    );

    let started = client
        .post(format!("{}/imports", base))
        .header("x-user-role", "staff")
        .multipart(upload("gk.csv", csv.into_bytes()))
        .send()
        .await
        .unwrap();
    assert_eq!(started.status(), StatusCode::ACCEPTED);
    let started: Value = started.json().await.unwrap();
    assert_eq!(started["total_rows"], 1);
    let import_id = started["import_id"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..50 {
        status = client
            .get(format!("{}/imports/{}", base, import_id))
            .header("x-user-role", "staff")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status["state"] == "finished" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status["state"], "finished");
    assert_eq!(status["inserted"], 1);
    assert_eq!(status["processed"], 1);

    let no_errors = client
        .get(format!("{}/imports/{}/errors.xlsx", base, import_id))
        .header("x-user-role", "staff")
        .send()
        .await
        .unwrap();
    assert_eq!(no_errors.status(), StatusCode::NOT_FOUND);
}

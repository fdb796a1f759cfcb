use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Datelike;
use http_body_util::BodyExt;
use reviewd::config::Config;
use reviewd::services::{OutgoingMail, RecordingMailer};
use tower::ServiceExt;

/// Default confirmation code seeded by migration (must match m20260301_initial.rs)
const DEFAULT_ADMIN_CODE: &str = "reviewd_default_setup_code_please_rotate";

type Outbox = Arc<Mutex<Vec<OutgoingMail>>>;

async fn spawn_app() -> (Router, Outbox) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let mailer = Arc::new(RecordingMailer::new());
    let outbox = mailer.outbox();

    let state = reviewd::api::create_app_state_with_mailer(config, mailer)
        .await
        .expect("Failed to create app state");
    (reviewd::api::router(state).await, outbox)
}

fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn admin_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/token",
            None,
            serde_json::json!({ "username": "admin", "confirmation_code": DEFAULT_ADMIN_CODE }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn user_token(app: &Router, outbox: &Outbox, username: &str) -> String {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            None,
            serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
            }),
        ))
        .await
        .unwrap();

    let code = {
        let outbox = outbox.lock().unwrap();
        let mail = outbox.last().expect("no mail recorded");
        mail.body.split_once(": ").unwrap().1.to_string()
    };

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/token",
            None,
            serde_json::json!({ "username": username, "confirmation_code": code }),
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_category_crud_and_permissions() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let user = user_token(&app, &outbox, "reader").await;

    // Anonymous create is unauthorized; plain user is forbidden.
    let payload = serde_json::json!({ "name": "Books", "slug": "books" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/categories", None, payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/categories", Some(&user), payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/categories", Some(&admin), payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Duplicate slug conflicts.
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/categories", Some(&admin), payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Anonymous read is fine.
    let response = app
        .clone()
        .oneshot(bare_request("GET", "/api/v1/categories", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["slug"], "books");

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/api/v1/categories/books", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/api/v1/categories/books", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_slug_is_rejected() {
    let (app, _outbox) = spawn_app().await;
    let admin = admin_token(&app).await;

    for slug in ["Sci-Fi", "sci fi", ""] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/genres",
                Some(&admin),
                serde_json::json!({ "name": "Science Fiction", "slug": slug }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_title_creation_with_genres_and_category() {
    let (app, _outbox) = spawn_app().await;
    let admin = admin_token(&app).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            serde_json::json!({ "name": "Films", "slug": "films" }),
        ))
        .await
        .unwrap();
    for (name, slug) in [("Drama", "drama"), ("Comedy", "comedy")] {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/genres",
                Some(&admin),
                serde_json::json!({ "name": name, "slug": slug }),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({
                "name": "The Long Goodbye",
                "year": 1973,
                "description": "Altman noir",
                "genre": ["drama", "comedy"],
                "category": "films",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["data"]["category"]["slug"], "films");
    assert_eq!(body["data"]["genres"].as_array().unwrap().len(), 2);
    assert!(body["data"]["rating"].is_null());

    // Unknown genre slug fails validation.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({
                "name": "Mystery Film",
                "year": 1990,
                "genre": ["nonexistent"],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_future_year_is_rejected() {
    let (app, _outbox) = spawn_app().await;
    let admin = admin_token(&app).await;

    let current_year = chrono::Utc::now().year();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({ "name": "From The Future", "year": current_year + 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({ "name": "From This Year", "year": current_year }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_category_delete_clears_title_reference() {
    let (app, _outbox) = spawn_app().await;
    let admin = admin_token(&app).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            serde_json::json!({ "name": "Shows", "slug": "shows" }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({ "name": "Detectorists", "year": 2014, "category": "shows" }),
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let title_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/api/v1/categories/shows", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The title survives, just uncategorized.
    let response = app
        .clone()
        .oneshot(bare_request("GET", &format!("/api/v1/titles/{title_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["data"]["category"].is_null());
}

#[tokio::test]
async fn test_title_patch_and_delete() {
    let (app, _outbox) = spawn_app().await;
    let admin = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            serde_json::json!({ "name": "Stalker", "year": 1979 }),
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let title_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/titles/{title_id}"),
            Some(&admin),
            serde_json::json!({ "description": "Tarkovsky" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["description"], "Tarkovsky");
    assert_eq!(body["data"]["name"], "Stalker");

    let response = app
        .clone()
        .oneshot(bare_request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(bare_request("GET", &format!("/api/v1/titles/{title_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _outbox) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/api/v1/system/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
}

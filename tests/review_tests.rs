use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
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

async fn create_title(app: &Router, admin: &str, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/titles",
            Some(admin),
            serde_json::json!({ "name": name, "year": 2001 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_i64().unwrap()
}

async fn post_review(
    app: &Router,
    token: &str,
    title_id: i64,
    text: &str,
    score: i32,
) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(token),
            serde_json::json!({ "text": text, "score": score }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_one_review_per_author_per_title() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let title_id = create_title(&app, &admin, "Solaris").await;

    let response = post_review(&app, &alice, title_id, "slow but rewarding", 8).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let review_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["author"], "alice");

    // Second review by the same author conflicts.
    let response = post_review(&app, &alice, title_id, "changed my mind", 3).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Editing the existing review is fine.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            Some(&alice),
            serde_json::json!({ "score": 9 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["score"], 9);
}

#[tokio::test]
async fn test_review_requires_valid_score_and_title() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let bob = user_token(&app, &outbox, "bob").await;
    let title_id = create_title(&app, &admin, "Alien").await;

    for score in [0, 11, -5] {
        let response = post_review(&app, &bob, title_id, "text", score).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = post_review(&app, &bob, 9999, "text", 5).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Anonymous create is unauthorized.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            None,
            serde_json::json!({ "text": "text", "score": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rating_is_mean_of_scores() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let bob = user_token(&app, &outbox, "bob").await;
    let title_id = create_title(&app, &admin, "Ran").await;

    // No reviews yet: rating is null.
    let response = app
        .clone()
        .oneshot(bare_request("GET", &format!("/api/v1/titles/{title_id}"), None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert!(body["data"]["rating"].is_null());

    post_review(&app, &alice, title_id, "great", 7).await;
    post_review(&app, &bob, title_id, "masterpiece", 9).await;

    let response = app
        .clone()
        .oneshot(bare_request("GET", &format!("/api/v1/titles/{title_id}"), None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert!((body["data"]["rating"].as_f64().unwrap() - 8.0).abs() < f64::EPSILON);

    // Deleting one review recomputes the mean.
    let response = app
        .clone()
        .oneshot(bare_request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews"),
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let reviews = body["data"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    let bob_review_id = reviews
        .iter()
        .find(|r| r["author"] == "bob")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    app.clone()
        .oneshot(bare_request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}/reviews/{bob_review_id}"),
            Some(&bob),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(bare_request("GET", &format!("/api/v1/titles/{title_id}"), None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert!((body["data"]["rating"].as_f64().unwrap() - 7.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_review_ownership_and_moderation() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let bob = user_token(&app, &outbox, "bob").await;
    let title_id = create_title(&app, &admin, "Heat").await;

    let response = post_review(&app, &alice, title_id, "tense", 8).await;
    let body = response_json(response).await;
    let review_id = body["data"]["id"].as_i64().unwrap();

    // Bob cannot edit or delete Alice's review.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            Some(&bob),
            serde_json::json!({ "score": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(bare_request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            Some(&bob),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Promote Bob to moderator; moderators may delete any review.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/v1/users/bob",
            Some(&admin),
            serde_json::json!({ "role": "moderator" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(bare_request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            Some(&bob),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_review_ids_are_scoped_to_their_title() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let title_a = create_title(&app, &admin, "Title A").await;
    let title_b = create_title(&app, &admin, "Title B").await;

    let response = post_review(&app, &alice, title_a, "review on A", 6).await;
    let body = response_json(response).await;
    let review_id = body["data"]["id"].as_i64().unwrap();

    // The same review ID under the wrong title resolves to nothing.
    let response = app
        .clone()
        .oneshot(bare_request(
            "GET",
            &format!("/api/v1/titles/{title_b}/reviews/{review_id}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let bob = user_token(&app, &outbox, "bob").await;
    let title_id = create_title(&app, &admin, "The Thing").await;

    let response = post_review(&app, &alice, title_id, "paranoid perfection", 10).await;
    let body = response_json(response).await;
    let review_id = body["data"]["id"].as_i64().unwrap();

    let comments_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments");

    // Anonymous comment creation is unauthorized.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &comments_uri,
            None,
            serde_json::json!({ "text": "agreed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &comments_uri,
            Some(&bob),
            serde_json::json!({ "text": "agreed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let comment_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["author"], "bob");

    // Multiple comments per user are fine.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &comments_uri,
            Some(&bob),
            serde_json::json!({ "text": "still agreed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Alice cannot edit Bob's comment.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("{comments_uri}/{comment_id}"),
            Some(&alice),
            serde_json::json!({ "text": "hijacked" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob edits and deletes his own comment.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("{comments_uri}/{comment_id}"),
            Some(&bob),
            serde_json::json!({ "text": "revised" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["text"], "revised");

    let response = app
        .clone()
        .oneshot(bare_request(
            "DELETE",
            &format!("{comments_uri}/{comment_id}"),
            Some(&bob),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(bare_request("GET", &comments_uri, None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_title_cascades_reviews() {
    let (app, outbox) = spawn_app().await;
    let admin = admin_token(&app).await;
    let alice = user_token(&app, &outbox, "alice").await;
    let title_id = create_title(&app, &admin, "Short Lived").await;

    post_review(&app, &alice, title_id, "gone soon", 5).await;

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
        .oneshot(bare_request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Account Tests
//!
//! Token lifecycle, remote-account provisioning, profiles, and notifications.

mod common;

use axum::http::StatusCode;
use common::app;
use nexo::app::auth::AuthService;
use nexo::app::notifications::NotificationService;
use serde_json::json;

fn auth_service(state: &nexo::AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.identity.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

// ===========================================================================
// Remote-account provisioning
// ===========================================================================

#[tokio::test]
async fn provision_creates_user_from_email() {
    let app = app().await;
    let service = auth_service(&app.state);

    let user = service
        .provision_remote_user("eco.walker@example.com", None)
        .await
        .expect("provision failed");
    assert_eq!(user.username, "eco.walker");
    assert_eq!(user.email, "eco.walker@example.com");
    assert!(!user.is_superuser);

    // No local password: the remote provider owns the credentials
    let hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(app.pool())
            .await
            .expect("password query failed");
    assert!(hash.is_none());
}

#[tokio::test]
async fn provision_matches_email_case_insensitively() {
    let app = app().await;
    let service = auth_service(&app.state);

    let first = service
        .provision_remote_user("Mixed.Case@Example.com", None)
        .await
        .expect("provision failed");
    let second = service
        .provision_remote_user("mixed.case@example.com", None)
        .await
        .expect("provision failed");
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn provision_suffixes_taken_usernames() {
    let app = app().await;
    let service = auth_service(&app.state);

    let first = service
        .provision_remote_user("clash@one.example.com", Some("clash"))
        .await
        .expect("provision failed");
    let second = service
        .provision_remote_user("clash@two.example.com", Some("clash"))
        .await
        .expect("provision failed");

    assert_eq!(first.username, "clash");
    assert_eq!(second.username, "clash_1");
    assert_ne!(first.id, second.id);
}

// ===========================================================================
// Token lifecycle
// ===========================================================================

#[tokio::test]
async fn me_returns_current_user() {
    let app = app().await;
    let user = app.create_user("acct_me").await;

    let resp = app.get("/auth/me", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["id"].as_i64().unwrap(), user.id);
    assert_eq!(resp.json()["username"].as_str().unwrap(), user.username);

    let resp = app.get("/auth/me", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_tokens() {
    let app = app().await;
    let user = app.create_user("acct_refresh").await;

    let resp = app
        .post_json(
            "/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    // The old refresh token is revoked by the rotation
    let resp = app
        .post_json(
            "/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoke_refresh_token() {
    let app = app().await;
    let user = app.create_user("acct_revoke").await;

    let resp = app
        .post_json(
            "/auth/revoke",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .post_json(
            "/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_validates_input() {
    let app = app().await;

    let resp = app
        .post_json("/auth/login", json!({ "identifier": "", "password": "" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Profiles
// ===========================================================================

#[tokio::test]
async fn public_profile_omits_email() {
    let app = app().await;
    let user = app.create_user("acct_public").await;

    let resp = app.get(&format!("/profile/{}", user.username), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["username"].as_str().unwrap(), user.username);
    assert!(body.get("email").is_none());

    let resp = app.get("/profile/nobody_here", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_profile_fields() {
    let app = app().await;
    let user = app.create_user("acct_update").await;

    let resp = app
        .patch_json(
            "/account/profile",
            json!({
                "display_name": "Caminante",
                "gamer_tag": "eco#1",
                "favorite_domain": "niebla"
            }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["display_name"].as_str().unwrap(), "Caminante");
    assert_eq!(body["favorite_domain"].as_str().unwrap(), "niebla");
}

#[tokio::test]
async fn update_profile_rejects_bad_domain() {
    let app = app().await;
    let user = app.create_user("acct_baddomain").await;

    let resp = app
        .patch_json(
            "/account/profile",
            json!({ "favorite_domain": "lava" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid favorite domain");
}

// ===========================================================================
// Notifications
// ===========================================================================

#[tokio::test]
async fn notifications_listed_newest_first() {
    let app = app().await;
    let user = app.create_user("acct_notif").await;

    let sink = NotificationService::new(app.state.db.clone());
    for message in ["first", "second", "third"] {
        sink.create(user.id, message)
            .await
            .expect("create notification failed");
    }

    let resp = app.get("/notifications", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["message"].as_str().unwrap(), "third");
    assert_eq!(body["unread_count"].as_i64().unwrap(), 3);
}

#[tokio::test]
async fn mark_all_notifications_read() {
    let app = app().await;
    let user = app.create_user("acct_notif_read").await;

    let sink = NotificationService::new(app.state.db.clone());
    for _ in 0..2 {
        sink.create(user.id, "hola")
            .await
            .expect("create notification failed");
    }

    let resp = app
        .post_json("/notifications/read-all", json!({}), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["marked"].as_u64().unwrap(), 2);

    let resp = app.get("/notifications", Some(&user.access_token)).await;
    assert_eq!(resp.json()["unread_count"].as_i64().unwrap(), 0);
}

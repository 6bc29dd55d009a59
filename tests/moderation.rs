//! Moderation Workflow Tests
//!
//! Covers the authorization branches, the audit trail, owner notifications,
//! and the idempotent re-removal behavior.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use sqlx::Row;

async fn is_removed(app: &common::TestApp, table: &str, id: i64) -> bool {
    sqlx::query_scalar(&format!("SELECT is_removed FROM {} WHERE id = $1", table))
        .bind(id)
        .fetch_one(app.pool())
        .await
        .expect("is_removed query failed")
}

async fn audit_entries(app: &common::TestApp, content_type: &str, object_id: i64) -> Vec<(Option<i64>, Option<i64>, String)> {
    sqlx::query(
        "SELECT removed_by, owner_id, reason FROM moderation_log \
         WHERE content_type = $1 AND object_id = $2",
    )
    .bind(content_type)
    .bind(object_id)
    .fetch_all(app.pool())
    .await
    .expect("audit query failed")
    .iter()
    .map(|row| (row.get("removed_by"), row.get("owner_id"), row.get("reason")))
    .collect()
}

async fn notifications_for(app: &common::TestApp, user_id: i64) -> Vec<String> {
    sqlx::query_scalar("SELECT message FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(app.pool())
        .await
        .expect("notifications query failed")
}

// ===========================================================================
// Superuser removals
// ===========================================================================

#[tokio::test]
async fn superuser_removal_audits_and_notifies() {
    let app = app().await;
    let owner = app.create_user("mod_owner").await;
    let admin = app.create_superuser("mod_admin").await;
    let (post_id, _) = app.create_post_for_user(owner.id).await;
    let comment_id = app.create_comment_for_user(post_id, owner.id).await;

    let resp = app
        .post_json(
            &format!("/comments/{}/remove", comment_id),
            json!({ "reason": "spam" }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "removed");

    assert!(is_removed(app, "comments", comment_id).await);

    let entries = audit_entries(app, "comment", comment_id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, Some(admin.id));
    assert_eq!(entries[0].1, Some(owner.id));
    assert_eq!(entries[0].2, "spam");

    let messages = notifications_for(app, owner.id).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("spam"));
}

#[tokio::test]
async fn superuser_removal_requires_reason() {
    let app = app().await;
    let owner = app.create_user("mod_noreason_owner").await;
    let admin = app.create_superuser("mod_noreason_admin").await;
    let (post_id, slug) = app.create_post_for_user(owner.id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/remove", slug),
            json!({ "reason": "   " }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "provide a moderation reason");

    // Nothing mutated, nothing logged
    assert!(!is_removed(app, "posts", post_id).await);
    assert_eq!(audit_entries(app, "post", post_id).await.len(), 0);
    assert_eq!(notifications_for(app, owner.id).await.len(), 0);
}

#[tokio::test]
async fn repeated_removal_is_noop() {
    let app = app().await;
    let owner = app.create_user("mod_twice_owner").await;
    let admin = app.create_superuser("mod_twice_admin").await;
    let (post_id, slug) = app.create_post_for_user(owner.id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/remove", slug),
            json!({ "reason": "off topic" }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.json()["status"].as_str().unwrap(), "removed");

    // A confirmed double-submit must not create a second audit entry
    let resp = app
        .post_json(
            &format!("/posts/{}/remove", slug),
            json!({ "reason": "off topic" }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "already_removed");

    assert_eq!(audit_entries(app, "post", post_id).await.len(), 1);
    assert_eq!(notifications_for(app, owner.id).await.len(), 1);
}

// ===========================================================================
// Self-removal
// ===========================================================================

#[tokio::test]
async fn self_removal_is_silent() {
    let app = app().await;
    let owner = app.create_user("mod_self").await;
    let (post_id, slug) = app.create_post_for_user(owner.id).await;

    // No reason needed for removing your own content
    let resp = app
        .post_json(
            &format!("/posts/{}/remove", slug),
            json!({}),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "removed");

    assert!(is_removed(app, "posts", post_id).await);
    assert_eq!(audit_entries(app, "post", post_id).await.len(), 0);
    assert_eq!(notifications_for(app, owner.id).await.len(), 0);
}

// ===========================================================================
// Unauthorized actors
// ===========================================================================

#[tokio::test]
async fn other_user_cannot_remove() {
    let app = app().await;
    let owner = app.create_user("mod_other_owner").await;
    let stranger = app.create_user("mod_other_stranger").await;
    let (post_id, slug) = app.create_post_for_user(owner.id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/remove", slug),
            json!({ "reason": "I just dislike it" }),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    assert!(!is_removed(app, "posts", post_id).await);
    assert_eq!(audit_entries(app, "post", post_id).await.len(), 0);
}

#[tokio::test]
async fn remove_missing_content() {
    let app = app().await;
    let admin = app.create_superuser("mod_missing_admin").await;

    let resp = app
        .post_json(
            "/comments/999999999/remove",
            json!({ "reason": "spam" }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Threads & replies
// ===========================================================================

#[tokio::test]
async fn thread_removal_reports_owning_forum() {
    let app = app().await;
    let owner = app.create_user("mod_thread_owner").await;
    let admin = app.create_superuser("mod_thread_admin").await;
    let (forum_id, forum_slug) = app.create_forum("mod_thread").await;
    let (thread_id, thread_slug) = app.create_thread_for_user(forum_id, owner.id).await;

    let resp = app
        .post_json(
            &format!("/threads/{}/remove", thread_slug),
            json!({ "reason": "duplicate" }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "removed");
    assert_eq!(resp.json()["parent"].as_str().unwrap(), forum_slug);

    assert!(is_removed(app, "threads", thread_id).await);
    assert_eq!(audit_entries(app, "thread", thread_id).await.len(), 1);
}

#[tokio::test]
async fn reply_removal_by_author() {
    let app = app().await;
    let owner = app.create_user("mod_reply_owner").await;
    let (forum_id, _) = app.create_forum("mod_reply").await;
    let (thread_id, thread_slug) = app.create_thread_for_user(forum_id, owner.id).await;
    let reply_id = app.create_reply_for_user(thread_id, owner.id).await;

    let resp = app
        .post_json(
            &format!("/replies/{}/remove", reply_id),
            json!({}),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["parent"].as_str().unwrap(), thread_slug);
    assert!(is_removed(app, "thread_replies", reply_id).await);
    assert_eq!(audit_entries(app, "reply", reply_id).await.len(), 0);
}

// ===========================================================================
// Audit listing
// ===========================================================================

#[tokio::test]
async fn audit_listing_requires_admin_token() {
    let app = app().await;

    let resp = app.get_admin("/moderation/audit", None).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get_admin("/moderation/audit", Some("wrong")).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get_admin("/moderation/audit", Some(app.admin_token()))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["items"].is_array());
}

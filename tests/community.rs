//! Community Tests
//!
//! Posts, comments, the feed, and the forum/thread/reply surface.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

// ===========================================================================
// Posts
// ===========================================================================

#[tokio::test]
async fn create_post_valid() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/posts",
            json!({ "title": "Primer eco", "body": "hello nexo" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["author_id"].as_i64().unwrap(), user.id);
    assert_eq!(body["title"].as_str().unwrap(), "Primer eco");
    assert_eq!(body["kind"].as_str().unwrap(), "post");
    assert!(body["slug"].as_str().unwrap().starts_with("primer-eco"));
    assert_eq!(body["is_removed"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn create_post_title_too_long() {
    let app = app().await;
    let user = app.create_user("post_longtitle").await;

    let resp = app
        .post_json(
            "/posts",
            json!({ "title": "a".repeat(141), "body": "x" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title must be at most 140 characters");
}

#[tokio::test]
async fn create_post_invalid_kind() {
    let app = app().await;
    let user = app.create_user("post_badkind").await;

    let resp = app
        .post_json(
            "/posts",
            json!({ "title": "t", "body": "b", "kind": "meme" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid post type");
}

#[tokio::test]
async fn get_post_and_missing_post() {
    let app = app().await;
    let user = app.create_user("post_get").await;
    let (_, slug) = app.create_post_for_user(user.id).await;

    let resp = app.get(&format!("/posts/{}", slug), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["slug"].as_str().unwrap(), slug);

    let resp = app.get("/posts/not-a-real-slug", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");
}

#[tokio::test]
async fn feed_hides_removed_posts() {
    let app = app().await;
    let user = app.create_user("feed_hide").await;
    let (kept_id, _) = app.create_post_for_user(user.id).await;
    let (removed_id, _) = app.create_post_for_user(user.id).await;

    sqlx::query("UPDATE posts SET is_removed = TRUE WHERE id = $1")
        .bind(removed_id)
        .execute(app.pool())
        .await
        .expect("flag post failed");

    let resp = app.get("/feed?limit=100", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let items = resp.json()["items"].as_array().unwrap().clone();
    let ids: Vec<i64> = items.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert!(ids.contains(&kept_id));
    assert!(!ids.contains(&removed_id));
}

#[tokio::test]
async fn update_post_author_only() {
    let app = app().await;
    let author = app.create_user("post_edit_author").await;
    let stranger = app.create_user("post_edit_stranger").await;
    let (_, slug) = app.create_post_for_user(author.id).await;

    let resp = app
        .patch_json(
            &format!("/posts/{}", slug),
            json!({ "title": "hijacked", "body": "x" }),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .patch_json(
            &format!("/posts/{}", slug),
            json!({ "title": "edited title", "body": "new body", "kind": "review" }),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["title"].as_str().unwrap(), "edited title");
    assert_eq!(resp.json()["kind"].as_str().unwrap(), "review");
}

// ===========================================================================
// Comments
// ===========================================================================

#[tokio::test]
async fn comment_lifecycle() {
    let app = app().await;
    let author = app.create_user("comment_author").await;
    let commenter = app.create_user("comment_commenter").await;
    let (_, slug) = app.create_post_for_user(author.id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", slug),
            json!({ "body": "buen post" }),
            Some(&commenter.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["author_id"].as_i64().unwrap(), commenter.id);

    let resp = app.get(&format!("/posts/{}/comments", slug), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let comments = resp.json();
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["body"].as_str().unwrap(), "buen post");
}

#[tokio::test]
async fn comment_on_removed_post_rejected() {
    let app = app().await;
    let user = app.create_user("comment_removed").await;
    let (post_id, slug) = app.create_post_for_user(user.id).await;

    sqlx::query("UPDATE posts SET is_removed = TRUE WHERE id = $1")
        .bind(post_id)
        .execute(app.pool())
        .await
        .expect("flag post failed");

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", slug),
            json!({ "body": "too late" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_too_long() {
    let app = app().await;
    let user = app.create_user("comment_long").await;
    let (_, slug) = app.create_post_for_user(user.id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", slug),
            json!({ "body": "a".repeat(1001) }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "comment must be at most 1000 characters");
}

#[tokio::test]
async fn removed_comments_hidden_from_listing() {
    let app = app().await;
    let user = app.create_user("comment_hidden").await;
    let (post_id, slug) = app.create_post_for_user(user.id).await;
    let kept = app.create_comment_for_user(post_id, user.id).await;
    let removed = app.create_comment_for_user(post_id, user.id).await;

    sqlx::query("UPDATE comments SET is_removed = TRUE WHERE id = $1")
        .bind(removed)
        .execute(app.pool())
        .await
        .expect("flag comment failed");

    let resp = app.get(&format!("/posts/{}/comments", slug), None).await;
    let ids: Vec<i64> = resp.json()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&kept));
    assert!(!ids.contains(&removed));
}

// ===========================================================================
// Forums & threads
// ===========================================================================

#[tokio::test]
async fn forum_listing_and_detail() {
    let app = app().await;
    let user = app.create_user("forum_detail").await;
    let (forum_id, forum_slug) = app.create_forum("detail").await;
    let (_, thread_slug) = app.create_thread_for_user(forum_id, user.id).await;

    let resp = app.get("/forums", None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get(&format!("/forums/{}", forum_slug), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["forum"]["slug"].as_str().unwrap(), forum_slug);
    let slugs: Vec<&str> = body["threads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();
    assert!(slugs.contains(&thread_slug.as_str()));
}

#[tokio::test]
async fn create_thread_unknown_forum() {
    let app = app().await;
    let user = app.create_user("thread_noforum").await;

    let resp = app
        .post_json(
            "/threads",
            json!({ "forum": "no-such-forum", "title": "t", "body": "b" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unknown forum");
}

#[tokio::test]
async fn thread_detail_checks_forum_slug() {
    let app = app().await;
    let user = app.create_user("thread_detail").await;
    let (forum_id, forum_slug) = app.create_forum("thread_detail").await;
    let (thread_id, thread_slug) = app.create_thread_for_user(forum_id, user.id).await;
    let reply_id = app.create_reply_for_user(thread_id, user.id).await;

    let resp = app
        .get(
            &format!("/forums/{}/threads/{}", forum_slug, thread_slug),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["thread"]["slug"].as_str().unwrap(), thread_slug);
    assert_eq!(body["replies"][0]["id"].as_i64().unwrap(), reply_id);

    // Same thread under the wrong forum is a 404
    let resp = app
        .get(
            &format!("/forums/some-other-forum/threads/{}", thread_slug),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn locked_thread_rejects_replies() {
    let app = app().await;
    let user = app.create_user("thread_locked").await;
    let (forum_id, _) = app.create_forum("locked").await;
    let (thread_id, thread_slug) = app.create_thread_for_user(forum_id, user.id).await;

    sqlx::query("UPDATE threads SET is_locked = TRUE WHERE id = $1")
        .bind(thread_id)
        .execute(app.pool())
        .await
        .expect("lock thread failed");

    let resp = app
        .post_json(
            &format!("/threads/{}/replies", thread_slug),
            json!({ "body": "me first" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "thread is locked");
}

#[tokio::test]
async fn reply_to_thread() {
    let app = app().await;
    let user = app.create_user("thread_reply").await;
    let (forum_id, _) = app.create_forum("reply").await;
    let (_, thread_slug) = app.create_thread_for_user(forum_id, user.id).await;

    let resp = app
        .post_json(
            &format!("/threads/{}/replies", thread_slug),
            json!({ "body": "una respuesta" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["body"].as_str().unwrap(), "una respuesta");
}

//! News Tests
//!
//! Publication-window visibility, filters, and admin CRUD.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

fn titles(resp: &common::TestResponse) -> Vec<String> {
    resp.json()["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap().to_string())
        .collect()
}

// ===========================================================================
// Visibility window
// ===========================================================================

#[tokio::test]
async fn drafts_are_invisible() {
    let app = app().await;
    let token = app.admin_token();

    let resp = app
        .post_admin(
            "/news",
            json!({
                "title": "Borrador secreto",
                "slug": "borrador-secreto",
                "body": "wip",
                "status": "draft"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/news?limit=100", None).await;
    assert!(!titles(&resp).contains(&"Borrador secreto".to_string()));

    let resp = app.get("/news/borrador-secreto", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn published_articles_visible() {
    let app = app().await;
    let token = app.admin_token();

    let resp = app
        .post_admin(
            "/news",
            json!({
                "title": "Nota publicada",
                "slug": "nota-publicada",
                "body": "texto",
                "status": "published"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/news?limit=100", None).await;
    assert!(titles(&resp).contains(&"Nota publicada".to_string()));

    let resp = app.get("/news/nota-publicada", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["item"]["title"].as_str().unwrap(), "Nota publicada");
}

#[tokio::test]
async fn scheduled_articles_respect_publish_at() {
    let app = app().await;
    let token = app.admin_token();

    let past = (OffsetDateTime::now_utc() - Duration::hours(1))
        .format(&Rfc3339)
        .unwrap();
    let future = (OffsetDateTime::now_utc() + Duration::hours(1))
        .format(&Rfc3339)
        .unwrap();

    app.post_admin(
        "/news",
        json!({
            "title": "Programada pasada",
            "slug": "programada-pasada",
            "body": "b",
            "status": "scheduled",
            "publish_at": past
        }),
        Some(token),
    )
    .await;
    app.post_admin(
        "/news",
        json!({
            "title": "Programada futura",
            "slug": "programada-futura",
            "body": "b",
            "status": "scheduled",
            "publish_at": future
        }),
        Some(token),
    )
    .await;

    let resp = app.get("/news?limit=100", None).await;
    let titles = titles(&resp);
    assert!(titles.contains(&"Programada pasada".to_string()));
    assert!(!titles.contains(&"Programada futura".to_string()));
}

// ===========================================================================
// Filters & sidebars
// ===========================================================================

#[tokio::test]
async fn category_filter_and_patch_notes() {
    let app = app().await;
    let token = app.admin_token();

    sqlx::query(
        "INSERT INTO news_categories (name, slug) VALUES ('Parches', 'parches-filter') \
         ON CONFLICT (slug) DO NOTHING",
    )
    .execute(app.pool())
    .await
    .expect("insert category failed");

    app.post_admin(
        "/news",
        json!({
            "title": "Notas del parche 1.2",
            "slug": "parche-1-2",
            "body": "cambios",
            "status": "published",
            "category": "parches-filter",
            "is_patch_notes": true,
            "version": "v1.2.0"
        }),
        Some(token),
    )
    .await;
    app.post_admin(
        "/news",
        json!({
            "title": "Nota sin categoría",
            "slug": "nota-sin-categoria",
            "body": "texto",
            "status": "published"
        }),
        Some(token),
    )
    .await;

    let resp = app.get("/news?category=parches-filter&limit=100", None).await;
    let filtered = titles(&resp);
    assert!(filtered.contains(&"Notas del parche 1.2".to_string()));
    assert!(!filtered.contains(&"Nota sin categoría".to_string()));

    let patch: Vec<String> = resp.json()["patch_notes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap().to_string())
        .collect();
    assert!(patch.contains(&"Notas del parche 1.2".to_string()));
}

#[tokio::test]
async fn unknown_category_rejected() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/news",
            json!({
                "title": "x",
                "body": "y",
                "category": "nope"
            }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unknown category");
}

// ===========================================================================
// Admin CRUD
// ===========================================================================

#[tokio::test]
async fn article_slug_generated_from_title() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/news",
            json!({
                "title": "Una Nota Muy Importante",
                "body": "texto",
                "status": "published"
            }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["slug"].as_str().unwrap(),
        "una-nota-muy-importante"
    );
}

#[tokio::test]
async fn update_and_delete_article() {
    let app = app().await;
    let token = app.admin_token();

    app.post_admin(
        "/news",
        json!({
            "title": "Para editar",
            "slug": "para-editar",
            "body": "v1",
            "status": "published"
        }),
        Some(token),
    )
    .await;

    let resp = app
        .put_admin(
            "/news/para-editar",
            json!({
                "title": "Editada",
                "slug": "para-editar",
                "body": "v2",
                "status": "published"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["body"].as_str().unwrap(), "v2");

    let resp = app.delete_admin("/news/para-editar", Some(token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/news/para-editar", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn news_mutations_require_admin() {
    let app = app().await;

    let resp = app
        .post_admin("/news", json!({ "title": "x", "body": "y" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

//! Codex CRUD Tests
//!
//! Admin-gated mutations, public reads, and the relation plumbing behind the
//! guide and story projections.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

// ===========================================================================
// Admin gating
// ===========================================================================

#[tokio::test]
async fn codex_mutations_require_admin_token() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/codex/domains",
            json!({ "name": "X", "slug": "x" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(
            "/codex/domains",
            json!({ "name": "X", "slug": "x" }),
            Some("wrong-token"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

// ===========================================================================
// Domains
// ===========================================================================

#[tokio::test]
async fn domain_crud() {
    let app = app().await;
    let token = app.admin_token();

    let resp = app
        .post_admin(
            "/codex/domains",
            json!({
                "name": "Dominio de Cenizas",
                "slug": "cenizas-crud",
                "short_description": "todo arde",
                "color": "#f80",
                "sort_order": 3
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["slug"].as_str().unwrap(), "cenizas-crud");

    // Public read
    let resp = app.get("/codex/domains/cenizas-crud", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["short_description"].as_str().unwrap(), "todo arde");

    // Full-replace update
    let resp = app
        .put_admin(
            "/codex/domains/cenizas-crud",
            json!({
                "name": "Dominio de Cenizas",
                "slug": "cenizas-crud",
                "short_description": "todo ardió"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["short_description"].as_str().unwrap(), "todo ardió");
    // Fields absent from the replacement fall back to their defaults
    assert_eq!(resp.json()["sort_order"].as_i64().unwrap(), 0);

    let resp = app.delete_admin("/codex/domains/cenizas-crud", Some(token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/codex/domains/cenizas-crud", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn domain_requires_name_and_slug() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/codex/domains",
            json!({ "name": "", "slug": "" }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Emblems
// ===========================================================================

#[tokio::test]
async fn emblem_resolves_domain_by_slug() {
    let app = app().await;
    let token = app.admin_token();
    let (_, domain_slug) = app.create_domain("emblem_ok").await;

    let resp = app
        .post_admin(
            "/codex/emblems",
            json!({
                "name": "Reloj Partido",
                "slug": "reloj-partido",
                "domain": domain_slug,
                "rarity": "mitico"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["domain_slug"].as_str().unwrap(), domain_slug);
    assert_eq!(body["rarity"].as_str().unwrap(), "mitico");
}

#[tokio::test]
async fn emblem_unknown_domain_rejected() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/codex/emblems",
            json!({
                "name": "Perdido",
                "slug": "perdido",
                "domain": "no-such-domain"
            }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unknown domain");
}

// ===========================================================================
// Traps (numeric external key)
// ===========================================================================

#[tokio::test]
async fn trap_crud_by_numeric_id() {
    let app = app().await;
    let token = app.admin_token();
    let (_, domain_slug) = app.create_domain("trap_crud").await;

    let resp = app
        .post_admin(
            "/codex/traps",
            json!({
                "domain": domain_slug,
                "title": "Suelo falso",
                "description": "cae"
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let trap_id = resp.json()["id"].as_i64().unwrap();

    let resp = app.get(&format!("/codex/traps/{}", trap_id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["title"].as_str().unwrap(), "Suelo falso");

    let resp = app
        .delete_admin(&format!("/codex/traps/{}", trap_id), Some(token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/codex/traps/{}", trap_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Guides & stories (relations)
// ===========================================================================

#[tokio::test]
async fn guide_relations_replaced_wholesale() {
    let app = app().await;
    let token = app.admin_token();
    let (_, domain_slug) = app.create_domain("guide_rel").await;

    app.post_admin(
        "/codex/emblems",
        json!({ "name": "A", "slug": "rel-emblem-a", "domain": domain_slug }),
        Some(token),
    )
    .await;
    app.post_admin(
        "/codex/emblems",
        json!({ "name": "B", "slug": "rel-emblem-b", "domain": domain_slug }),
        Some(token),
    )
    .await;

    let resp = app
        .post_admin(
            "/codex/guides",
            json!({
                "title": "Guía relacional",
                "slug": "guia-relacional",
                "body": "body",
                "related_artifacts": ["rel-emblem-a", "rel-emblem-b"]
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["related_artifacts"].as_array().unwrap().len(),
        2
    );

    // Update narrows the relation set; the old links must not survive
    let resp = app
        .put_admin(
            "/codex/guides/guia-relacional",
            json!({
                "title": "Guía relacional",
                "slug": "guia-relacional",
                "body": "body",
                "related_artifacts": ["rel-emblem-b"]
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let related = resp.json()["related_artifacts"].as_array().unwrap().clone();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].as_str().unwrap(), "rel-emblem-b");
}

#[tokio::test]
async fn story_gallery_keeps_asset_ids() {
    let app = app().await;
    let token = app.admin_token();

    let resp = app
        .post_admin(
            "/codex/assets",
            json!({ "file_key": "codex/assets/image/g1.png", "kind": "image" }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let asset_id = resp.json()["id"].as_i64().unwrap();

    let resp = app
        .post_admin(
            "/codex/stories",
            json!({
                "title": "Historia con galería",
                "slug": "historia-galeria",
                "body": "body",
                "gallery_asset_ids": [asset_id]
            }),
            Some(token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["gallery_asset_ids"][0].as_i64().unwrap(),
        asset_id
    );
}

use axum::{routing::delete, routing::get, routing::patch, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route("/profile/:username", get(handlers::get_profile))
        .route("/account/profile", get(handlers::get_own_profile))
        .route("/account/profile", patch(handlers::update_profile))
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/read-all",
            post(handlers::mark_notifications_read),
        )
}

pub fn community() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::feed))
        .route("/posts", post(handlers::create_post))
        .route("/posts/:slug", get(handlers::get_post))
        .route("/posts/:slug", patch(handlers::update_post))
        .route("/posts/:slug/remove", post(handlers::remove_post))
        .route("/posts/:slug/comments", get(handlers::list_comments))
        .route("/posts/:slug/comments", post(handlers::create_comment))
        .route("/posts/:slug/react/:kind", post(handlers::react_to_post))
        .route("/comments/:id/remove", post(handlers::remove_comment))
        .route(
            "/comments/:id/react/:kind",
            post(handlers::react_to_comment),
        )
}

pub fn forums() -> Router<AppState> {
    Router::new()
        .route("/forums", get(handlers::list_forums))
        .route("/forums/:slug", get(handlers::get_forum))
        .route("/threads", post(handlers::create_thread))
        .route(
            "/forums/:forum_slug/threads/:slug",
            get(handlers::get_thread),
        )
        .route("/threads/:slug/replies", post(handlers::create_reply))
        .route("/threads/:slug/remove", post(handlers::remove_thread))
        .route("/replies/:id/remove", post(handlers::remove_reply))
}

pub fn moderation() -> Router<AppState> {
    Router::new().route("/moderation/audit", get(handlers::list_moderation_audit))
}

pub fn codex() -> Router<AppState> {
    Router::new()
        .route("/codex/domains", get(handlers::list_domains))
        .route("/codex/domains", post(handlers::create_domain))
        .route("/codex/domains/:slug", get(handlers::get_domain))
        .route("/codex/domains/:slug", put(handlers::update_domain))
        .route("/codex/domains/:slug", delete(handlers::delete_domain))
        .route("/codex/assets", get(handlers::list_assets))
        .route("/codex/assets", post(handlers::create_asset))
        .route("/codex/assets/:id", get(handlers::get_asset))
        .route("/codex/assets/:id", put(handlers::update_asset))
        .route("/codex/assets/:id", delete(handlers::delete_asset))
        .route("/codex/stories", get(handlers::list_stories))
        .route("/codex/stories", post(handlers::create_story))
        .route("/codex/stories/:slug", get(handlers::get_story))
        .route("/codex/stories/:slug", put(handlers::update_story))
        .route("/codex/stories/:slug", delete(handlers::delete_story))
        .route("/codex/emblems", get(handlers::list_emblems))
        .route("/codex/emblems", post(handlers::create_emblem))
        .route("/codex/emblems/:slug", get(handlers::get_emblem))
        .route("/codex/emblems/:slug", put(handlers::update_emblem))
        .route("/codex/emblems/:slug", delete(handlers::delete_emblem))
        .route("/codex/characters", get(handlers::list_characters))
        .route("/codex/characters", post(handlers::create_character))
        .route("/codex/characters/:slug", get(handlers::get_character))
        .route("/codex/characters/:slug", put(handlers::update_character))
        .route(
            "/codex/characters/:slug",
            delete(handlers::delete_character),
        )
        .route("/codex/enemies", get(handlers::list_enemies))
        .route("/codex/enemies", post(handlers::create_enemy))
        .route("/codex/enemies/:slug", get(handlers::get_enemy))
        .route("/codex/enemies/:slug", put(handlers::update_enemy))
        .route("/codex/enemies/:slug", delete(handlers::delete_enemy))
        .route("/codex/traps", get(handlers::list_traps))
        .route("/codex/traps", post(handlers::create_trap))
        .route("/codex/traps/:id", get(handlers::get_trap))
        .route("/codex/traps/:id", put(handlers::update_trap))
        .route("/codex/traps/:id", delete(handlers::delete_trap))
        .route("/codex/guides", get(handlers::list_guides))
        .route("/codex/guides", post(handlers::create_guide))
        .route("/codex/guides/:slug", get(handlers::get_guide))
        .route("/codex/guides/:slug", put(handlers::update_guide))
        .route("/codex/guides/:slug", delete(handlers::delete_guide))
}

pub fn news() -> Router<AppState> {
    Router::new()
        .route("/news", get(handlers::news_index))
        .route("/news", post(handlers::create_article))
        .route("/news/categories", get(handlers::list_news_categories))
        .route("/news/tags", get(handlers::list_news_tags))
        .route("/news/:slug", get(handlers::get_article))
        .route("/news/:slug", put(handlers::update_article))
        .route("/news/:slug", delete(handlers::delete_article))
}

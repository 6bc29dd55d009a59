use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::auth::AuthService;
use crate::app::codex::{
    ArtifactInput, AssetInput, CharacterInput, CodexService, DomainInput, EnemyInput, GuideInput,
    LoreInput, TrapInput,
};
use crate::app::forums::ForumService;
use crate::app::moderation::ModerationService;
use crate::app::news::{ArticleFilter, ArticleInput, NewsService};
use crate::app::notifications::NotificationService;
use crate::app::posts::PostService;
use crate::app::reactions::ReactionService;
use crate::app::users::{valid_favorite_domain, UserService};
use crate::domain::codex::Rarity;
use crate::domain::forum::{Forum, Thread, ThreadReply};
use crate::domain::moderation::{ContentKind, ModerationLogEntry, RemovalOutcome};
use crate::domain::news::{ArticleStatus, Category, NewsArticle, Tag};
use crate::domain::notification::Notification;
use crate::domain::post::{Comment, Post, PostKind};
use crate::domain::user::{PublicProfile, User};
use crate::http::{AdminToken, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, i64)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = id
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, i64)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.identity.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokenResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if payload.password.trim().is_empty() {
        return Err(AppError::bad_request("password is required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = auth_service(&state);
    let (user, tokens) = service
        .register(&payload.email, &payload.password, payload.username.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to register");
            AppError::bad_request("registration was rejected")
        })?;

    Ok(Json(RegisterResponse {
        user,
        tokens: AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        },
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.identifier.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("identifier and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = auth_service(&state);
    let tokens = service
        .login(payload.identifier.trim(), &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    let tokens = service.refresh(&payload.refresh_token).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to refresh token");
        AppError::internal("failed to refresh token")
    })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub refresh_token: String,
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    let _ = service
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = auth_service(&state);
    let user = service.get_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to fetch current user");
        AppError::internal("failed to fetch current user")
    })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

async fn require_user(state: &AppState, user_id: i64) -> Result<User, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service.get(user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;
    user.ok_or_else(|| AppError::unauthorized("invalid token"))
}

// ---------------------------------------------------------------------------
// Profiles & notifications
// ---------------------------------------------------------------------------

pub async fn get_profile(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PublicProfile>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service.get_by_username(&username).await.map_err(|err| {
        tracing::error!(error = ?err, username = %username, "failed to fetch profile");
        AppError::internal("failed to fetch profile")
    })?;

    match user {
        Some(user) => Ok(Json(user.into())),
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn get_own_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = require_user(&state, auth.user_id).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub gamer_tag: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub favorite_domain: Option<String>,
    pub avatar_key: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if let Some(favorite) = payload.favorite_domain.as_deref() {
        if !valid_favorite_domain(favorite) {
            return Err(AppError::bad_request("invalid favorite domain"));
        }
    }

    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(
            auth.user_id,
            payload.display_name,
            payload.gamer_tag,
            payload.bio,
            payload.country,
            payload.city,
            payload.favorite_domain,
            payload.avatar_key,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

#[derive(Serialize)]
pub struct NotificationListResponse {
    pub items: Vec<Notification>,
    pub next_cursor: Option<String>,
    pub unread_count: i64,
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let limit = page_limit(query.limit);

    let service = NotificationService::new(state.db.clone());
    let items = service
        .list(auth.user_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;
    let unread_count = service.unread_count(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to count notifications");
        AppError::internal("failed to list notifications")
    })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|n| (n.created_at, n.id)))
    } else {
        None
    };

    Ok(Json(NotificationListResponse {
        items,
        next_cursor,
        unread_count,
    }))
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub marked: u64,
}

pub async fn mark_notifications_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let service = NotificationService::new(state.db.clone());
    let marked = service.mark_all_read(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to mark notifications read");
        AppError::internal("failed to mark notifications read")
    })?;
    Ok(Json(MarkReadResponse { marked }))
}

// ---------------------------------------------------------------------------
// Community: feed, posts, comments, reactions
// ---------------------------------------------------------------------------

pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let limit = page_limit(query.limit);

    let service = PostService::new(state.db.clone());
    let items = service.feed(cursor, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load feed");
        AppError::internal("failed to load feed")
    })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|p| (p.created_at, p.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

const MAX_POST_TITLE_LEN: usize = 140;
const MAX_COMMENT_LEN: usize = 1000;

#[derive(Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub body: String,
    pub kind: Option<String>,
    pub image_key: Option<String>,
}

fn validate_post(payload: &PostRequest) -> Result<PostKind, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if payload.title.chars().count() > MAX_POST_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 140 characters"));
    }
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body is required"));
    }
    match payload.kind.as_deref() {
        None => Ok(PostKind::Post),
        Some(kind) => {
            PostKind::from_db(kind).ok_or_else(|| AppError::bad_request("invalid post type"))
        }
    }
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<Post>, AppError> {
    let kind = validate_post(&payload)?;

    let service = PostService::new(state.db.clone());
    let post = service
        .create(
            auth.user_id,
            payload.title.trim(),
            &payload.body,
            kind,
            payload.image_key.as_deref(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Json(post))
}

pub async fn get_post(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn update_post(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<Post>, AppError> {
    let kind = validate_post(&payload)?;

    let service = PostService::new(state.db.clone());
    let post = service.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    let actor = require_user(&state, auth.user_id).await?;
    if actor.id != post.author_id && !actor.is_superuser {
        return Err(AppError::forbidden("only the author may edit this post"));
    }

    let updated = service
        .update(
            post.id,
            payload.title.trim(),
            &payload.body,
            kind,
            payload.image_key.as_deref(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match updated {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize, Default)]
pub struct RemoveRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize)]
pub struct RemovalResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

fn removal_response(
    outcome: RemovalOutcome,
    missing_message: &'static str,
) -> Result<Json<RemovalResponse>, AppError> {
    match outcome {
        RemovalOutcome::Moderated { parent } | RemovalOutcome::SelfRemoved { parent } => {
            Ok(Json(RemovalResponse {
                status: "removed",
                parent,
            }))
        }
        RemovalOutcome::AlreadyRemoved => Ok(Json(RemovalResponse {
            status: "already_removed",
            parent: None,
        })),
        RemovalOutcome::NotFound => Err(AppError::not_found(missing_message)),
        RemovalOutcome::Forbidden => Err(AppError::forbidden(
            "only the author or a moderator may remove this",
        )),
        RemovalOutcome::ReasonRequired => {
            Err(AppError::bad_request("provide a moderation reason"))
        }
    }
}

pub async fn remove_post(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<RemoveRequest>,
) -> Result<Json<RemovalResponse>, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    let actor = require_user(&state, auth.user_id).await?;
    let service = ModerationService::new(state.db.clone());
    let outcome = service
        .request_removal(ContentKind::Post, post.id, &actor, &payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to remove post");
            AppError::internal("failed to remove post")
        })?;

    removal_response(outcome, "post not found")
}

pub async fn list_comments(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    let comments = service.list_comments(post.id).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to list comments");
        AppError::internal("failed to list comments")
    })?;

    Ok(Json(comments))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn create_comment(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body is required"));
    }
    if payload.body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request(
            "comment must be at most 1000 characters",
        ));
    }

    let service = PostService::new(state.db.clone());
    let post = service.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = match post {
        Some(post) if !post.is_removed => post,
        _ => return Err(AppError::not_found("post not found")),
    };

    let comment = service
        .create_comment(post.id, auth.user_id, &payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to create comment");
            AppError::internal("failed to create comment")
        })?;

    Ok(Json(comment))
}

pub async fn remove_comment(
    auth: AuthUser,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<RemoveRequest>,
) -> Result<Json<RemovalResponse>, AppError> {
    let actor = require_user(&state, auth.user_id).await?;
    let service = ModerationService::new(state.db.clone());
    let outcome = service
        .request_removal(ContentKind::Comment, id, &actor, &payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = id, "failed to remove comment");
            AppError::internal("failed to remove comment")
        })?;

    removal_response(outcome, "comment not found")
}

#[derive(Serialize)]
pub struct ReactionResponse {
    pub status: &'static str,
}

pub async fn react_to_post(
    auth: AuthUser,
    Path((slug, kind)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<ReactionResponse>, AppError> {
    let kind = crate::domain::reaction::ReactionKind::from_db(&kind)
        .ok_or_else(|| AppError::bad_request("invalid reaction"))?;

    let posts = PostService::new(state.db.clone());
    let post = posts.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = match post {
        Some(post) if !post.is_removed => post,
        _ => return Err(AppError::not_found("post not found")),
    };

    let service = ReactionService::new(state.db.clone());
    let change = service
        .toggle_post_reaction(post.id, auth.user_id, kind)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to toggle reaction");
            AppError::internal("failed to toggle reaction")
        })?;

    Ok(Json(ReactionResponse {
        status: change.as_str(),
    }))
}

pub async fn react_to_comment(
    auth: AuthUser,
    Path((id, kind)): Path<(i64, String)>,
    State(state): State<AppState>,
) -> Result<Json<ReactionResponse>, AppError> {
    let kind = crate::domain::reaction::ReactionKind::from_db(&kind)
        .ok_or_else(|| AppError::bad_request("invalid reaction"))?;

    let posts = PostService::new(state.db.clone());
    let comment = posts.get_comment(id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = id, "failed to fetch comment");
        AppError::internal("failed to fetch comment")
    })?;
    let comment = match comment {
        Some(comment) if !comment.is_removed => comment,
        _ => return Err(AppError::not_found("comment not found")),
    };

    let service = ReactionService::new(state.db.clone());
    let change = service
        .toggle_comment_reaction(comment.id, auth.user_id, kind)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = id, "failed to toggle reaction");
            AppError::internal("failed to toggle reaction")
        })?;

    Ok(Json(ReactionResponse {
        status: change.as_str(),
    }))
}

// ---------------------------------------------------------------------------
// Forums
// ---------------------------------------------------------------------------

pub async fn list_forums(
    State(state): State<AppState>,
) -> Result<Json<Vec<Forum>>, AppError> {
    let service = ForumService::new(state.db.clone());
    let forums = service.list_forums().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list forums");
        AppError::internal("failed to list forums")
    })?;
    Ok(Json(forums))
}

#[derive(Serialize)]
pub struct ForumDetailResponse {
    pub forum: Forum,
    pub threads: Vec<Thread>,
}

pub async fn get_forum(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ForumDetailResponse>, AppError> {
    let service = ForumService::new(state.db.clone());
    let forum = service.get_forum(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch forum");
        AppError::internal("failed to fetch forum")
    })?;
    let forum = forum.ok_or_else(|| AppError::not_found("forum not found"))?;

    let threads = service.list_threads(forum.id).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to list threads");
        AppError::internal("failed to list threads")
    })?;

    Ok(Json(ForumDetailResponse { forum, threads }))
}

const MAX_THREAD_TITLE_LEN: usize = 150;

#[derive(Deserialize)]
pub struct ThreadRequest {
    pub forum: String,
    pub title: String,
    pub body: String,
    pub image_key: Option<String>,
}

pub async fn create_thread(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ThreadRequest>,
) -> Result<Json<Thread>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if payload.title.chars().count() > MAX_THREAD_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 150 characters"));
    }
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body is required"));
    }

    let service = ForumService::new(state.db.clone());
    let forum = service.get_forum(&payload.forum).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to fetch forum");
        AppError::internal("failed to fetch forum")
    })?;
    let forum = forum.ok_or_else(|| AppError::bad_request("unknown forum"))?;

    let thread = service
        .create_thread(
            forum.id,
            auth.user_id,
            payload.title.trim(),
            &payload.body,
            payload.image_key.as_deref(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create thread");
            AppError::internal("failed to create thread")
        })?;

    Ok(Json(thread))
}

#[derive(Serialize)]
pub struct ThreadDetailResponse {
    pub thread: Thread,
    pub replies: Vec<ThreadReply>,
}

pub async fn get_thread(
    Path((forum_slug, slug)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<ThreadDetailResponse>, AppError> {
    let service = ForumService::new(state.db.clone());
    let thread = service.get_thread_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch thread");
        AppError::internal("failed to fetch thread")
    })?;
    let thread = match thread {
        Some(thread) if thread.forum_slug == forum_slug => thread,
        _ => return Err(AppError::not_found("thread not found")),
    };

    let replies = service.list_replies(thread.id).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to list replies");
        AppError::internal("failed to list replies")
    })?;

    Ok(Json(ThreadDetailResponse { thread, replies }))
}

#[derive(Deserialize)]
pub struct ReplyRequest {
    pub body: String,
}

pub async fn create_reply(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ReplyRequest>,
) -> Result<Json<ThreadReply>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body is required"));
    }

    let service = ForumService::new(state.db.clone());
    let thread = service.get_thread_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch thread");
        AppError::internal("failed to fetch thread")
    })?;
    let thread = match thread {
        Some(thread) if !thread.is_removed => thread,
        _ => return Err(AppError::not_found("thread not found")),
    };
    if thread.is_locked {
        return Err(AppError::conflict("thread is locked"));
    }

    let reply = service
        .create_reply(thread.id, auth.user_id, &payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to create reply");
            AppError::internal("failed to create reply")
        })?;

    Ok(Json(reply))
}

pub async fn remove_thread(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<RemoveRequest>,
) -> Result<Json<RemovalResponse>, AppError> {
    let forums = ForumService::new(state.db.clone());
    let thread = forums.get_thread_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch thread");
        AppError::internal("failed to fetch thread")
    })?;
    let thread = thread.ok_or_else(|| AppError::not_found("thread not found"))?;

    let actor = require_user(&state, auth.user_id).await?;
    let service = ModerationService::new(state.db.clone());
    let outcome = service
        .request_removal(ContentKind::Thread, thread.id, &actor, &payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to remove thread");
            AppError::internal("failed to remove thread")
        })?;

    removal_response(outcome, "thread not found")
}

pub async fn remove_reply(
    auth: AuthUser,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<RemoveRequest>,
) -> Result<Json<RemovalResponse>, AppError> {
    let actor = require_user(&state, auth.user_id).await?;
    let service = ModerationService::new(state.db.clone());
    let outcome = service
        .request_removal(ContentKind::Reply, id, &actor, &payload.reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, reply_id = id, "failed to remove reply");
            AppError::internal("failed to remove reply")
        })?;

    removal_response(outcome, "reply not found")
}

pub async fn list_moderation_audit(
    _admin: AdminToken,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<ModerationLogEntry>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let limit = page_limit(query.limit);

    let service = ModerationService::new(state.db.clone());
    let items = service.list_audit(cursor, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list moderation audit");
        AppError::internal("failed to list moderation audit")
    })?;

    let next_cursor = if items.len() as i64 == limit {
        encode_cursor(items.last().map(|entry| (entry.created_at, entry.id)))
    } else {
        None
    };

    Ok(Json(ListResponse { items, next_cursor }))
}

// ---------------------------------------------------------------------------
// Codex
// ---------------------------------------------------------------------------

fn codex_service(state: &AppState) -> CodexService {
    CodexService::new(state.db.clone(), state.queue.clone())
}

async fn resolve_domain(
    service: &CodexService,
    slug: Option<&str>,
) -> Result<Option<i64>, AppError> {
    let Some(slug) = slug.filter(|slug| !slug.is_empty()) else {
        return Ok(None);
    };
    let id = service.domain_id_by_slug(slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to resolve domain");
        AppError::internal("failed to resolve domain")
    })?;
    match id {
        Some(id) => Ok(Some(id)),
        None => Err(AppError::bad_request("unknown domain")),
    }
}

macro_rules! internal {
    ($msg:expr) => {
        |err| {
            tracing::error!(error = ?err, $msg);
            AppError::internal($msg)
        }
    };
}

pub async fn list_domains(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Domain>>, AppError> {
    let items = codex_service(&state)
        .list_domains()
        .await
        .map_err(internal!("failed to list domains"))?;
    Ok(Json(items))
}

pub async fn get_domain(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Domain>, AppError> {
    let item = codex_service(&state)
        .get_domain(&slug)
        .await
        .map_err(internal!("failed to fetch domain"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("domain not found"))
}

pub async fn create_domain(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<DomainInput>,
) -> Result<Json<crate::domain::codex::Domain>, AppError> {
    if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(AppError::bad_request("name and slug are required"));
    }
    let item = codex_service(&state)
        .create_domain(&payload)
        .await
        .map_err(internal!("failed to create domain"))?;
    Ok(Json(item))
}

pub async fn update_domain(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<DomainInput>,
) -> Result<Json<crate::domain::codex::Domain>, AppError> {
    if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(AppError::bad_request("name and slug are required"));
    }
    let item = codex_service(&state)
        .update_domain(&slug, &payload)
        .await
        .map_err(internal!("failed to update domain"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("domain not found"))
}

pub async fn delete_domain(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_domain(&slug)
        .await
        .map_err(internal!("failed to delete domain"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("domain not found"))
    }
}

pub async fn list_assets(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Asset>>, AppError> {
    let items = codex_service(&state)
        .list_assets()
        .await
        .map_err(internal!("failed to list assets"))?;
    Ok(Json(items))
}

pub async fn get_asset(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Asset>, AppError> {
    let item = codex_service(&state)
        .get_asset(id)
        .await
        .map_err(internal!("failed to fetch asset"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("asset not found"))
}

pub async fn create_asset(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<AssetInput>,
) -> Result<Json<crate::domain::codex::Asset>, AppError> {
    if payload.file_key.trim().is_empty() {
        return Err(AppError::bad_request("file_key is required"));
    }
    let item = codex_service(&state)
        .create_asset(&payload)
        .await
        .map_err(internal!("failed to create asset"))?;
    Ok(Json(item))
}

pub async fn update_asset(
    _admin: AdminToken,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<AssetInput>,
) -> Result<Json<crate::domain::codex::Asset>, AppError> {
    if payload.file_key.trim().is_empty() {
        return Err(AppError::bad_request("file_key is required"));
    }
    let item = codex_service(&state)
        .update_asset(id, &payload)
        .await
        .map_err(internal!("failed to update asset"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("asset not found"))
}

pub async fn delete_asset(
    _admin: AdminToken,
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_asset(id)
        .await
        .map_err(internal!("failed to delete asset"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("asset not found"))
    }
}

#[derive(Deserialize)]
pub struct StoryRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    pub body: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub cover_image_key: Option<String>,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub gallery_asset_ids: Vec<i64>,
}

impl StoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(AppError::bad_request("title and slug are required"));
        }
        Ok(())
    }

    fn into_input(self, domain_id: Option<i64>) -> LoreInput {
        LoreInput {
            title: self.title,
            slug: self.slug,
            summary: self.summary,
            body: self.body,
            domain_id,
            cover_image_key: self.cover_image_key,
            video_url: self.video_url,
            gallery_asset_ids: self.gallery_asset_ids,
        }
    }
}

pub async fn list_stories(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::LoreEntry>>, AppError> {
    let items = codex_service(&state)
        .list_stories()
        .await
        .map_err(internal!("failed to list stories"))?;
    Ok(Json(items))
}

pub async fn get_story(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::LoreEntry>, AppError> {
    let item = codex_service(&state)
        .get_story(&slug)
        .await
        .map_err(internal!("failed to fetch story"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("story not found"))
}

pub async fn create_story(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<StoryRequest>,
) -> Result<Json<crate::domain::codex::LoreEntry>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .create_story(&payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to create story"))?;
    Ok(Json(item))
}

pub async fn update_story(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<StoryRequest>,
) -> Result<Json<crate::domain::codex::LoreEntry>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .update_story(&slug, &payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to update story"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("story not found"))
}

pub async fn delete_story(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_story(&slug)
        .await
        .map_err(internal!("failed to delete story"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("story not found"))
    }
}

fn default_rarity() -> Rarity {
    Rarity::Raro
}

#[derive(Deserialize)]
pub struct EmblemRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub quote: String,
    #[serde(default = "default_rarity")]
    pub rarity: Rarity,
    #[serde(default)]
    pub bearer: String,
    #[serde(default)]
    pub epoch: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub gif_key: Option<String>,
    #[serde(default)]
    pub video_url: String,
}

impl EmblemRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(AppError::bad_request("name and slug are required"));
        }
        Ok(())
    }

    fn into_input(self, domain_id: Option<i64>) -> ArtifactInput {
        ArtifactInput {
            name: self.name,
            slug: self.slug,
            domain_id,
            quote: self.quote,
            rarity: self.rarity,
            bearer: self.bearer,
            epoch: self.epoch,
            description: self.description,
            usage: self.usage,
            image_key: self.image_key,
            gif_key: self.gif_key,
            video_url: self.video_url,
        }
    }
}

pub async fn list_emblems(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Artifact>>, AppError> {
    let items = codex_service(&state)
        .list_emblems()
        .await
        .map_err(internal!("failed to list emblems"))?;
    Ok(Json(items))
}

pub async fn get_emblem(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Artifact>, AppError> {
    let item = codex_service(&state)
        .get_emblem(&slug)
        .await
        .map_err(internal!("failed to fetch emblem"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("emblem not found"))
}

pub async fn create_emblem(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<EmblemRequest>,
) -> Result<Json<crate::domain::codex::Artifact>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .create_emblem(&payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to create emblem"))?;
    Ok(Json(item))
}

pub async fn update_emblem(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<EmblemRequest>,
) -> Result<Json<crate::domain::codex::Artifact>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .update_emblem(&slug, &payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to update emblem"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("emblem not found"))
}

pub async fn delete_emblem(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_emblem(&slug)
        .await
        .map_err(internal!("failed to delete emblem"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("emblem not found"))
    }
}

#[derive(Deserialize)]
pub struct CharacterRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub playable: bool,
    #[serde(default)]
    pub sprite_still_key: Option<String>,
    #[serde(default)]
    pub sprite_gif_key: Option<String>,
    #[serde(default)]
    pub image_full_key: Option<String>,
    #[serde(default)]
    pub video_url: String,
}

impl CharacterRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(AppError::bad_request("name and slug are required"));
        }
        Ok(())
    }

    fn into_input(self, domain_id: Option<i64>) -> CharacterInput {
        CharacterInput {
            name: self.name,
            slug: self.slug,
            role: self.role,
            domain_id,
            description: self.description,
            playable: self.playable,
            sprite_still_key: self.sprite_still_key,
            sprite_gif_key: self.sprite_gif_key,
            image_full_key: self.image_full_key,
            video_url: self.video_url,
        }
    }
}

pub async fn list_characters(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Character>>, AppError> {
    let items = codex_service(&state)
        .list_characters()
        .await
        .map_err(internal!("failed to list characters"))?;
    Ok(Json(items))
}

pub async fn get_character(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Character>, AppError> {
    let item = codex_service(&state)
        .get_character(&slug)
        .await
        .map_err(internal!("failed to fetch character"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("character not found"))
}

pub async fn create_character(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CharacterRequest>,
) -> Result<Json<crate::domain::codex::Character>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .create_character(&payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to create character"))?;
    Ok(Json(item))
}

pub async fn update_character(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CharacterRequest>,
) -> Result<Json<crate::domain::codex::Character>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .update_character(&slug, &payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to update character"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("character not found"))
}

pub async fn delete_character(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_character(&slug)
        .await
        .map_err(internal!("failed to delete character"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("character not found"))
    }
}

#[derive(Deserialize)]
pub struct EnemyRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub behavior: String,
    #[serde(default)]
    pub sprite_still_key: Option<String>,
    #[serde(default)]
    pub sprite_gif_key: Option<String>,
    #[serde(default)]
    pub image_full_key: Option<String>,
    #[serde(default)]
    pub video_url: String,
}

impl EnemyRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(AppError::bad_request("name and slug are required"));
        }
        Ok(())
    }

    fn into_input(self, domain_id: Option<i64>) -> EnemyInput {
        EnemyInput {
            name: self.name,
            slug: self.slug,
            domain_id,
            description: self.description,
            behavior: self.behavior,
            sprite_still_key: self.sprite_still_key,
            sprite_gif_key: self.sprite_gif_key,
            image_full_key: self.image_full_key,
            video_url: self.video_url,
        }
    }
}

pub async fn list_enemies(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Enemy>>, AppError> {
    let items = codex_service(&state)
        .list_enemies()
        .await
        .map_err(internal!("failed to list enemies"))?;
    Ok(Json(items))
}

pub async fn get_enemy(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Enemy>, AppError> {
    let item = codex_service(&state)
        .get_enemy(&slug)
        .await
        .map_err(internal!("failed to fetch enemy"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("enemy not found"))
}

pub async fn create_enemy(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<EnemyRequest>,
) -> Result<Json<crate::domain::codex::Enemy>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .create_enemy(&payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to create enemy"))?;
    Ok(Json(item))
}

pub async fn update_enemy(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<EnemyRequest>,
) -> Result<Json<crate::domain::codex::Enemy>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .update_enemy(&slug, &payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to update enemy"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("enemy not found"))
}

pub async fn delete_enemy(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_enemy(&slug)
        .await
        .map_err(internal!("failed to delete enemy"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("enemy not found"))
    }
}

#[derive(Deserialize)]
pub struct TrapRequest {
    pub domain: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub gif_key: Option<String>,
}

pub async fn list_traps(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Trap>>, AppError> {
    let items = codex_service(&state)
        .list_traps()
        .await
        .map_err(internal!("failed to list traps"))?;
    Ok(Json(items))
}

pub async fn get_trap(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Trap>, AppError> {
    let item = codex_service(&state)
        .get_trap(id)
        .await
        .map_err(internal!("failed to fetch trap"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("trap not found"))
}

async fn trap_input(
    service: &CodexService,
    payload: TrapRequest,
) -> Result<TrapInput, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    let domain_id = resolve_domain(service, Some(payload.domain.as_str()))
        .await?
        .ok_or_else(|| AppError::bad_request("unknown domain"))?;
    Ok(TrapInput {
        domain_id,
        title: payload.title,
        description: payload.description,
        image_key: payload.image_key,
        gif_key: payload.gif_key,
    })
}

pub async fn create_trap(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<TrapRequest>,
) -> Result<Json<crate::domain::codex::Trap>, AppError> {
    let service = codex_service(&state);
    let input = trap_input(&service, payload).await?;
    let item = service
        .create_trap(&input)
        .await
        .map_err(internal!("failed to create trap"))?;
    Ok(Json(item))
}

pub async fn update_trap(
    _admin: AdminToken,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<TrapRequest>,
) -> Result<Json<crate::domain::codex::Trap>, AppError> {
    let service = codex_service(&state);
    let input = trap_input(&service, payload).await?;
    let item = service
        .update_trap(id, &input)
        .await
        .map_err(internal!("failed to update trap"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("trap not found"))
}

pub async fn delete_trap(
    _admin: AdminToken,
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_trap(id)
        .await
        .map_err(internal!("failed to delete trap"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("trap not found"))
    }
}

#[derive(Deserialize)]
pub struct GuideRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    pub body: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub related_artifacts: Vec<String>,
    #[serde(default)]
    pub related_characters: Vec<String>,
    #[serde(default)]
    pub related_enemies: Vec<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub cover_image_key: Option<String>,
    #[serde(default = "default_read_time")]
    pub read_time: i32,
}

fn default_read_time() -> i32 {
    4
}

impl GuideRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(AppError::bad_request("title and slug are required"));
        }
        Ok(())
    }

    fn into_input(self, domain_id: Option<i64>) -> GuideInput {
        GuideInput {
            title: self.title,
            slug: self.slug,
            summary: self.summary,
            body: self.body,
            domain_id,
            related_artifact_slugs: self.related_artifacts,
            related_character_slugs: self.related_characters,
            related_enemy_slugs: self.related_enemies,
            tags: self.tags,
            cover_image_key: self.cover_image_key,
            read_time: self.read_time,
        }
    }
}

pub async fn list_guides(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::codex::Guide>>, AppError> {
    let items = codex_service(&state)
        .list_guides()
        .await
        .map_err(internal!("failed to list guides"))?;
    Ok(Json(items))
}

pub async fn get_guide(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::codex::Guide>, AppError> {
    let item = codex_service(&state)
        .get_guide(&slug)
        .await
        .map_err(internal!("failed to fetch guide"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("guide not found"))
}

pub async fn create_guide(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<GuideRequest>,
) -> Result<Json<crate::domain::codex::Guide>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .create_guide(&payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to create guide"))?;
    Ok(Json(item))
}

pub async fn update_guide(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<GuideRequest>,
) -> Result<Json<crate::domain::codex::Guide>, AppError> {
    payload.validate()?;
    let service = codex_service(&state);
    let domain_id = resolve_domain(&service, payload.domain.as_deref()).await?;
    let item = service
        .update_guide(&slug, &payload.into_input(domain_id))
        .await
        .map_err(internal!("failed to update guide"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("guide not found"))
}

pub async fn delete_guide(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = codex_service(&state)
        .delete_guide(&slug)
        .await
        .map_err(internal!("failed to delete guide"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("guide not found"))
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct NewsIndexResponse {
    pub items: Vec<NewsArticle>,
    pub pinned: Vec<NewsArticle>,
    pub patch_notes: Vec<NewsArticle>,
}

pub async fn news_index(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsIndexResponse>, AppError> {
    let service = NewsService::new(state.db.clone());
    let filter = ArticleFilter {
        category: query.category,
        tag: query.tag,
        query: query.q,
    };
    let limit = page_limit(query.limit);

    let items = service
        .list_visible(&filter, limit)
        .await
        .map_err(internal!("failed to list news"))?;
    let pinned = service
        .pinned(3)
        .await
        .map_err(internal!("failed to list news"))?;
    let patch_notes = service
        .patch_notes(5)
        .await
        .map_err(internal!("failed to list news"))?;

    Ok(Json(NewsIndexResponse {
        items,
        pinned,
        patch_notes,
    }))
}

#[derive(Serialize)]
pub struct ArticleDetailResponse {
    pub item: NewsArticle,
    pub related: Vec<NewsArticle>,
}

pub async fn get_article(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ArticleDetailResponse>, AppError> {
    let service = NewsService::new(state.db.clone());
    let item = service
        .get_visible(&slug)
        .await
        .map_err(internal!("failed to fetch article"))?;
    let item = item.ok_or_else(|| AppError::not_found("article not found"))?;

    let related = service
        .related(&item, 6)
        .await
        .map_err(internal!("failed to fetch article"))?;

    Ok(Json(ArticleDetailResponse { item, related }))
}

fn default_status() -> ArticleStatus {
    ArticleStatus::Draft
}

#[derive(Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: String,
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hero_image_key: Option<String>,
    #[serde(default)]
    pub banner_image_key: Option<String>,
    #[serde(default)]
    pub video_url: String,
    #[serde(default = "default_status")]
    pub status: ArticleStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub publish_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub pin_home: bool,
    #[serde(default)]
    pub is_patch_notes: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_read_time")]
    pub reading_time: i32,
}

async fn article_input(
    service: &NewsService,
    payload: ArticleRequest,
) -> Result<ArticleInput, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body is required"));
    }

    let category_id = match payload.category.as_deref().filter(|slug| !slug.is_empty()) {
        Some(slug) => {
            let id = service
                .category_id_by_slug(slug)
                .await
                .map_err(internal!("failed to resolve category"))?;
            Some(id.ok_or_else(|| AppError::bad_request("unknown category"))?)
        }
        None => None,
    };

    Ok(ArticleInput {
        title: payload.title,
        slug: payload.slug,
        summary: payload.summary,
        body: payload.body,
        category_id,
        tag_slugs: payload.tags,
        hero_image_key: payload.hero_image_key,
        banner_image_key: payload.banner_image_key,
        video_url: payload.video_url,
        status: payload.status,
        publish_at: payload.publish_at,
        pin_home: payload.pin_home,
        is_patch_notes: payload.is_patch_notes,
        version: payload.version,
        reading_time: payload.reading_time,
    })
}

pub async fn create_article(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<ArticleRequest>,
) -> Result<Json<NewsArticle>, AppError> {
    let service = NewsService::new(state.db.clone());
    let input = article_input(&service, payload).await?;
    let item = service
        .create(None, &input)
        .await
        .map_err(internal!("failed to create article"))?;
    Ok(Json(item))
}

pub async fn update_article(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ArticleRequest>,
) -> Result<Json<NewsArticle>, AppError> {
    let service = NewsService::new(state.db.clone());
    let input = article_input(&service, payload).await?;
    let item = service
        .update(&slug, &input)
        .await
        .map_err(internal!("failed to update article"))?;
    item.map(Json)
        .ok_or_else(|| AppError::not_found("article not found"))
}

pub async fn delete_article(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let deleted = NewsService::new(state.db.clone())
        .delete(&slug)
        .await
        .map_err(internal!("failed to delete article"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("article not found"))
    }
}

pub async fn list_news_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let items = NewsService::new(state.db.clone())
        .list_categories()
        .await
        .map_err(internal!("failed to list categories"))?;
    Ok(Json(items))
}

pub async fn list_news_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    let items = NewsService::new(state.db.clone())
        .list_tags()
        .await
        .map_err(internal!("failed to list tags"))?;
    Ok(Json(items))
}

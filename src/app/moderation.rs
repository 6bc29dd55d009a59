use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::moderation::{ContentKind, ModerationLogEntry, RemovalOutcome};
use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ModerationService {
    db: Db,
}

struct Target {
    author_id: i64,
    is_removed: bool,
    title: Option<String>,
    parent_slug: Option<String>,
}

impl ModerationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Soft-remove a piece of content. Exactly one branch applies:
    /// a superuser removal (reason mandatory, audited, owner notified), a
    /// self-removal (flag flip only), or a rejection. Re-running against
    /// already-removed content is a no-op; the guarded UPDATE makes a
    /// duplicate audit row impossible even when two moderators race.
    pub async fn request_removal(
        &self,
        kind: ContentKind,
        object_id: i64,
        actor: &User,
        reason: &str,
    ) -> Result<RemovalOutcome> {
        let target = match self.load_target(kind, object_id).await? {
            Some(target) => target,
            None => return Ok(RemovalOutcome::NotFound),
        };

        if target.is_removed {
            return Ok(RemovalOutcome::AlreadyRemoved);
        }

        if actor.is_superuser {
            let reason = reason.trim();
            if reason.is_empty() {
                return Ok(RemovalOutcome::ReasonRequired);
            }
            return self.moderate(kind, object_id, actor, &target, reason).await;
        }

        if actor.id == target.author_id {
            let flipped = self.flip_flag(kind, object_id, self.db.pool()).await?;
            if !flipped {
                return Ok(RemovalOutcome::AlreadyRemoved);
            }
            return Ok(RemovalOutcome::SelfRemoved {
                parent: target.parent_slug,
            });
        }

        Ok(RemovalOutcome::Forbidden)
    }

    async fn moderate(
        &self,
        kind: ContentKind,
        object_id: i64,
        actor: &User,
        target: &Target,
        reason: &str,
    ) -> Result<RemovalOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let update = format!(
            "UPDATE {} SET is_removed = TRUE WHERE id = $1 AND is_removed = FALSE",
            kind.table()
        );
        let result = sqlx::query(&update)
            .bind(object_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RemovalOutcome::AlreadyRemoved);
        }

        sqlx::query(
            "INSERT INTO moderation_log (content_type, object_id, removed_by, owner_id, reason) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(kind.as_db())
        .bind(object_id)
        .bind(actor.id)
        .bind(target.author_id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO notifications (user_id, message) VALUES ($1, $2)")
            .bind(target.author_id)
            .bind(removal_message(kind, target.title.as_deref(), reason))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(RemovalOutcome::Moderated {
            parent: target.parent_slug.clone(),
        })
    }

    async fn flip_flag(&self, kind: ContentKind, object_id: i64, pool: &sqlx::PgPool) -> Result<bool> {
        let update = format!(
            "UPDATE {} SET is_removed = TRUE WHERE id = $1 AND is_removed = FALSE",
            kind.table()
        );
        let result = sqlx::query(&update).bind(object_id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_target(&self, kind: ContentKind, object_id: i64) -> Result<Option<Target>> {
        let sql = match kind {
            ContentKind::Post => {
                "SELECT author_id, is_removed, title, NULL::text AS parent_slug \
                 FROM posts WHERE id = $1"
            }
            ContentKind::Comment => {
                "SELECT c.author_id, c.is_removed, NULL::text AS title, p.slug AS parent_slug \
                 FROM comments c JOIN posts p ON p.id = c.post_id WHERE c.id = $1"
            }
            ContentKind::Thread => {
                "SELECT t.author_id, t.is_removed, t.title, f.slug AS parent_slug \
                 FROM threads t JOIN forums f ON f.id = t.forum_id WHERE t.id = $1"
            }
            ContentKind::Reply => {
                "SELECT r.author_id, r.is_removed, NULL::text AS title, t.slug AS parent_slug \
                 FROM thread_replies r JOIN threads t ON t.id = r.thread_id WHERE r.id = $1"
            }
        };

        let row = sqlx::query(sql)
            .bind(object_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Target {
            author_id: row.get("author_id"),
            is_removed: row.get("is_removed"),
            title: row.get("title"),
            parent_slug: row.get("parent_slug"),
        }))
    }

    pub async fn list_audit(
        &self,
        cursor: Option<(OffsetDateTime, i64)>,
        limit: i64,
    ) -> Result<Vec<ModerationLogEntry>> {
        let rows = match cursor {
            Some((created_at, entry_id)) => {
                sqlx::query(
                    "SELECT id, content_type, object_id, removed_by, owner_id, reason, created_at \
                     FROM moderation_log \
                     WHERE (created_at < $1 OR (created_at = $1 AND id < $2)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                )
                .bind(created_at)
                .bind(entry_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, content_type, object_id, removed_by, owner_id, reason, created_at \
                     FROM moderation_log \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $1",
                )
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(ModerationLogEntry {
                id: row.get("id"),
                content_type: row.get("content_type"),
                object_id: row.get("object_id"),
                removed_by: row.get("removed_by"),
                owner_id: row.get("owner_id"),
                reason: row.get("reason"),
                created_at: row.get("created_at"),
            });
        }

        Ok(entries)
    }
}

fn removal_message(kind: ContentKind, title: Option<&str>, reason: &str) -> String {
    match kind {
        ContentKind::Post => format!(
            "Tu publicación \"{}\" fue retirada: {}",
            title.unwrap_or(""),
            reason
        ),
        ContentKind::Comment => format!("Tu comentario fue retirado: {}", reason),
        ContentKind::Thread => {
            format!("Tu hilo \"{}\" fue retirado: {}", title.unwrap_or(""), reason)
        }
        ContentKind::Reply => format!("Tu respuesta fue retirada: {}", reason),
    }
}

use anyhow::Result;
use sqlx::Row;

use crate::domain::reaction::{ReactionChange, ReactionKind};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ReactionService {
    db: Db,
}

impl ReactionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn toggle_post_reaction(
        &self,
        post_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionChange> {
        self.toggle("post_reactions", "post_id", post_id, user_id, kind)
            .await
    }

    pub async fn toggle_comment_reaction(
        &self,
        comment_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionChange> {
        self.toggle("comment_reactions", "comment_id", comment_id, user_id, kind)
            .await
    }

    /// Three-way toggle per (target, user): absent → added, present with the
    /// same kind → removed, present with another kind → updated in place.
    /// The UNIQUE (target, user) constraint is the arbiter under concurrency;
    /// losing an insert race degrades into the update path instead of
    /// surfacing a conflict.
    async fn toggle(
        &self,
        table: &str,
        target_column: &str,
        target_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionChange> {
        let select = format!(
            "SELECT id, reaction FROM {} WHERE {} = $1 AND user_id = $2",
            table, target_column
        );
        let existing = sqlx::query(&select)
            .bind(target_id)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        if let Some(row) = existing {
            let reaction_id: i64 = row.get("id");
            let current: String = row.get("reaction");

            if current == kind.as_db() {
                let delete = format!("DELETE FROM {} WHERE id = $1", table);
                sqlx::query(&delete)
                    .bind(reaction_id)
                    .execute(self.db.pool())
                    .await?;
                return Ok(ReactionChange::Removed);
            }

            let update = format!("UPDATE {} SET reaction = $1 WHERE id = $2", table);
            sqlx::query(&update)
                .bind(kind.as_db())
                .bind(reaction_id)
                .execute(self.db.pool())
                .await?;
            return Ok(ReactionChange::Updated);
        }

        let insert = format!(
            "INSERT INTO {} ({}, user_id, reaction) VALUES ($1, $2, $3) \
             ON CONFLICT ({}, user_id) DO NOTHING \
             RETURNING id",
            table, target_column, target_column
        );
        let inserted = sqlx::query(&insert)
            .bind(target_id)
            .bind(user_id)
            .bind(kind.as_db())
            .fetch_optional(self.db.pool())
            .await?;

        if inserted.is_some() {
            return Ok(ReactionChange::Added);
        }

        // Lost a race against a concurrent toggle for the same pair; the
        // surviving row gets this request's kind.
        let update = format!(
            "UPDATE {} SET reaction = $1 WHERE {} = $2 AND user_id = $3",
            table, target_column
        );
        sqlx::query(&update)
            .bind(kind.as_db())
            .bind(target_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(ReactionChange::Updated)
    }
}

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::slug::slugify;
use crate::domain::forum::{Forum, Thread, ThreadReply};
use crate::infra::db::Db;

const THREAD_COLUMNS: &str = "t.id, t.forum_id, f.slug AS forum_slug, t.author_id, \
     u.username AS author_username, t.title, t.body, t.image_key, t.slug, \
     t.is_locked, t.is_removed, t.created_at, t.updated_at";

#[derive(Clone)]
pub struct ForumService {
    db: Db,
}

impl ForumService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_forums(&self) -> Result<Vec<Forum>> {
        let rows = sqlx::query("SELECT id, title, description, slug FROM forums ORDER BY title")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|row| Forum {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                slug: row.get("slug"),
            })
            .collect())
    }

    pub async fn get_forum(&self, slug: &str) -> Result<Option<Forum>> {
        let row = sqlx::query("SELECT id, title, description, slug FROM forums WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Forum {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            slug: row.get("slug"),
        }))
    }

    /// Threads of a forum, removed ones hidden, newest first.
    pub async fn list_threads(&self, forum_id: i64) -> Result<Vec<Thread>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM threads t \
             JOIN forums f ON f.id = t.forum_id \
             JOIN users u ON u.id = t.author_id \
             WHERE t.forum_id = $1 AND NOT t.is_removed \
             ORDER BY t.created_at DESC, t.id DESC",
            THREAD_COLUMNS
        ))
        .bind(forum_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(thread_from_row).collect())
    }

    pub async fn create_thread(
        &self,
        forum_id: i64,
        author_id: i64,
        title: &str,
        body: &str,
        image_key: Option<&str>,
    ) -> Result<Thread> {
        let slug = slugify(&format!(
            "{}-{}-{}-{}",
            title,
            forum_id,
            author_id,
            OffsetDateTime::now_utc().unix_timestamp()
        ));

        let thread_id: i64 = sqlx::query_scalar(
            "INSERT INTO threads (forum_id, author_id, title, body, image_key, slug) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(forum_id)
        .bind(author_id)
        .bind(title)
        .bind(body)
        .bind(image_key)
        .bind(&slug)
        .fetch_one(self.db.pool())
        .await?;

        self.get_thread(thread_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("thread vanished after insert"))
    }

    pub async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM threads t \
             JOIN forums f ON f.id = t.forum_id \
             JOIN users u ON u.id = t.author_id \
             WHERE t.id = $1",
            THREAD_COLUMNS
        ))
        .bind(thread_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(thread_from_row))
    }

    pub async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM threads t \
             JOIN forums f ON f.id = t.forum_id \
             JOIN users u ON u.id = t.author_id \
             WHERE t.slug = $1",
            THREAD_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(thread_from_row))
    }

    pub async fn list_replies(&self, thread_id: i64) -> Result<Vec<ThreadReply>> {
        let rows = sqlx::query(
            "SELECT r.id, r.thread_id, r.author_id, u.username AS author_username, r.body, \
                    r.is_removed, r.created_at \
             FROM thread_replies r JOIN users u ON u.id = r.author_id \
             WHERE r.thread_id = $1 AND NOT r.is_removed \
             ORDER BY r.created_at, r.id",
        )
        .bind(thread_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(reply_from_row).collect())
    }

    pub async fn create_reply(
        &self,
        thread_id: i64,
        author_id: i64,
        body: &str,
    ) -> Result<ThreadReply> {
        let reply_id: i64 = sqlx::query_scalar(
            "INSERT INTO thread_replies (thread_id, author_id, body) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(thread_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        let row = sqlx::query(
            "SELECT r.id, r.thread_id, r.author_id, u.username AS author_username, r.body, \
                    r.is_removed, r.created_at \
             FROM thread_replies r JOIN users u ON u.id = r.author_id WHERE r.id = $1",
        )
        .bind(reply_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(reply_from_row(&row))
    }
}

fn thread_from_row(row: &PgRow) -> Thread {
    Thread {
        id: row.get("id"),
        forum_id: row.get("forum_id"),
        forum_slug: row.get("forum_slug"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        title: row.get("title"),
        body: row.get("body"),
        image_key: row.get("image_key"),
        slug: row.get("slug"),
        is_locked: row.get("is_locked"),
        is_removed: row.get("is_removed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn reply_from_row(row: &PgRow) -> ThreadReply {
    ThreadReply {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        body: row.get("body"),
        is_removed: row.get("is_removed"),
        created_at: row.get("created_at"),
    }
}

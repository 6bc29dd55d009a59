use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::slug::slugify;
use crate::domain::post::{Comment, Post, PostKind};
use crate::infra::db::Db;

const POST_COLUMNS: &str = "p.id, p.author_id, u.username AS author_username, p.title, p.body, \
     p.kind, p.image_key, p.slug, p.is_removed, p.created_at, p.updated_at, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND NOT c.is_removed) AS comments_count, \
     (SELECT COUNT(*) FROM post_reactions r WHERE r.post_id = p.id) AS reactions_count";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Default listing: removed posts are hidden, newest first.
    pub async fn feed(
        &self,
        cursor: Option<(OffsetDateTime, i64)>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE NOT p.is_removed \
                       AND (p.created_at < $1 OR (p.created_at = $1 AND p.id < $2)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $3",
                    POST_COLUMNS
                ))
                .bind(created_at)
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE NOT p.is_removed \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $1",
                    POST_COLUMNS
                ))
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn create(
        &self,
        author_id: i64,
        title: &str,
        body: &str,
        kind: PostKind,
        image_key: Option<&str>,
    ) -> Result<Post> {
        let slug = slugify(&format!(
            "{}-{}-{}",
            title,
            author_id,
            OffsetDateTime::now_utc().unix_timestamp()
        ));

        let post_id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (author_id, title, body, kind, image_key, slug) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(author_id)
        .bind(title)
        .bind(body)
        .bind(kind.as_db())
        .bind(image_key)
        .bind(&slug)
        .fetch_one(self.db.pool())
        .await?;

        self.get(post_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post vanished after insert"))
    }

    pub async fn get(&self, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.slug = $1",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    pub async fn update(
        &self,
        post_id: i64,
        title: &str,
        body: &str,
        kind: PostKind,
        image_key: Option<&str>,
    ) -> Result<Option<Post>> {
        let result = sqlx::query(
            "UPDATE posts \
             SET title = $2, body = $3, kind = $4, image_key = $5, updated_at = now() \
             WHERE id = $1",
        )
        .bind(post_id)
        .bind(title)
        .bind(body)
        .bind(kind.as_db())
        .bind(image_key)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(post_id).await
    }

    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.body, \
                    c.is_removed, c.created_at, \
                    (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id) AS reactions_count \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 AND NOT c.is_removed \
             ORDER BY c.created_at, c.id",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn create_comment(&self, post_id: i64, author_id: i64, body: &str) -> Result<Comment> {
        let comment_id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (post_id, author_id, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.body, \
                    c.is_removed, c.created_at, \
                    (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id) AS reactions_count \
             FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = $1",
        )
        .bind(comment_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(comment_from_row(&row))
    }

    pub async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.body, \
                    c.is_removed, c.created_at, \
                    (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id) AS reactions_count \
             FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = $1",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }
}

fn post_from_row(row: &PgRow) -> Post {
    let kind: String = row.get("kind");
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        title: row.get("title"),
        body: row.get("body"),
        kind: PostKind::from_db(&kind).unwrap_or(PostKind::Post),
        image_key: row.get("image_key"),
        slug: row.get("slug"),
        is_removed: row.get("is_removed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        comments_count: row.get("comments_count"),
        reactions_count: row.get("reactions_count"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        body: row.get("body"),
        is_removed: row.get("is_removed"),
        created_at: row.get("created_at"),
        reactions_count: row.get("reactions_count"),
    }
}

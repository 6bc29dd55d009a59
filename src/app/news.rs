use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::slug::slugify;
use crate::domain::news::{ArticleStatus, Category, NewsArticle, Tag};
use crate::infra::db::Db;

/// Articles count as visible once published, or scheduled with a publish
/// time in the past.
const VISIBLE: &str =
    "(n.status = 'published' OR (n.status = 'scheduled' AND n.publish_at <= now()))";

#[derive(Debug, Clone)]
pub struct ArticleInput {
    pub title: String,
    pub slug: Option<String>,
    pub summary: String,
    pub body: String,
    pub category_id: Option<i64>,
    pub tag_slugs: Vec<String>,
    pub hero_image_key: Option<String>,
    pub banner_image_key: Option<String>,
    pub video_url: String,
    pub status: ArticleStatus,
    pub publish_at: Option<OffsetDateTime>,
    pub pin_home: bool,
    pub is_patch_notes: bool,
    pub version: String,
    pub reading_time: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub query: Option<String>,
}

#[derive(Clone)]
pub struct NewsService {
    db: Db,
}

impl NewsService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_visible(&self, filter: &ArticleFilter, limit: i64) -> Result<Vec<NewsArticle>> {
        let rows = sqlx::query(&article_select(&format!(
            "WHERE {} \
               AND ($1::text IS NULL OR c.slug = $1) \
               AND ($2::text IS NULL OR EXISTS ( \
                     SELECT 1 FROM news_article_tags at \
                     JOIN news_tags t ON t.id = at.tag_id \
                     WHERE at.article_id = n.id AND t.slug = $2)) \
               AND ($3::text IS NULL \
                    OR n.title ILIKE '%' || $3 || '%' \
                    OR n.summary ILIKE '%' || $3 || '%' \
                    OR n.body ILIKE '%' || $3 || '%') \
             ORDER BY n.pin_home DESC, n.publish_at DESC NULLS LAST, n.created_at DESC \
             LIMIT $4",
            VISIBLE
        )))
        .bind(&filter.category)
        .bind(&filter.tag)
        .bind(&filter.query)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        self.articles_from_rows(rows).await
    }

    pub async fn pinned(&self, limit: i64) -> Result<Vec<NewsArticle>> {
        let rows = sqlx::query(&article_select(
            "WHERE n.pin_home AND n.status = 'published' \
             ORDER BY n.publish_at DESC NULLS LAST, n.created_at DESC \
             LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        self.articles_from_rows(rows).await
    }

    pub async fn patch_notes(&self, limit: i64) -> Result<Vec<NewsArticle>> {
        let rows = sqlx::query(&article_select(
            "WHERE n.is_patch_notes AND n.status = 'published' \
             ORDER BY n.publish_at DESC NULLS LAST, n.created_at DESC \
             LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        self.articles_from_rows(rows).await
    }

    pub async fn get_visible(&self, slug: &str) -> Result<Option<NewsArticle>> {
        let row = sqlx::query(&article_select(&format!(
            "WHERE n.slug = $1 AND {}",
            VISIBLE
        )))
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(self.article_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, slug: &str) -> Result<Option<NewsArticle>> {
        let row = sqlx::query(&article_select("WHERE n.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.article_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    /// Published articles sharing the category or a tag with the given one.
    pub async fn related(&self, article: &NewsArticle, limit: i64) -> Result<Vec<NewsArticle>> {
        let rows = sqlx::query(&article_select(
            "WHERE n.status = 'published' AND n.id <> $1 \
               AND (($2::bigint IS NOT NULL AND n.category_id = $2) \
                    OR EXISTS ( \
                        SELECT 1 FROM news_article_tags at \
                        JOIN news_tags t ON t.id = at.tag_id \
                        WHERE at.article_id = n.id AND t.slug = ANY($3))) \
             ORDER BY n.publish_at DESC NULLS LAST, n.created_at DESC \
             LIMIT $4",
        ))
        .bind(article.id)
        .bind(
            sqlx::query_scalar::<_, Option<i64>>("SELECT category_id FROM news_articles WHERE id = $1")
                .bind(article.id)
                .fetch_optional(self.db.pool())
                .await?
                .flatten(),
        )
        .bind(&article.tag_slugs)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        self.articles_from_rows(rows).await
    }

    pub async fn create(&self, author_id: Option<i64>, input: &ArticleInput) -> Result<NewsArticle> {
        let slug = match input.slug.as_deref().filter(|slug| !slug.is_empty()) {
            Some(slug) => slug.to_string(),
            None => slugify(&input.title).chars().take(175).collect(),
        };

        let mut tx = self.db.pool().begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO news_articles (title, slug, summary, body, author_id, category_id, \
                 hero_image_key, banner_image_key, video_url, status, publish_at, pin_home, \
                 is_patch_notes, version, reading_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(author_id)
        .bind(input.category_id)
        .bind(&input.hero_image_key)
        .bind(&input.banner_image_key)
        .bind(&input.video_url)
        .bind(input.status.as_db())
        .bind(input.publish_at)
        .bind(input.pin_home)
        .bind(input.is_patch_notes)
        .bind(&input.version)
        .bind(input.reading_time)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO news_article_tags (article_id, tag_id) \
             SELECT $1, id FROM news_tags WHERE slug = ANY($2)",
        )
        .bind(id)
        .bind(&input.tag_slugs)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get(&slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("article vanished after insert"))
    }

    pub async fn update(&self, slug: &str, input: &ArticleInput) -> Result<Option<NewsArticle>> {
        let new_slug = match input.slug.as_deref().filter(|slug| !slug.is_empty()) {
            Some(slug) => slug.to_string(),
            None => slug.to_string(),
        };

        let mut tx = self.db.pool().begin().await?;
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE news_articles \
             SET title = $2, slug = $3, summary = $4, body = $5, category_id = $6, \
                 hero_image_key = $7, banner_image_key = $8, video_url = $9, status = $10, \
                 publish_at = $11, pin_home = $12, is_patch_notes = $13, version = $14, \
                 reading_time = $15, updated_at = now() \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.title)
        .bind(&new_slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(input.category_id)
        .bind(&input.hero_image_key)
        .bind(&input.banner_image_key)
        .bind(&input.video_url)
        .bind(input.status.as_db())
        .bind(input.publish_at)
        .bind(input.pin_home)
        .bind(input.is_patch_notes)
        .bind(&input.version)
        .bind(input.reading_time)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM news_article_tags WHERE article_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO news_article_tags (article_id, tag_id) \
             SELECT $1, id FROM news_tags WHERE slug = ANY($2)",
        )
        .bind(id)
        .bind(&input.tag_slugs)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get(&new_slug).await
    }

    pub async fn delete(&self, slug: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM news_articles WHERE slug = $1")
            .bind(slug)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows =
            sqlx::query("SELECT id, name, slug, color, icon FROM news_categories ORDER BY name")
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .iter()
            .map(|row| Category {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
                color: row.get("color"),
                icon: row.get("icon"),
            })
            .collect())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, slug FROM news_tags ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
            })
            .collect())
    }

    pub async fn category_id_by_slug(&self, slug: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM news_categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(id)
    }

    async fn articles_from_rows(&self, rows: Vec<PgRow>) -> Result<Vec<NewsArticle>> {
        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(self.article_from_row(&row).await?);
        }
        Ok(articles)
    }

    async fn article_from_row(&self, row: &PgRow) -> Result<NewsArticle> {
        let id: i64 = row.get("id");
        let tag_slugs: Vec<String> = sqlx::query_scalar(
            "SELECT t.slug FROM news_article_tags at \
             JOIN news_tags t ON t.id = at.tag_id \
             WHERE at.article_id = $1 ORDER BY t.name",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        let status: String = row.get("status");
        Ok(NewsArticle {
            id,
            title: row.get("title"),
            slug: row.get("slug"),
            summary: row.get("summary"),
            body: row.get("body"),
            author_id: row.get("author_id"),
            author_username: row.get("author_username"),
            category_slug: row.get("category_slug"),
            tag_slugs,
            hero_image_key: row.get("hero_image_key"),
            banner_image_key: row.get("banner_image_key"),
            video_url: row.get("video_url"),
            status: ArticleStatus::from_db(&status).unwrap_or(ArticleStatus::Draft),
            publish_at: row.get("publish_at"),
            pin_home: row.get("pin_home"),
            is_patch_notes: row.get("is_patch_notes"),
            version: row.get("version"),
            reading_time: row.get("reading_time"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

fn article_select(tail: &str) -> String {
    format!(
        "SELECT n.id, n.title, n.slug, n.summary, n.body, n.author_id, \
                u.username AS author_username, c.slug AS category_slug, n.hero_image_key, \
                n.banner_image_key, n.video_url, n.status, n.publish_at, n.pin_home, \
                n.is_patch_notes, n.version, n.reading_time, n.created_at, n.updated_at \
         FROM news_articles n \
         LEFT JOIN users u ON u.id = n.author_id \
         LEFT JOIN news_categories c ON c.id = n.category_id {}",
        tail
    )
}

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::warn;

use crate::app::projection;
use crate::domain::codex::{
    Artifact, Asset, AssetKind, Character, Collection, Domain, Enemy, Guide, LoreEntry, Rarity,
    Trap,
};
use crate::infra::db::Db;
use crate::infra::queue::QueueClient;
use crate::jobs::codex_sync::{SyncJob, SyncOp};

/// Encyclopedia CRUD. Every successful mutation schedules a sync job so the
/// document-store mirror converges on the relational state; scheduling is
/// best-effort and never fails the mutation itself.
#[derive(Clone)]
pub struct CodexService {
    db: Db,
    queue: QueueClient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub cover_image_key: Option<String>,
    #[serde(default)]
    pub banner_image_key: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetInput {
    pub file_key: String,
    pub kind: AssetKind,
    #[serde(default)]
    pub caption: String,
}

#[derive(Debug, Clone)]
pub struct LoreInput {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub domain_id: Option<i64>,
    pub cover_image_key: Option<String>,
    pub video_url: String,
    pub gallery_asset_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct ArtifactInput {
    pub name: String,
    pub slug: String,
    pub domain_id: Option<i64>,
    pub quote: String,
    pub rarity: Rarity,
    pub bearer: String,
    pub epoch: String,
    pub description: String,
    pub usage: String,
    pub image_key: Option<String>,
    pub gif_key: Option<String>,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct CharacterInput {
    pub name: String,
    pub slug: String,
    pub role: String,
    pub domain_id: Option<i64>,
    pub description: String,
    pub playable: bool,
    pub sprite_still_key: Option<String>,
    pub sprite_gif_key: Option<String>,
    pub image_full_key: Option<String>,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct EnemyInput {
    pub name: String,
    pub slug: String,
    pub domain_id: Option<i64>,
    pub description: String,
    pub behavior: String,
    pub sprite_still_key: Option<String>,
    pub sprite_gif_key: Option<String>,
    pub image_full_key: Option<String>,
    pub video_url: String,
}

#[derive(Debug, Clone)]
pub struct TrapInput {
    pub domain_id: i64,
    pub title: String,
    pub description: String,
    pub image_key: Option<String>,
    pub gif_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GuideInput {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub domain_id: Option<i64>,
    pub related_artifact_slugs: Vec<String>,
    pub related_character_slugs: Vec<String>,
    pub related_enemy_slugs: Vec<String>,
    pub tags: String,
    pub cover_image_key: Option<String>,
    pub read_time: i32,
}

impl CodexService {
    pub fn new(db: Db, queue: QueueClient) -> Self {
        Self { db, queue }
    }

    pub async fn domain_id_by_slug(&self, slug: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM domains WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Domains
    // ------------------------------------------------------------------

    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, short_description, cover_image_key, banner_image_key, \
                    color, icon, video_url, sort_order \
             FROM domains ORDER BY sort_order, name",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(domain_from_row).collect())
    }

    pub async fn get_domain(&self, slug: &str) -> Result<Option<Domain>> {
        let row = sqlx::query(
            "SELECT id, name, slug, short_description, cover_image_key, banner_image_key, \
                    color, icon, video_url, sort_order \
             FROM domains WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(domain_from_row))
    }

    async fn load_domain(&self, id: i64) -> Result<Option<Domain>> {
        let row = sqlx::query(
            "SELECT id, name, slug, short_description, cover_image_key, banner_image_key, \
                    color, icon, video_url, sort_order \
             FROM domains WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(domain_from_row))
    }

    pub async fn create_domain(&self, input: &DomainInput) -> Result<Domain> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO domains (name, slug, short_description, cover_image_key, \
                                  banner_image_key, color, icon, video_url, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.short_description)
        .bind(&input.cover_image_key)
        .bind(&input.banner_image_key)
        .bind(&input.color)
        .bind(&input.icon)
        .bind(&input.video_url)
        .bind(input.sort_order)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Domains, id).await;
        self.load_domain(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("domain vanished after insert"))
    }

    pub async fn update_domain(&self, slug: &str, input: &DomainInput) -> Result<Option<Domain>> {
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE domains \
             SET name = $2, slug = $3, short_description = $4, cover_image_key = $5, \
                 banner_image_key = $6, color = $7, icon = $8, video_url = $9, sort_order = $10 \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.short_description)
        .bind(&input.cover_image_key)
        .bind(&input.banner_image_key)
        .bind(&input.color)
        .bind(&input.icon)
        .bind(&input.video_url)
        .bind(input.sort_order)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(id) = id else { return Ok(None) };
        self.schedule_upsert(Collection::Domains, id).await;
        self.load_domain(id).await
    }

    pub async fn delete_domain(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM domains WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Domains, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    pub async fn list_assets(&self) -> Result<Vec<Asset>> {
        let rows = sqlx::query("SELECT id, file_key, kind, caption FROM assets ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(asset_from_row).collect())
    }

    pub async fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        let row = sqlx::query("SELECT id, file_key, kind, caption FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(asset_from_row))
    }

    pub async fn create_asset(&self, input: &AssetInput) -> Result<Asset> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO assets (file_key, kind, caption) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.file_key)
        .bind(input.kind.as_db())
        .bind(&input.caption)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Assets, id).await;
        self.get_asset(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("asset vanished after insert"))
    }

    pub async fn update_asset(&self, id: i64, input: &AssetInput) -> Result<Option<Asset>> {
        let result = sqlx::query(
            "UPDATE assets SET file_key = $2, kind = $3, caption = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&input.file_key)
        .bind(input.kind.as_db())
        .bind(&input.caption)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.schedule_upsert(Collection::Assets, id).await;
        self.get_asset(id).await
    }

    pub async fn delete_asset(&self, id: i64) -> Result<bool> {
        let deleted: Option<i64> =
            sqlx::query_scalar("DELETE FROM assets WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(id) => {
                self.schedule_delete(Collection::Assets, id.to_string()).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Stories (lore entries)
    // ------------------------------------------------------------------

    pub async fn list_stories(&self) -> Result<Vec<LoreEntry>> {
        let rows = sqlx::query(&lore_select("ORDER BY l.title"))
            .fetch_all(self.db.pool())
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(self.lore_from_row(&row).await?);
        }
        Ok(entries)
    }

    pub async fn get_story(&self, slug: &str) -> Result<Option<LoreEntry>> {
        let row = sqlx::query(&lore_select("WHERE l.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.lore_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn load_story(&self, id: i64) -> Result<Option<LoreEntry>> {
        let row = sqlx::query(&lore_select("WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.lore_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn create_story(&self, input: &LoreInput) -> Result<LoreEntry> {
        let mut tx = self.db.pool().begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO lore_entries (title, slug, summary, body, domain_id, \
                                       cover_image_key, video_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(input.domain_id)
        .bind(&input.cover_image_key)
        .bind(&input.video_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO lore_gallery (lore_id, asset_id) \
             SELECT $1, id FROM assets WHERE id = ANY($2)",
        )
        .bind(id)
        .bind(&input.gallery_asset_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.schedule_upsert(Collection::Stories, id).await;
        self.load_story(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("story vanished after insert"))
    }

    pub async fn update_story(&self, slug: &str, input: &LoreInput) -> Result<Option<LoreEntry>> {
        let mut tx = self.db.pool().begin().await?;
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE lore_entries \
             SET title = $2, slug = $3, summary = $4, body = $5, domain_id = $6, \
                 cover_image_key = $7, video_url = $8 \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(input.domain_id)
        .bind(&input.cover_image_key)
        .bind(&input.video_url)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM lore_gallery WHERE lore_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO lore_gallery (lore_id, asset_id) \
             SELECT $1, id FROM assets WHERE id = ANY($2)",
        )
        .bind(id)
        .bind(&input.gallery_asset_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.schedule_upsert(Collection::Stories, id).await;
        self.load_story(id).await
    }

    pub async fn delete_story(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM lore_entries WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Stories, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn lore_from_row(&self, row: &PgRow) -> Result<LoreEntry> {
        let id: i64 = row.get("id");
        let gallery_asset_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT asset_id FROM lore_gallery WHERE lore_id = $1 ORDER BY asset_id",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(LoreEntry {
            id,
            title: row.get("title"),
            slug: row.get("slug"),
            summary: row.get("summary"),
            body: row.get("body"),
            domain_id: row.get("domain_id"),
            domain_slug: row.get("domain_slug"),
            cover_image_key: row.get("cover_image_key"),
            video_url: row.get("video_url"),
            gallery_asset_ids,
            created_at: row.get("created_at"),
        })
    }

    // ------------------------------------------------------------------
    // Emblems (artifacts)
    // ------------------------------------------------------------------

    pub async fn list_emblems(&self) -> Result<Vec<Artifact>> {
        let rows = sqlx::query(&artifact_select("ORDER BY a.name"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(artifact_from_row).collect())
    }

    pub async fn get_emblem(&self, slug: &str) -> Result<Option<Artifact>> {
        let row = sqlx::query(&artifact_select("WHERE a.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(artifact_from_row))
    }

    async fn load_emblem(&self, id: i64) -> Result<Option<Artifact>> {
        let row = sqlx::query(&artifact_select("WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(artifact_from_row))
    }

    pub async fn create_emblem(&self, input: &ArtifactInput) -> Result<Artifact> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO artifacts (name, slug, domain_id, quote, rarity, bearer, epoch, \
                                    description, usage, image_key, gif_key, video_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.domain_id)
        .bind(&input.quote)
        .bind(input.rarity.as_db())
        .bind(&input.bearer)
        .bind(&input.epoch)
        .bind(&input.description)
        .bind(&input.usage)
        .bind(&input.image_key)
        .bind(&input.gif_key)
        .bind(&input.video_url)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Emblems, id).await;
        self.load_emblem(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("emblem vanished after insert"))
    }

    pub async fn update_emblem(&self, slug: &str, input: &ArtifactInput) -> Result<Option<Artifact>> {
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE artifacts \
             SET name = $2, slug = $3, domain_id = $4, quote = $5, rarity = $6, bearer = $7, \
                 epoch = $8, description = $9, usage = $10, image_key = $11, gif_key = $12, \
                 video_url = $13 \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.domain_id)
        .bind(&input.quote)
        .bind(input.rarity.as_db())
        .bind(&input.bearer)
        .bind(&input.epoch)
        .bind(&input.description)
        .bind(&input.usage)
        .bind(&input.image_key)
        .bind(&input.gif_key)
        .bind(&input.video_url)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(id) = id else { return Ok(None) };
        self.schedule_upsert(Collection::Emblems, id).await;
        self.load_emblem(id).await
    }

    pub async fn delete_emblem(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM artifacts WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Emblems, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    pub async fn list_characters(&self) -> Result<Vec<Character>> {
        let rows = sqlx::query(&character_select("ORDER BY c.name"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(character_from_row).collect())
    }

    pub async fn get_character(&self, slug: &str) -> Result<Option<Character>> {
        let row = sqlx::query(&character_select("WHERE c.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(character_from_row))
    }

    async fn load_character(&self, id: i64) -> Result<Option<Character>> {
        let row = sqlx::query(&character_select("WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(character_from_row))
    }

    pub async fn create_character(&self, input: &CharacterInput) -> Result<Character> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO characters (name, slug, role, domain_id, description, playable, \
                                     sprite_still_key, sprite_gif_key, image_full_key, video_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.role)
        .bind(input.domain_id)
        .bind(&input.description)
        .bind(input.playable)
        .bind(&input.sprite_still_key)
        .bind(&input.sprite_gif_key)
        .bind(&input.image_full_key)
        .bind(&input.video_url)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Characters, id).await;
        self.load_character(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("character vanished after insert"))
    }

    pub async fn update_character(
        &self,
        slug: &str,
        input: &CharacterInput,
    ) -> Result<Option<Character>> {
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE characters \
             SET name = $2, slug = $3, role = $4, domain_id = $5, description = $6, \
                 playable = $7, sprite_still_key = $8, sprite_gif_key = $9, \
                 image_full_key = $10, video_url = $11 \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.role)
        .bind(input.domain_id)
        .bind(&input.description)
        .bind(input.playable)
        .bind(&input.sprite_still_key)
        .bind(&input.sprite_gif_key)
        .bind(&input.image_full_key)
        .bind(&input.video_url)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(id) = id else { return Ok(None) };
        self.schedule_upsert(Collection::Characters, id).await;
        self.load_character(id).await
    }

    pub async fn delete_character(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM characters WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Characters, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Enemies
    // ------------------------------------------------------------------

    pub async fn list_enemies(&self) -> Result<Vec<Enemy>> {
        let rows = sqlx::query(&enemy_select("ORDER BY e.name"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(enemy_from_row).collect())
    }

    pub async fn get_enemy(&self, slug: &str) -> Result<Option<Enemy>> {
        let row = sqlx::query(&enemy_select("WHERE e.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(enemy_from_row))
    }

    async fn load_enemy(&self, id: i64) -> Result<Option<Enemy>> {
        let row = sqlx::query(&enemy_select("WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(enemy_from_row))
    }

    pub async fn create_enemy(&self, input: &EnemyInput) -> Result<Enemy> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO enemies (name, slug, domain_id, description, behavior, \
                                  sprite_still_key, sprite_gif_key, image_full_key, video_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.domain_id)
        .bind(&input.description)
        .bind(&input.behavior)
        .bind(&input.sprite_still_key)
        .bind(&input.sprite_gif_key)
        .bind(&input.image_full_key)
        .bind(&input.video_url)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Enemies, id).await;
        self.load_enemy(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("enemy vanished after insert"))
    }

    pub async fn update_enemy(&self, slug: &str, input: &EnemyInput) -> Result<Option<Enemy>> {
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE enemies \
             SET name = $2, slug = $3, domain_id = $4, description = $5, behavior = $6, \
                 sprite_still_key = $7, sprite_gif_key = $8, image_full_key = $9, video_url = $10 \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.domain_id)
        .bind(&input.description)
        .bind(&input.behavior)
        .bind(&input.sprite_still_key)
        .bind(&input.sprite_gif_key)
        .bind(&input.image_full_key)
        .bind(&input.video_url)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(id) = id else { return Ok(None) };
        self.schedule_upsert(Collection::Enemies, id).await;
        self.load_enemy(id).await
    }

    pub async fn delete_enemy(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM enemies WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Enemies, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Traps (no slug; keyed by numeric id)
    // ------------------------------------------------------------------

    pub async fn list_traps(&self) -> Result<Vec<Trap>> {
        let rows = sqlx::query(&trap_select("ORDER BY d.name, t.title"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(trap_from_row).collect())
    }

    pub async fn get_trap(&self, id: i64) -> Result<Option<Trap>> {
        let row = sqlx::query(&trap_select("WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(trap_from_row))
    }

    pub async fn create_trap(&self, input: &TrapInput) -> Result<Trap> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO traps (domain_id, title, description, image_key, gif_key) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(input.domain_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_key)
        .bind(&input.gif_key)
        .fetch_one(self.db.pool())
        .await?;

        self.schedule_upsert(Collection::Traps, id).await;
        self.get_trap(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("trap vanished after insert"))
    }

    pub async fn update_trap(&self, id: i64, input: &TrapInput) -> Result<Option<Trap>> {
        let result = sqlx::query(
            "UPDATE traps \
             SET domain_id = $2, title = $3, description = $4, image_key = $5, gif_key = $6 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.domain_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_key)
        .bind(&input.gif_key)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.schedule_upsert(Collection::Traps, id).await;
        self.get_trap(id).await
    }

    pub async fn delete_trap(&self, id: i64) -> Result<bool> {
        let deleted: Option<i64> =
            sqlx::query_scalar("DELETE FROM traps WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(id) => {
                self.schedule_delete(Collection::Traps, id.to_string()).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Guides
    // ------------------------------------------------------------------

    pub async fn list_guides(&self) -> Result<Vec<Guide>> {
        let rows = sqlx::query(&guide_select("ORDER BY g.updated_at DESC, g.created_at DESC, g.title"))
            .fetch_all(self.db.pool())
            .await?;

        let mut guides = Vec::with_capacity(rows.len());
        for row in rows {
            guides.push(self.guide_from_row(&row).await?);
        }
        Ok(guides)
    }

    pub async fn get_guide(&self, slug: &str) -> Result<Option<Guide>> {
        let row = sqlx::query(&guide_select("WHERE g.slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.guide_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn load_guide(&self, id: i64) -> Result<Option<Guide>> {
        let row = sqlx::query(&guide_select("WHERE g.id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.guide_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn create_guide(&self, input: &GuideInput) -> Result<Guide> {
        let mut tx = self.db.pool().begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO guides (title, slug, summary, body, domain_id, tags, \
                                 cover_image_key, read_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(input.domain_id)
        .bind(&input.tags)
        .bind(&input.cover_image_key)
        .bind(input.read_time)
        .fetch_one(&mut *tx)
        .await?;

        relate_guide(&mut tx, id, input).await?;
        tx.commit().await?;

        self.schedule_upsert(Collection::Guides, id).await;
        self.load_guide(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("guide vanished after insert"))
    }

    pub async fn update_guide(&self, slug: &str, input: &GuideInput) -> Result<Option<Guide>> {
        let mut tx = self.db.pool().begin().await?;
        let id: Option<i64> = sqlx::query_scalar(
            "UPDATE guides \
             SET title = $2, slug = $3, summary = $4, body = $5, domain_id = $6, tags = $7, \
                 cover_image_key = $8, read_time = $9, updated_at = now() \
             WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(input.domain_id)
        .bind(&input.tags)
        .bind(&input.cover_image_key)
        .bind(input.read_time)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM guide_artifacts WHERE guide_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM guide_characters WHERE guide_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM guide_enemies WHERE guide_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        relate_guide(&mut tx, id, input).await?;
        tx.commit().await?;

        self.schedule_upsert(Collection::Guides, id).await;
        self.load_guide(id).await
    }

    pub async fn delete_guide(&self, slug: &str) -> Result<bool> {
        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM guides WHERE slug = $1 RETURNING slug")
                .bind(slug)
                .fetch_optional(self.db.pool())
                .await?;

        match deleted {
            Some(doc_id) => {
                self.schedule_delete(Collection::Guides, doc_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn guide_from_row(&self, row: &PgRow) -> Result<Guide> {
        let id: i64 = row.get("id");
        let related_artifacts: Vec<String> = sqlx::query_scalar(
            "SELECT a.slug FROM guide_artifacts ga \
             JOIN artifacts a ON a.id = ga.artifact_id \
             WHERE ga.guide_id = $1 ORDER BY a.name",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;
        let related_characters: Vec<String> = sqlx::query_scalar(
            "SELECT c.slug FROM guide_characters gc \
             JOIN characters c ON c.id = gc.character_id \
             WHERE gc.guide_id = $1 ORDER BY c.name",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;
        let related_enemies: Vec<String> = sqlx::query_scalar(
            "SELECT e.slug FROM guide_enemies ge \
             JOIN enemies e ON e.id = ge.enemy_id \
             WHERE ge.guide_id = $1 ORDER BY e.name",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Guide {
            id,
            title: row.get("title"),
            slug: row.get("slug"),
            summary: row.get("summary"),
            body: row.get("body"),
            domain_id: row.get("domain_id"),
            domain_slug: row.get("domain_slug"),
            related_artifacts,
            related_characters,
            related_enemies,
            tags: row.get("tags"),
            cover_image_key: row.get("cover_image_key"),
            read_time: row.get("read_time"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    // ------------------------------------------------------------------
    // Sync plumbing
    // ------------------------------------------------------------------

    /// Projection of the current relational state, recomputed from scratch.
    /// `None` when the row no longer exists (a delete job is on its way).
    pub async fn build_document(
        &self,
        collection: Collection,
        record_id: i64,
        site_url: &str,
    ) -> Result<Option<Value>> {
        let document = match collection {
            Collection::Assets => self
                .get_asset(record_id)
                .await?
                .map(|asset| projection::asset_document(site_url, &asset)),
            Collection::Domains => self
                .load_domain(record_id)
                .await?
                .map(|domain| projection::domain_document(site_url, &domain)),
            Collection::Emblems => self
                .load_emblem(record_id)
                .await?
                .map(|artifact| projection::emblem_document(site_url, &artifact)),
            Collection::Characters => self
                .load_character(record_id)
                .await?
                .map(|character| projection::character_document(site_url, &character)),
            Collection::Enemies => self
                .load_enemy(record_id)
                .await?
                .map(|enemy| projection::enemy_document(site_url, &enemy)),
            Collection::Guides => self
                .load_guide(record_id)
                .await?
                .map(|guide| projection::guide_document(site_url, &guide)),
            Collection::Stories => self
                .load_story(record_id)
                .await?
                .map(|entry| projection::story_document(site_url, &entry)),
            Collection::Traps => self
                .get_trap(record_id)
                .await?
                .map(|trap| projection::trap_document(site_url, &trap)),
        };
        Ok(document)
    }

    async fn schedule_upsert(&self, collection: Collection, record_id: i64) {
        let job = SyncJob {
            collection,
            op: SyncOp::Upsert { record_id },
        };
        if let Err(err) = self.queue.enqueue_sync_job(&job).await {
            warn!(
                error = ?err,
                collection = %collection,
                record_id,
                "failed to enqueue codex sync job"
            );
        }
    }

    async fn schedule_delete(&self, collection: Collection, doc_id: String) {
        let job = SyncJob {
            collection,
            op: SyncOp::Delete { doc_id },
        };
        if let Err(err) = self.queue.enqueue_sync_job(&job).await {
            warn!(
                error = ?err,
                collection = %collection,
                "failed to enqueue codex sync job"
            );
        }
    }
}

async fn relate_guide(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    guide_id: i64,
    input: &GuideInput,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO guide_artifacts (guide_id, artifact_id) \
         SELECT $1, id FROM artifacts WHERE slug = ANY($2)",
    )
    .bind(guide_id)
    .bind(&input.related_artifact_slugs)
    .execute(&mut **tx)
    .await?;
    sqlx::query(
        "INSERT INTO guide_characters (guide_id, character_id) \
         SELECT $1, id FROM characters WHERE slug = ANY($2)",
    )
    .bind(guide_id)
    .bind(&input.related_character_slugs)
    .execute(&mut **tx)
    .await?;
    sqlx::query(
        "INSERT INTO guide_enemies (guide_id, enemy_id) \
         SELECT $1, id FROM enemies WHERE slug = ANY($2)",
    )
    .bind(guide_id)
    .bind(&input.related_enemy_slugs)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn domain_from_row(row: &PgRow) -> Domain {
    Domain {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        short_description: row.get("short_description"),
        cover_image_key: row.get("cover_image_key"),
        banner_image_key: row.get("banner_image_key"),
        color: row.get("color"),
        icon: row.get("icon"),
        video_url: row.get("video_url"),
        sort_order: row.get("sort_order"),
    }
}

fn asset_from_row(row: &PgRow) -> Asset {
    let kind: String = row.get("kind");
    Asset {
        id: row.get("id"),
        file_key: row.get("file_key"),
        kind: AssetKind::from_db(&kind).unwrap_or(AssetKind::Image),
        caption: row.get("caption"),
    }
}

fn artifact_from_row(row: &PgRow) -> Artifact {
    let rarity: String = row.get("rarity");
    Artifact {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        domain_id: row.get("domain_id"),
        domain_slug: row.get("domain_slug"),
        quote: row.get("quote"),
        rarity: Rarity::from_db(&rarity).unwrap_or(Rarity::Raro),
        bearer: row.get("bearer"),
        epoch: row.get("epoch"),
        description: row.get("description"),
        usage: row.get("usage"),
        image_key: row.get("image_key"),
        gif_key: row.get("gif_key"),
        video_url: row.get("video_url"),
        created_at: row.get("created_at"),
    }
}

fn character_from_row(row: &PgRow) -> Character {
    Character {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        role: row.get("role"),
        domain_id: row.get("domain_id"),
        domain_slug: row.get("domain_slug"),
        description: row.get("description"),
        playable: row.get("playable"),
        sprite_still_key: row.get("sprite_still_key"),
        sprite_gif_key: row.get("sprite_gif_key"),
        image_full_key: row.get("image_full_key"),
        video_url: row.get("video_url"),
        created_at: row.get("created_at"),
    }
}

fn enemy_from_row(row: &PgRow) -> Enemy {
    Enemy {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        domain_id: row.get("domain_id"),
        domain_slug: row.get("domain_slug"),
        description: row.get("description"),
        behavior: row.get("behavior"),
        sprite_still_key: row.get("sprite_still_key"),
        sprite_gif_key: row.get("sprite_gif_key"),
        image_full_key: row.get("image_full_key"),
        video_url: row.get("video_url"),
        created_at: row.get("created_at"),
    }
}

fn trap_from_row(row: &PgRow) -> Trap {
    Trap {
        id: row.get("id"),
        domain_id: row.get("domain_id"),
        domain_slug: row.get("domain_slug"),
        title: row.get("title"),
        description: row.get("description"),
        image_key: row.get("image_key"),
        gif_key: row.get("gif_key"),
    }
}

fn lore_select(tail: &str) -> String {
    format!(
        "SELECT l.id, l.title, l.slug, l.summary, l.body, l.domain_id, d.slug AS domain_slug, \
                l.cover_image_key, l.video_url, l.created_at \
         FROM lore_entries l LEFT JOIN domains d ON d.id = l.domain_id {}",
        tail
    )
}

fn artifact_select(tail: &str) -> String {
    format!(
        "SELECT a.id, a.name, a.slug, a.domain_id, d.slug AS domain_slug, a.quote, a.rarity, \
                a.bearer, a.epoch, a.description, a.usage, a.image_key, a.gif_key, a.video_url, \
                a.created_at \
         FROM artifacts a LEFT JOIN domains d ON d.id = a.domain_id {}",
        tail
    )
}

fn character_select(tail: &str) -> String {
    format!(
        "SELECT c.id, c.name, c.slug, c.role, c.domain_id, d.slug AS domain_slug, c.description, \
                c.playable, c.sprite_still_key, c.sprite_gif_key, c.image_full_key, c.video_url, \
                c.created_at \
         FROM characters c LEFT JOIN domains d ON d.id = c.domain_id {}",
        tail
    )
}

fn enemy_select(tail: &str) -> String {
    format!(
        "SELECT e.id, e.name, e.slug, e.domain_id, d.slug AS domain_slug, e.description, \
                e.behavior, e.sprite_still_key, e.sprite_gif_key, e.image_full_key, e.video_url, \
                e.created_at \
         FROM enemies e LEFT JOIN domains d ON d.id = e.domain_id {}",
        tail
    )
}

fn trap_select(tail: &str) -> String {
    format!(
        "SELECT t.id, t.domain_id, d.slug AS domain_slug, t.title, t.description, \
                t.image_key, t.gif_key \
         FROM traps t JOIN domains d ON d.id = t.domain_id {}",
        tail
    )
}

fn guide_select(tail: &str) -> String {
    format!(
        "SELECT g.id, g.title, g.slug, g.summary, g.body, g.domain_id, d.slug AS domain_slug, \
                g.tags, g.cover_image_key, g.read_time, g.created_at, g.updated_at \
         FROM guides g LEFT JOIN domains d ON d.id = g.domain_id {}",
        tail
    )
}

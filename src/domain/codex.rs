use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One document-store collection per synchronizable entity variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Assets,
    Domains,
    Emblems,
    Characters,
    Enemies,
    Guides,
    Stories,
    Traps,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Domains => "domains",
            Self::Emblems => "emblems",
            Self::Characters => "characters",
            Self::Enemies => "enemies",
            Self::Guides => "guides",
            Self::Stories => "stories",
            Self::Traps => "traps",
        }
    }

    /// Document field the store keys on. Assets and traps have no slug and
    /// fall back to their numeric id, consistently for upsert and delete.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Self::Assets | Self::Traps => "id",
            _ => "slug",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub short_description: String,
    pub cover_image_key: Option<String>,
    pub banner_image_key: Option<String>,
    pub color: String,
    pub icon: String,
    pub video_url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub file_key: String,
    pub kind: AssetKind,
    pub caption: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Gif,
    Video,
}

impl AssetKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "gif" => Some(Self::Gif),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Gif => "gif",
            Self::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoreEntry {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub domain_id: Option<i64>,
    pub domain_slug: Option<String>,
    pub cover_image_key: Option<String>,
    pub video_url: String,
    /// Numeric ids of the gallery assets, in insertion order.
    pub gallery_asset_ids: Vec<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Comun,
    Raro,
    Epico,
    Mitico,
}

impl Rarity {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "comun" => Some(Self::Comun),
            "raro" => Some(Self::Raro),
            "epico" => Some(Self::Epico),
            "mitico" => Some(Self::Mitico),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Comun => "comun",
            Self::Raro => "raro",
            Self::Epico => "epico",
            Self::Mitico => "mitico",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub domain_id: Option<i64>,
    pub domain_slug: Option<String>,
    pub quote: String,
    pub rarity: Rarity,
    pub bearer: String,
    pub epoch: String,
    pub description: String,
    pub usage: String,
    pub image_key: Option<String>,
    pub gif_key: Option<String>,
    pub video_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub role: String,
    pub domain_id: Option<i64>,
    pub domain_slug: Option<String>,
    pub description: String,
    pub playable: bool,
    pub sprite_still_key: Option<String>,
    pub sprite_gif_key: Option<String>,
    pub image_full_key: Option<String>,
    pub video_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub domain_id: Option<i64>,
    pub domain_slug: Option<String>,
    pub description: String,
    pub behavior: String,
    pub sprite_still_key: Option<String>,
    pub sprite_gif_key: Option<String>,
    pub image_full_key: Option<String>,
    pub video_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trap {
    pub id: i64,
    pub domain_id: i64,
    pub domain_slug: String,
    pub title: String,
    pub description: String,
    pub image_key: Option<String>,
    pub gif_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guide {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub domain_id: Option<i64>,
    pub domain_slug: Option<String>,
    /// Slugs of related entities, ordered by name.
    pub related_artifacts: Vec<String>,
    pub related_characters: Vec<String>,
    pub related_enemies: Vec<String>,
    pub tags: String,
    pub cover_image_key: Option<String>,
    pub read_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

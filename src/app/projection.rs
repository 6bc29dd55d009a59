use serde_json::{json, Value};

use crate::domain::codex::{Artifact, Asset, Character, Domain, Enemy, Guide, LoreEntry, Trap};

/// Absolute URL for a stored media reference. Values that are already
/// absolute pass through unchanged; anything else is served from the site's
/// /media/ tree. Missing references project as the empty string.
pub fn absolute_media_url(site_url: &str, key: Option<&str>) -> String {
    let key = match key {
        Some(key) if !key.is_empty() => key,
        _ => return String::new(),
    };
    if key.starts_with("http://") || key.starts_with("https://") {
        return key.to_string();
    }
    format!("{}/media/{}", site_url, key)
}

pub fn asset_document(site_url: &str, asset: &Asset) -> Value {
    json!({
        "id": asset.id,
        "kind": asset.kind.as_db(),
        "caption": asset.caption,
        "fileUrl": absolute_media_url(site_url, Some(&asset.file_key)),
    })
}

pub fn domain_document(site_url: &str, domain: &Domain) -> Value {
    json!({
        "name": domain.name,
        "slug": domain.slug,
        "shortDescription": domain.short_description,
        "coverImageUrl": absolute_media_url(site_url, domain.cover_image_key.as_deref()),
        "bannerImageUrl": absolute_media_url(site_url, domain.banner_image_key.as_deref()),
        "color": domain.color,
        "icon": domain.icon,
        "videoUrl": domain.video_url,
        "order": domain.sort_order,
    })
}

pub fn emblem_document(site_url: &str, artifact: &Artifact) -> Value {
    json!({
        "name": artifact.name,
        "slug": artifact.slug,
        "domainId": artifact.domain_slug,
        "quote": artifact.quote,
        "rarity": artifact.rarity.as_db(),
        "usage": artifact.usage,
        "epoch": artifact.epoch,
        "description": artifact.description,
        "imageUrl": absolute_media_url(site_url, artifact.image_key.as_deref()),
        "gifUrl": absolute_media_url(site_url, artifact.gif_key.as_deref()),
        "videoUrl": artifact.video_url,
    })
}

pub fn character_document(site_url: &str, character: &Character) -> Value {
    json!({
        "name": character.name,
        "slug": character.slug,
        "role": character.role,
        "domainId": character.domain_slug,
        "description": character.description,
        "playable": character.playable,
        "imageUrl": absolute_media_url(site_url, character.sprite_still_key.as_deref()),
        "gifUrl": absolute_media_url(site_url, character.sprite_gif_key.as_deref()),
    })
}

pub fn enemy_document(site_url: &str, enemy: &Enemy) -> Value {
    json!({
        "name": enemy.name,
        "slug": enemy.slug,
        "domainId": enemy.domain_slug,
        "description": enemy.description,
        "behavior": enemy.behavior,
        "spriteStillUrl": absolute_media_url(site_url, enemy.sprite_still_key.as_deref()),
        "spriteGifUrl": absolute_media_url(site_url, enemy.sprite_gif_key.as_deref()),
        "imageFullUrl": absolute_media_url(site_url, enemy.image_full_key.as_deref()),
        "videoUrl": enemy.video_url,
    })
}

pub fn guide_document(site_url: &str, guide: &Guide) -> Value {
    json!({
        "title": guide.title,
        "slug": guide.slug,
        "summary": guide.summary,
        "body": guide.body,
        "domainId": guide.domain_slug,
        "relatedArtifacts": guide.related_artifacts,
        "relatedCharacters": guide.related_characters,
        "relatedEnemies": guide.related_enemies,
        "tags": guide.tags,
        "coverImageUrl": absolute_media_url(site_url, guide.cover_image_key.as_deref()),
        "readTime": guide.read_time,
    })
}

pub fn story_document(site_url: &str, entry: &LoreEntry) -> Value {
    let gallery: Vec<String> = entry
        .gallery_asset_ids
        .iter()
        .map(|id| id.to_string())
        .collect();
    json!({
        "title": entry.title,
        "slug": entry.slug,
        "summary": entry.summary,
        "body": entry.body,
        "domainId": entry.domain_slug,
        "coverImageUrl": absolute_media_url(site_url, entry.cover_image_key.as_deref()),
        "videoUrl": entry.video_url,
        "galleryAssetIds": gallery,
    })
}

/// Traps carry no slug; the numeric id both keys the document and rides along
/// inside it so the store has a primary-key field.
pub fn trap_document(site_url: &str, trap: &Trap) -> Value {
    json!({
        "id": trap.id,
        "title": trap.title,
        "slug": "",
        "domainId": trap.domain_slug,
        "description": trap.description,
        "imageUrl": absolute_media_url(site_url, trap.image_key.as_deref()),
        "gifUrl": absolute_media_url(site_url, trap.gif_key.as_deref()),
    })
}

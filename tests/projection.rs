//! Projection Tests
//!
//! Pure checks on the documents the sync layer writes to the external store:
//! field names, media-URL absolutization, external-key fallbacks, and
//! byte-for-byte determinism. No database required.

use time::OffsetDateTime;

use nexo::app::projection::{
    absolute_media_url, asset_document, character_document, domain_document, emblem_document,
    enemy_document, guide_document, story_document, trap_document,
};
use nexo::domain::codex::{
    Artifact, Asset, AssetKind, Character, Collection, Domain, Enemy, Guide, LoreEntry, Rarity,
    Trap,
};

const SITE: &str = "https://nexo.example";

fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn sample_domain() -> Domain {
    Domain {
        id: 1,
        name: "Dominio del Tiempo".into(),
        slug: "tiempo".into(),
        short_description: "Relojes rotos".into(),
        cover_image_key: Some("codex/domains/tiempo/cover.png".into()),
        banner_image_key: None,
        color: "#8ff".into(),
        icon: "fa-solid fa-hourglass-half".into(),
        video_url: "https://videos.example/tiempo.mp4".into(),
        sort_order: 2,
    }
}

// ===========================================================================
// Media URLs
// ===========================================================================

#[test]
fn media_url_prefixes_relative_keys() {
    assert_eq!(
        absolute_media_url(SITE, Some("codex/x/a.png")),
        "https://nexo.example/media/codex/x/a.png"
    );
}

#[test]
fn media_url_passes_absolute_through() {
    assert_eq!(
        absolute_media_url(SITE, Some("https://cdn.example/a.png")),
        "https://cdn.example/a.png"
    );
    assert_eq!(
        absolute_media_url(SITE, Some("http://cdn.example/a.png")),
        "http://cdn.example/a.png"
    );
}

#[test]
fn media_url_empty_when_missing() {
    assert_eq!(absolute_media_url(SITE, None), "");
    assert_eq!(absolute_media_url(SITE, Some("")), "");
}

// ===========================================================================
// Document shapes
// ===========================================================================

#[test]
fn domain_document_shape() {
    let doc = domain_document(SITE, &sample_domain());
    assert_eq!(doc["name"], "Dominio del Tiempo");
    assert_eq!(doc["slug"], "tiempo");
    assert_eq!(doc["shortDescription"], "Relojes rotos");
    assert_eq!(
        doc["coverImageUrl"],
        "https://nexo.example/media/codex/domains/tiempo/cover.png"
    );
    assert_eq!(doc["bannerImageUrl"], "");
    assert_eq!(doc["videoUrl"], "https://videos.example/tiempo.mp4");
    assert_eq!(doc["order"], 2);
}

#[test]
fn emblem_document_uses_domain_slug() {
    let artifact = Artifact {
        id: 7,
        name: "Reloj de Arena".into(),
        slug: "reloj-de-arena".into(),
        domain_id: Some(1),
        domain_slug: Some("tiempo".into()),
        quote: "El eco persiste".into(),
        rarity: Rarity::Epico,
        bearer: "Nadie".into(),
        epoch: "Primera Era".into(),
        description: "desc".into(),
        usage: "uso".into(),
        image_key: None,
        gif_key: None,
        video_url: String::new(),
        created_at: epoch(),
    };
    let doc = emblem_document(SITE, &artifact);
    assert_eq!(doc["domainId"], "tiempo");
    assert_eq!(doc["rarity"], "epico");
    assert_eq!(doc["usage"], "uso");
    // The bearer column stays internal; it is not part of the projection
    assert!(doc.get("bearer").is_none());
}

#[test]
fn emblem_document_null_domain() {
    let artifact = Artifact {
        id: 8,
        name: "Huérfano".into(),
        slug: "huerfano".into(),
        domain_id: None,
        domain_slug: None,
        quote: String::new(),
        rarity: Rarity::Raro,
        bearer: String::new(),
        epoch: String::new(),
        description: String::new(),
        usage: String::new(),
        image_key: None,
        gif_key: None,
        video_url: String::new(),
        created_at: epoch(),
    };
    let doc = emblem_document(SITE, &artifact);
    assert!(doc["domainId"].is_null());
}

#[test]
fn character_document_shape() {
    let character = Character {
        id: 3,
        name: "Eira".into(),
        slug: "eira".into(),
        role: "exploradora".into(),
        domain_id: Some(1),
        domain_slug: Some("niebla".into()),
        description: "desc".into(),
        playable: true,
        sprite_still_key: Some("codex/characters/eira/still.png".into()),
        sprite_gif_key: Some("codex/characters/eira/run.gif".into()),
        image_full_key: None,
        video_url: String::new(),
        created_at: epoch(),
    };
    let doc = character_document(SITE, &character);
    assert_eq!(doc["playable"], true);
    assert_eq!(
        doc["imageUrl"],
        "https://nexo.example/media/codex/characters/eira/still.png"
    );
    assert_eq!(
        doc["gifUrl"],
        "https://nexo.example/media/codex/characters/eira/run.gif"
    );
}

#[test]
fn enemy_document_shape() {
    let enemy = Enemy {
        id: 4,
        name: "Sombra".into(),
        slug: "sombra".into(),
        domain_id: None,
        domain_slug: None,
        description: String::new(),
        behavior: "acecha".into(),
        sprite_still_key: None,
        sprite_gif_key: None,
        image_full_key: Some("https://cdn.example/sombra.png".into()),
        video_url: String::new(),
        created_at: epoch(),
    };
    let doc = enemy_document(SITE, &enemy);
    assert_eq!(doc["behavior"], "acecha");
    assert_eq!(doc["spriteStillUrl"], "");
    assert_eq!(doc["imageFullUrl"], "https://cdn.example/sombra.png");
}

#[test]
fn guide_document_projects_related_slugs() {
    let guide = Guide {
        id: 5,
        title: "Guía de movilidad".into(),
        slug: "guia-movilidad".into(),
        summary: String::new(),
        body: "body".into(),
        domain_id: Some(1),
        domain_slug: Some("vientos".into()),
        related_artifacts: vec!["reloj-de-arena".into()],
        related_characters: vec!["eira".into(), "bran".into()],
        related_enemies: vec![],
        tags: "movilidad,combate".into(),
        cover_image_key: None,
        read_time: 6,
        created_at: epoch(),
        updated_at: epoch(),
    };
    let doc = guide_document(SITE, &guide);
    assert_eq!(doc["relatedArtifacts"][0], "reloj-de-arena");
    assert_eq!(doc["relatedCharacters"].as_array().unwrap().len(), 2);
    assert_eq!(doc["relatedEnemies"].as_array().unwrap().len(), 0);
    assert_eq!(doc["readTime"], 6);
}

#[test]
fn story_document_gallery_ids_are_strings() {
    let entry = LoreEntry {
        id: 6,
        title: "El primer eco".into(),
        slug: "el-primer-eco".into(),
        summary: String::new(),
        body: "body".into(),
        domain_id: None,
        domain_slug: None,
        cover_image_key: None,
        video_url: String::new(),
        gallery_asset_ids: vec![10, 11],
        created_at: epoch(),
    };
    let doc = story_document(SITE, &entry);
    assert_eq!(doc["galleryAssetIds"][0], "10");
    assert_eq!(doc["galleryAssetIds"][1], "11");
}

#[test]
fn asset_document_keyed_by_numeric_id() {
    let asset = Asset {
        id: 10,
        file_key: "codex/assets/image/a.png".into(),
        kind: AssetKind::Image,
        caption: "caption".into(),
    };
    let doc = asset_document(SITE, &asset);
    assert_eq!(doc["id"], 10);
    assert_eq!(doc["kind"], "image");
    assert_eq!(
        doc["fileUrl"],
        "https://nexo.example/media/codex/assets/image/a.png"
    );
}

#[test]
fn trap_document_falls_back_to_numeric_id() {
    let trap = Trap {
        id: 12,
        domain_id: 1,
        domain_slug: "cenizas".into(),
        title: "Suelo falso".into(),
        description: String::new(),
        image_key: None,
        gif_key: None,
    };
    let doc = trap_document(SITE, &trap);
    assert_eq!(doc["id"], 12);
    assert_eq!(doc["slug"], "");
    assert_eq!(doc["domainId"], "cenizas");
}

// ===========================================================================
// Collections & determinism
// ===========================================================================

#[test]
fn collection_primary_keys() {
    assert_eq!(Collection::Domains.primary_key(), "slug");
    assert_eq!(Collection::Guides.primary_key(), "slug");
    assert_eq!(Collection::Assets.primary_key(), "id");
    assert_eq!(Collection::Traps.primary_key(), "id");
    assert_eq!(Collection::Stories.name(), "stories");
    assert_eq!(Collection::Emblems.name(), "emblems");
}

#[test]
fn projection_is_deterministic() {
    let domain = sample_domain();
    let first = serde_json::to_string(&domain_document(SITE, &domain)).unwrap();
    let second = serde_json::to_string(&domain_document(SITE, &domain)).unwrap();
    assert_eq!(first, second);
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub gamer_tag: String,
    pub bio: String,
    pub country: String,
    pub city: String,
    pub favorite_domain: String,
    pub avatar_key: Option<String>,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Profile shape exposed on public endpoints (no email).
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub gamer_tag: String,
    pub bio: String,
    pub country: String,
    pub city: String,
    pub favorite_domain: String,
    pub avatar_key: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            gamer_tag: user.gamer_tag,
            bio: user.bio,
            country: user.country,
            city: user.city,
            favorite_domain: user.favorite_domain,
            avatar_key: user.avatar_key,
            created_at: user.created_at,
        }
    }
}

pub const FAVORITE_DOMAINS: [&str; 5] = ["tiempo", "niebla", "cenizas", "vientos", "piedra"];

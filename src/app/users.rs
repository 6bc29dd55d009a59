use anyhow::Result;
use sqlx::Row;

use crate::app::auth::{user_from_row, USER_COLUMNS};
use crate::domain::user::{User, FAVORITE_DOMAINS};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        &self,
        user_id: i64,
        display_name: Option<String>,
        gamer_tag: Option<String>,
        bio: Option<String>,
        country: Option<String>,
        city: Option<String>,
        favorite_domain: Option<String>,
        avatar_key: Option<String>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users \
             SET display_name = COALESCE($2, display_name), \
                 gamer_tag = COALESCE($3, gamer_tag), \
                 bio = COALESCE($4, bio), \
                 country = COALESCE($5, country), \
                 city = COALESCE($6, city), \
                 favorite_domain = COALESCE($7, favorite_domain), \
                 avatar_key = COALESCE($8, avatar_key) \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(display_name)
        .bind(gamer_tag)
        .bind(bio)
        .bind(country)
        .bind(city)
        .bind(favorite_domain)
        .bind(avatar_key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

pub fn valid_favorite_domain(value: &str) -> bool {
    value.is_empty() || FAVORITE_DOMAINS.contains(&value)
}

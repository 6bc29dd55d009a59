pub mod auth;
pub mod codex;
pub mod forums;
pub mod moderation;
pub mod news;
pub mod notifications;
pub mod posts;
pub mod projection;
pub mod reactions;
pub mod slug;
pub mod users;

pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use crate::infra::{db::Db, docstore::DocumentStore, identity::IdentityClient, queue::QueueClient};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub queue: QueueClient,
    pub docstore: DocumentStore,
    pub identity: IdentityClient,
    pub site_url: String,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
}

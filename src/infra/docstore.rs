use anyhow::{anyhow, Result};
use meilisearch_sdk::client::Client;
use serde_json::Value;

use crate::config::AppConfig;
use crate::domain::codex::Collection;

/// Handle to the external document store mirroring the codex. One index per
/// collection, documents keyed by the entity's external key. The store is a
/// derived read-side mirror; callers must treat every write as best-effort.
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
}

impl DocumentStore {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::new(&config.docstore_url, config.docstore_api_key.as_deref())
            .map_err(|err| anyhow!("invalid document store config: {}", err))?;
        Ok(Self { client })
    }

    /// Total-overwrite upsert: the document replaces whatever is stored under
    /// the same key. `document` must contain the collection's primary-key
    /// field (`slug`, or `id` for assets and traps).
    pub async fn upsert(&self, collection: Collection, document: &Value) -> Result<()> {
        let task = self
            .client
            .index(collection.name())
            .add_or_replace(&[document.clone()], Some(collection.primary_key()))
            .await?
            .wait_for_completion(&self.client, None, None)
            .await?;

        if task.is_failure() {
            return Err(anyhow!(
                "document store rejected upsert into {}",
                collection.name()
            ));
        }
        Ok(())
    }

    pub async fn delete(&self, collection: Collection, doc_id: &str) -> Result<()> {
        let task = self
            .client
            .index(collection.name())
            .delete_document(doc_id)
            .await?
            .wait_for_completion(&self.client, None, None)
            .await?;

        if task.is_failure() {
            return Err(anyhow!(
                "document store rejected delete from {}",
                collection.name()
            ));
        }
        Ok(())
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::codex::CodexService;
use crate::domain::codex::Collection;
use crate::infra::docstore::DocumentStore;
use crate::infra::queue::QueueClient;

/// One unit of document-store synchronization. Upserts carry the record id
/// and recompute the whole document at processing time; deletes carry the
/// document id resolved before the row disappeared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub collection: Collection,
    pub op: SyncOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Upsert { record_id: i64 },
    Delete { doc_id: String },
}

const POLL_WAIT_SECONDS: i32 = 10;
const IDLE_SLEEP_MS: u64 = 200;
const ERROR_BACKOFF_MS: u64 = 1000;

enum ProcessingOutcome {
    Completed,
    RetryLater,
}

pub async fn run(
    codex: CodexService,
    docstore: DocumentStore,
    queue: QueueClient,
    site_url: String,
) -> Result<()> {
    info!("codex sync worker started");
    loop {
        match queue.receive_sync_job(POLL_WAIT_SECONDS).await {
            Ok(Some(message)) => {
                let outcome = match process_job(&codex, &docstore, &site_url, &message.job).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!(
                            error = ?err,
                            collection = %message.job.collection,
                            "failed to process codex sync job"
                        );
                        ProcessingOutcome::RetryLater
                    }
                };

                if matches!(outcome, ProcessingOutcome::Completed) {
                    if let Err(err) = queue.delete_message(&message.receipt_handle).await {
                        warn!(error = ?err, "failed to delete queue message");
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Err(err) => {
                warn!(error = ?err, "queue receive failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

async fn process_job(
    codex: &CodexService,
    docstore: &DocumentStore,
    site_url: &str,
    job: &SyncJob,
) -> Result<ProcessingOutcome> {
    match &job.op {
        SyncOp::Upsert { record_id } => {
            let document = codex
                .build_document(job.collection, *record_id, site_url)
                .await?;
            match document {
                Some(document) => {
                    docstore.upsert(job.collection, &document).await?;
                }
                None => {
                    // Row already gone; the delete job handles the document.
                    info!(
                        collection = %job.collection,
                        record_id,
                        "skipping upsert for vanished row"
                    );
                }
            }
        }
        SyncOp::Delete { doc_id } => {
            docstore.delete(job.collection, doc_id).await?;
        }
    }
    Ok(ProcessingOutcome::Completed)
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The four content variants the moderation workflow applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
    Thread,
    Reply,
}

impl ContentKind {
    /// Tag stored in the moderation log.
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Thread => "thread",
            Self::Reply => "reply",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
            Self::Thread => "threads",
            Self::Reply => "thread_replies",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationLogEntry {
    pub id: i64,
    pub content_type: String,
    pub object_id: i64,
    pub removed_by: Option<i64>,
    pub owner_id: Option<i64>,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Result of a removal request. Exactly one branch of the workflow produces
/// each variant; `parent` carries the slug of the context the caller returns
/// to (the post for comments, the forum for threads).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Moderated { parent: Option<String> },
    SelfRemoved { parent: Option<String> },
    AlreadyRemoved,
    NotFound,
    Forbidden,
    ReasonRequired,
}

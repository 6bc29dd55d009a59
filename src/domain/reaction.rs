use serde::{Deserialize, Serialize};

/// Closed set of reactions; anything else is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Fire,
    Gg,
}

impl ReactionKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "fire" => Some(Self::Fire),
            "gg" => Some(Self::Gg),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Fire => "fire",
            Self::Gg => "gg",
        }
    }
}

/// What a toggle did to the (target, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionChange {
    Added,
    Removed,
    Updated,
}

impl ReactionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Updated => "updated",
        }
    }
}

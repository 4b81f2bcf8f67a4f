use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::TrackedShow,
};

/// Current on-disk format of a user's tracked library
pub const LIBRARY_FORMAT_VERSION: u32 = 1;

/// Durable store of tracked-show lists, keyed by user id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistedLibrary: Send + Sync {
    /// Returns `None` when the user has no stored record
    async fn load(&self, user_id: &str) -> AppResult<Option<Vec<TrackedShow>>>;

    /// Replaces the user's stored list
    async fn save(&self, user_id: &str, shows: &[TrackedShow]) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Versioned envelope around the tracked list
///
/// This is the only encode/decode path for persisted libraries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryDocument {
    pub version: u32,
    pub shows: Vec<TrackedShow>,
}

impl LibraryDocument {
    pub fn new(shows: Vec<TrackedShow>) -> Self {
        Self {
            version: LIBRARY_FORMAT_VERSION,
            shows,
        }
    }

    pub fn encode(shows: &[TrackedShow]) -> AppResult<String> {
        Ok(serde_json::to_string(&LibraryDocument::new(shows.to_vec()))?)
    }

    pub fn decode(json: &str) -> AppResult<Vec<TrackedShow>> {
        let document: LibraryDocument = serde_json::from_str(json)?;
        if document.version != LIBRARY_FORMAT_VERSION {
            return Err(AppError::Serialization(format!(
                "Unsupported library format version {}",
                document.version
            )));
        }
        Ok(document.shows)
    }
}

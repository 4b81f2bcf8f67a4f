use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{db::PersistedLibrary, error::AppResult, models::TrackedShow};

/// Process-local library, used when no database is configured
#[derive(Default)]
pub struct InMemoryLibrary {
    libraries: RwLock<HashMap<String, Vec<TrackedShow>>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersistedLibrary for InMemoryLibrary {
    async fn load(&self, user_id: &str) -> AppResult<Option<Vec<TrackedShow>>> {
        Ok(self.libraries.read().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, shows: &[TrackedShow]) -> AppResult<()> {
        self.libraries
            .write()
            .await
            .insert(user_id.to_string(), shows.to_vec());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

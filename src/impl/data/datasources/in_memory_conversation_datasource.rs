use std::collections::HashMap;

use async_trait::async_trait;
use fractic_server_error::ServerError;
use tokio::sync::Mutex;

use crate::{
    entities::{ConversationStateService, StoredConversation},
    errors::ConversationVersionConflict,
};

/// Process-local conversation store. Suitable for tests and single-instance
/// deployments; every upsert is a compare-and-swap on the row version.
#[derive(Debug, Default)]
pub struct InMemoryConversationStateService {
    rows: Mutex<HashMap<String, StoredConversation>>,
}

impl InMemoryConversationStateService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open conversations.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl ConversationStateService for InMemoryConversationStateService {
    async fn load(&self, user_key: &str) -> Result<Option<StoredConversation>, ServerError> {
        Ok(self.rows.lock().await.get(user_key).cloned())
    }

    async fn upsert(
        &self,
        record: StoredConversation,
        expected_version: Option<u64>,
    ) -> Result<(), ServerError> {
        let mut rows = self.rows.lock().await;
        let found = rows.get(&record.user_key).map(|r| r.version);
        if found != expected_version {
            return Err(ConversationVersionConflict::new(
                &record.user_key,
                expected_version,
                found,
            ));
        }
        rows.insert(record.user_key.clone(), record);
        Ok(())
    }

    async fn delete(&self, user_key: &str) -> Result<(), ServerError> {
        self.rows.lock().await.remove(user_key);
        Ok(())
    }
}

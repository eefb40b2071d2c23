use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fractic_server_error::ServerError;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::{
    data::models::conversation_state_model::ConversationStateModel,
    domain::repositories::conversation_repository::{
        ConversationRepository, VersionedConversation,
    },
    entities::{ConversationState, ConversationStateService, StoredConversation},
};

pub(crate) struct ConversationRepositoryImpl<S: ConversationStateService> {
    service: S,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: ConversationStateService> ConversationRepositoryImpl<S> {
    pub(crate) fn new(service: S) -> Self {
        Self {
            service,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S: ConversationStateService> ConversationRepository for ConversationRepositoryImpl<S> {
    async fn lock(&self, user_key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            // Entries only referenced by the map belong to idle users.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user_key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn load(&self, user_key: &str) -> Result<Option<VersionedConversation>, ServerError> {
        let Some(stored) = self.service.load(user_key).await? else {
            return Ok(None);
        };
        match ConversationStateModel::from_blob(user_key, &stored.blob) {
            Ok(model) => Ok(Some(VersionedConversation {
                state: model.into(),
                version: stored.version,
            })),
            Err(e) => {
                warn!(user_key = %user_key, error = ?e, "dropping undecodable conversation");
                self.service.delete(user_key).await?;
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        state: &ConversationState,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(), ServerError> {
        let record = StoredConversation {
            user_key: state.user_key.clone(),
            blob: ConversationStateModel(state.clone()).to_blob()?,
            version: expected_version.map_or(1, |v| v + 1),
            updated_at: now,
        };
        self.service.upsert(record, expected_version).await
    }

    async fn clear(&self, user_key: &str) -> Result<(), ServerError> {
        self.service.delete(user_key).await
    }
}

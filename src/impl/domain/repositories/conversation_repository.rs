use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fractic_server_error::ServerError;
use tokio::sync::OwnedMutexGuard;

use crate::entities::ConversationState;

pub(crate) struct VersionedConversation {
    pub state: ConversationState,
    pub version: u64,
}

#[async_trait]
pub(crate) trait ConversationRepository: Send + Sync {
    /// Serializes turns of the same user. Hold the guard for the whole turn.
    async fn lock(&self, user_key: &str) -> OwnedMutexGuard<()>;

    async fn load(&self, user_key: &str) -> Result<Option<VersionedConversation>, ServerError>;

    /// Write-through; fails if the stored version is not `expected_version`.
    async fn save(
        &self,
        state: &ConversationState,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(), ServerError>;

    async fn clear(&self, user_key: &str) -> Result<(), ServerError>;
}

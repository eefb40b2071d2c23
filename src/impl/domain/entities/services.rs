use async_trait::async_trait;
use fractic_server_error::ServerError;

use super::{
    conversation_state::StoredConversation, expense::LedgerRecord,
    interpretation::InterpretationRequest, reference_data::ReferenceItem,
};

// Client-implemented collaborators.
// ---

#[async_trait]
pub trait InterpretationService: Send + Sync {
    /// Returns the raw (JSON) answer of the interpretation model.
    async fn interpret(&self, request: &InterpretationRequest) -> Result<String, ServerError>;
}

#[async_trait]
pub trait ReferenceDataService: Send + Sync {
    async fn list_categories(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError>;
    async fn list_cost_centers(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError>;
    async fn list_active_cards(&self, org_id: &str) -> Result<Vec<ReferenceItem>, ServerError>;
}

/// A commit may be repeated with identical records when the conversation could
/// not be cleared afterwards; `LedgerRecord::conversation_id` identifies it.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn commit_expense(&self, record: LedgerRecord) -> Result<(), ServerError>;

    /// Must either write the whole series or nothing.
    async fn commit_installment_series(
        &self,
        parent: LedgerRecord,
        children: Vec<LedgerRecord>,
    ) -> Result<(), ServerError>;
}

#[async_trait]
pub trait ConversationStateService: Send + Sync {
    async fn load(&self, user_key: &str) -> Result<Option<StoredConversation>, ServerError>;

    /// Compare-and-swap: `expected_version` is `None` when no row is expected
    /// to exist yet.
    async fn upsert(
        &self,
        record: StoredConversation,
        expected_version: Option<u64>,
    ) -> Result<(), ServerError>;

    async fn delete(&self, user_key: &str) -> Result<(), ServerError>;
}

use fractic_server_error::{CriticalError, ServerError};

use crate::{entities::ConversationState, errors::InvalidConversationBlob};

/// Opaque blob form of a conversation, as persisted by the state service.
#[derive(Debug)]
pub(crate) struct ConversationStateModel(pub ConversationState);
impl ConversationStateModel {
    pub(crate) fn from_blob(user_key: &str, blob: &str) -> Result<Self, ServerError> {
        serde_json::from_str(blob)
            .map(ConversationStateModel)
            .map_err(|e| InvalidConversationBlob::with_debug(user_key, &e))
    }

    pub(crate) fn to_blob(&self) -> Result<String, ServerError> {
        serde_json::to_string(&self.0)
            .map_err(|e| CriticalError::with_debug("failed to encode conversation state", &e))
    }
}

impl From<ConversationStateModel> for ConversationState {
    fn from(model: ConversationStateModel) -> Self {
        model.0
    }
}

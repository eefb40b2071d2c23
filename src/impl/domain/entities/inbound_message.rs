use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Phone number or user id, normalized into the conversation key.
    pub user_id: String,
    pub user_name: String,
    pub org_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        org_id: impl Into<String>,
        text: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            org_id: org_id.into(),
            text: text.into(),
            received_at,
        }
    }
}

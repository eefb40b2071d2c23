use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    expense_field::{ExpenseField, WaitingFor},
    payment_method::PaymentMethod,
    reference_data::ReferenceItem,
    responsible::Responsible,
};

/// Slot values that already passed validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedFields {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub category: Option<ReferenceItem>,
    pub payment_method: Option<PaymentMethod>,
    pub responsible: Option<Responsible>,
    pub card: Option<ReferenceItem>,
    pub installments: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// The single open conversation of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Stable across retries; every ledger record of this conversation
    /// carries it so the ledger can drop duplicate commits.
    #[serde(default = "Uuid::new_v4")]
    pub conversation_id: Uuid,
    pub user_key: String,
    pub org_id: String,
    pub collected: CollectedFields,
    /// Required fields still to be asked, in asking order.
    pub missing_fields: Vec<ExpenseField>,
    pub waiting_for: Option<WaitingFor>,
    /// Most-recent-last.
    pub history: VecDeque<Turn>,
    /// Confidence reported by the latest successful interpretation.
    pub confidence: f64,
    pub started_at: DateTime<Utc>,
}

/// Persisted row: the state serialized as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConversation {
    pub user_key: String,
    pub blob: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

// --

impl ConversationState {
    pub fn new(
        user_key: impl Into<String>,
        org_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            conversation_id: Uuid::new_v4(),
            user_key: user_key.into(),
            org_id: org_id.into(),
            collected: CollectedFields::default(),
            missing_fields: Vec::new(),
            waiting_for: None,
            history: VecDeque::new(),
            confidence: 0.0,
            started_at,
        }
    }

    pub fn push_turn(&mut self, role: TurnRole, text: impl Into<String>, limit: usize) {
        self.history.push_back(Turn {
            role,
            text: text.into(),
        });
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    /// The field the next reply asks about, if any.
    pub fn pending_field(&self) -> Option<ExpenseField> {
        self.waiting_for
            .map(|w| w.field())
            .or_else(|| self.missing_fields.first().copied())
    }

    pub fn is_complete(&self) -> bool {
        self.waiting_for.is_none() && self.missing_fields.is_empty()
    }
}

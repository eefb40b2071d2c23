use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use super::{payment_method::PaymentMethod, reference_data::ReferenceItem, responsible::Responsible};

/// Fully validated expense, built once per conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedExpense {
    pub amount: Decimal,
    pub description: String,
    pub category: Option<ReferenceItem>,
    pub payment_method: PaymentMethod,
    pub responsible: Responsible,
    pub card: Option<ReferenceItem>,
    pub installments: Option<u32>,
    pub date: NaiveDate,
}

/// One row written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub org_id: String,
    pub user_key: String,
    /// Amount of this record (the installment value for series members).
    pub amount: Decimal,
    pub total_amount: Decimal,
    pub description: String,
    pub category_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub cost_center_id: Option<String>,
    pub shared: bool,
    pub card_id: Option<String>,
    pub installment_number: u32,
    pub installment_count: u32,
    /// Id of the conversation that produced the record. Identical on a
    /// retried commit, so it doubles as an idempotency key.
    pub conversation_id: Uuid,
    /// Shared by the parent and children of an installment series.
    pub correlation_id: Option<Uuid>,
    pub date: NaiveDate,
    pub settled: bool,
}

use rust_decimal::Decimal;
use serde_derive::Serialize;

use super::{conversation_state::Turn, expense_field::ExpenseField};

/// Candidate slot values proposed by the interpretation service. Nothing in
/// here has been validated yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpretedFields {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub responsible: Option<String>,
    pub card: Option<String>,
    pub installments: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    pub fields: InterpretedFields,
    pub confidence: f64,
    /// The message is not about an expense.
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceContext {
    pub categories: Vec<String>,
    pub cost_centers: Vec<String>,
    pub cards: Vec<String>,
    pub current_user_name: String,
}

/// Everything the interpretation service receives for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpretationRequest {
    pub message: String,
    pub prior_turns: Vec<Turn>,
    pub taxonomy: Vec<FieldSpec>,
    pub reference_context: ReferenceContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_field: Option<ExpenseField>,
}

// --

impl InterpretedFields {
    /// Raw textual candidate for a field, used when validating direct answers.
    pub fn text_for(&self, field: ExpenseField) -> Option<String> {
        match field {
            ExpenseField::Amount => self.amount.map(|a| a.to_string()),
            ExpenseField::Description => self.description.clone(),
            ExpenseField::Category => self.category.clone(),
            ExpenseField::PaymentMethod => self.payment_method.clone(),
            ExpenseField::Responsible => self.responsible.clone(),
            ExpenseField::Card => self.card.clone(),
            ExpenseField::Installments => self.installments.map(|n| n.to_string()),
        }
    }
}

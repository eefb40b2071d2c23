use serde_derive::{Deserialize, Serialize};

/// A single slot of the expense being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseField {
    Amount,
    Description,
    Category,
    PaymentMethod,
    Responsible,
    Card,
    Installments,
}

/// Sub-flow that takes priority over the regular missing-field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingFor {
    CardInfo,
    Responsible,
}

// --

impl ExpenseField {
    /// Fields that may end up in `missing_fields`, in the order they are asked.
    pub const REQUIRED_ORDER: [ExpenseField; 5] = [
        ExpenseField::Amount,
        ExpenseField::Description,
        ExpenseField::PaymentMethod,
        ExpenseField::Responsible,
        ExpenseField::Category,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ExpenseField::Amount => "amount",
            ExpenseField::Description => "description",
            ExpenseField::Category => "category",
            ExpenseField::PaymentMethod => "payment_method",
            ExpenseField::Responsible => "responsible",
            ExpenseField::Card => "card",
            ExpenseField::Installments => "installments",
        }
    }
}

impl std::fmt::Display for ExpenseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl WaitingFor {
    pub fn field(&self) -> ExpenseField {
        match self {
            WaitingFor::CardInfo => ExpenseField::Card,
            WaitingFor::Responsible => ExpenseField::Responsible,
        }
    }
}

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Credit,
    Debit,
    Pix,
    Cash,
    BankTransfer,
    Boleto,
    Other,
}

// --

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::Credit,
        PaymentMethod::Debit,
        PaymentMethod::Pix,
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
        PaymentMethod::Boleto,
        PaymentMethod::Other,
    ];

    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }

    /// Stable identifier used on the wire and in the ledger.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Other => "other",
        }
    }
}

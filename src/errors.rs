use fractic_server_error::{define_client_error, define_internal_error};

use crate::entities::{ExpenseField, PaymentMethod};

// Configuration-related.
define_client_error!(InvalidRon, "Invalid {ron_type} (invalid RON format).", { ron_type: &str });
define_client_error!(InvalidCurrencyCode, "Invalid ISO currency code: {code}.", { code: &str });

// Parsing-related.
define_client_error!(InvalidAmount, "Invalid amount: '{value}'.", { value: &str });
define_internal_error!(
    InvalidInterpretationOutput,
    "Interpretation service returned unparseable output."
);
define_internal_error!(
    InvalidConversationBlob,
    "Stored conversation for '{user_key}' could not be decoded.",
    { user_key: &str }
);

// Conversation-state-related.
define_internal_error!(
    ConversationVersionConflict,
    "Conversation for '{user_key}' was modified concurrently (expected version {expected:?}, found {found:?}).",
    { user_key: &str, expected: Option<u64>, found: Option<u64> }
);

// Reference-data-related.
define_internal_error!(
    ReferenceDataUnavailable,
    "Reference data for organization '{org_id}' could not be loaded.",
    { org_id: &str }
);

// Finalization-related.
define_client_error!(
    IncompleteExpense,
    "Expense cannot be finalized: '{field}' is missing.",
    { field: ExpenseField }
);
define_client_error!(
    CreditExpenseWithoutCard,
    "Credit expense cannot be finalized without a card and installment count."
);
define_client_error!(
    CardOnNonCreditExpense,
    "Card and installments are only allowed for credit expenses (payment method: {payment_method:?}).",
    { payment_method: PaymentMethod }
);
define_client_error!(
    InvalidInstallments,
    "Invalid installment count: {installments}.",
    { installments: u32 }
);
define_client_error!(NonPositiveAmount, "Expense amount must be positive (got {amount}).", { amount: &str });
define_internal_error!(LedgerCommitFailed, "Ledger rejected the expense commit.");

use super::{expense::ResolvedExpense, expense_field::ExpenseField};

/// Outcome of one turn, handed to the transport layer for wording.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueReply {
    /// Request one specific field. `options` lists valid values when the
    /// field is chosen from reference data.
    AskField {
        field: ExpenseField,
        options: Vec<String>,
    },
    /// Re-ask after a no-match or ambiguous answer.
    InvalidAnswer {
        field: ExpenseField,
        options: Vec<String>,
    },
    Rejected,
    Confirmed(ResolvedExpense),
    Cancelled,
    /// Generic retry-safe failure; the pending conversation is preserved.
    Error,
}

// --

impl DialogueReply {
    /// Short form of the reply kept in the conversation history as context
    /// for later interpretation passes.
    pub fn summary(&self) -> String {
        match self {
            DialogueReply::AskField { field, options } if options.is_empty() => {
                format!("asked for {field}")
            }
            DialogueReply::AskField { field, options } => {
                format!("asked for {field} (options: {})", options.join(", "))
            }
            DialogueReply::InvalidAnswer { field, options } if options.is_empty() => {
                format!("could not understand {field}, asked again")
            }
            DialogueReply::InvalidAnswer { field, options } => {
                format!("asked to choose {field} among: {}", options.join(", "))
            }
            DialogueReply::Rejected => "said the message is not an expense".to_string(),
            DialogueReply::Confirmed(expense) => {
                format!("confirmed expense {} {}", expense.amount, expense.description)
            }
            DialogueReply::Cancelled => "cancelled the expense".to_string(),
            DialogueReply::Error => "reported a temporary failure".to_string(),
        }
    }
}

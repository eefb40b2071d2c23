use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::{ExpenseField, Interpretation, OrgReferenceData, Turn};

#[async_trait]
pub(crate) trait InterpretationRepository: Send + Sync {
    /// Best-effort extraction. The result is never trusted as valid.
    async fn interpret(
        &self,
        message: &str,
        prior_turns: &[Turn],
        pending_field: Option<ExpenseField>,
        references: &OrgReferenceData,
        current_user_name: &str,
    ) -> Result<Interpretation, ServerError>;
}

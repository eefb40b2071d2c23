use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::LedgerRecord;

/// What a finalized conversation writes, as one logical commit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LedgerPlan {
    Single(LedgerRecord),
    Series {
        parent: LedgerRecord,
        children: Vec<LedgerRecord>,
    },
}

#[async_trait]
pub(crate) trait LedgerRepository: Send + Sync {
    async fn commit(&self, plan: LedgerPlan) -> Result<(), ServerError>;
}

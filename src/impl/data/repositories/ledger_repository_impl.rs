use async_trait::async_trait;
use fractic_server_error::ServerError;
use tracing::debug;

use crate::{
    domain::repositories::ledger_repository::{LedgerPlan, LedgerRepository},
    entities::LedgerService,
    errors::LedgerCommitFailed,
};

pub(crate) struct LedgerRepositoryImpl<S: LedgerService> {
    service: S,
}

impl<S: LedgerService> LedgerRepositoryImpl<S> {
    pub(crate) fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: LedgerService> LedgerRepository for LedgerRepositoryImpl<S> {
    async fn commit(&self, plan: LedgerPlan) -> Result<(), ServerError> {
        let result = match plan {
            LedgerPlan::Single(record) => {
                debug!(conversation_id = %record.conversation_id, "committing expense");
                self.service.commit_expense(record).await
            }
            LedgerPlan::Series { parent, children } => {
                debug!(
                    conversation_id = %parent.conversation_id,
                    children = children.len(),
                    "committing installment series"
                );
                self.service
                    .commit_installment_series(parent, children)
                    .await
            }
        };
        result.map_err(|e| LedgerCommitFailed::with_debug(&e))
    }
}

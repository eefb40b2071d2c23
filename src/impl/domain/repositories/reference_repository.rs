use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::OrgReferenceData;

#[async_trait]
pub(crate) trait ReferenceRepository: Send + Sync {
    async fn load(&self, org_id: &str) -> Result<OrgReferenceData, ServerError>;
}

use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    domain::repositories::reference_repository::ReferenceRepository,
    entities::{OrgReferenceData, ReferenceDataService},
    errors::ReferenceDataUnavailable,
};

pub(crate) struct ReferenceRepositoryImpl<S: ReferenceDataService> {
    service: S,
}

impl<S: ReferenceDataService> ReferenceRepositoryImpl<S> {
    pub(crate) fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: ReferenceDataService> ReferenceRepository for ReferenceRepositoryImpl<S> {
    async fn load(&self, org_id: &str) -> Result<OrgReferenceData, ServerError> {
        let (categories, cost_centers, cards) = futures::try_join!(
            self.service.list_categories(org_id),
            self.service.list_cost_centers(org_id),
            self.service.list_active_cards(org_id),
        )
        .map_err(|e| ReferenceDataUnavailable::with_debug(org_id, &e))?;
        Ok(OrgReferenceData {
            categories,
            cost_centers,
            cards,
        })
    }
}

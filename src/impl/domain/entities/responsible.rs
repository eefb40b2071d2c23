use serde_derive::{Deserialize, Serialize};

use super::reference_data::ReferenceItem;

/// Party an expense is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Responsible {
    /// One cost center of the organization.
    Specific(ReferenceItem),
    /// Split between all parties; never a member of the cost-center list.
    Shared,
}

// --

impl Responsible {
    pub fn cost_center_id(&self) -> Option<&str> {
        match self {
            Responsible::Specific(item) => Some(&item.id),
            Responsible::Shared => None,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Responsible::Shared)
    }
}

use serde_derive::{Deserialize, Serialize};

/// Externally owned reference entity (category, cost center or card).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: String,
    pub name: String,
}

/// Reference lists of one organization, read once per turn.
#[derive(Debug, Clone, Default)]
pub struct OrgReferenceData {
    pub categories: Vec<ReferenceItem>,
    pub cost_centers: Vec<ReferenceItem>,
    pub cards: Vec<ReferenceItem>,
}

// --

impl ReferenceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl OrgReferenceData {
    pub fn category_names(&self) -> Vec<String> {
        names(&self.categories)
    }

    pub fn cost_center_names(&self) -> Vec<String> {
        names(&self.cost_centers)
    }

    pub fn card_names(&self) -> Vec<String> {
        names(&self.cards)
    }
}

fn names(items: &[ReferenceItem]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
}

use crate::entities::{ReferenceItem, Responsible};

use super::{
    normalizer::{canonicalize, resolve_self_reference},
    synonyms::{is_one_of, CategoryKeywordTable, SHARED_MARKERS},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T = ReferenceItem> {
    NoMatch,
    Unique(T),
    /// Two or more plausible items; the user has to pick one.
    Ambiguous(Vec<ReferenceItem>),
}

/// Matches a free-text candidate against one reference list. Strategies are
/// tried in order and the first one producing any candidate decides.
pub(crate) struct ReferenceResolver<'a> {
    items: &'a [ReferenceItem],
}

impl<'a> ReferenceResolver<'a> {
    pub(crate) fn new(items: &'a [ReferenceItem]) -> Self {
        Self { items }
    }

    pub(crate) fn resolve(&self, candidate: &str) -> Resolution {
        let candidate = canonicalize(candidate);
        if candidate.is_empty() {
            return Resolution::NoMatch;
        }
        self.exact(&candidate)
            .or_else(|| self.substring(&candidate))
            .or_else(|| self.first_token(&candidate))
            .unwrap_or(Resolution::NoMatch)
    }

    fn exact(&self, candidate: &str) -> Option<Resolution> {
        self.collect(|name| name == candidate)
    }

    fn substring(&self, candidate: &str) -> Option<Resolution> {
        self.collect(|name| candidate.contains(name) || name.contains(candidate))
    }

    fn first_token(&self, candidate: &str) -> Option<Resolution> {
        let first = candidate.split(' ').next()?;
        self.collect(|name| name.split(' ').next() == Some(first))
    }

    fn collect(&self, predicate: impl Fn(&str) -> bool) -> Option<Resolution> {
        let mut matched: Vec<ReferenceItem> = Vec::new();
        for item in self.items {
            let name = canonicalize(&item.name);
            if !name.is_empty() && predicate(&name) && !matched.iter().any(|m| m.id == item.id) {
                matched.push(item.clone());
            }
        }
        match matched.len() {
            0 => None,
            1 => matched.pop().map(Resolution::Unique),
            _ => Some(Resolution::Ambiguous(matched)),
        }
    }
}

// Category.
// ---

/// Generic strategies, then the keyword table. Never falls back to the
/// default category; that only happens at write time.
pub(crate) fn resolve_category(
    candidate: &str,
    categories: &[ReferenceItem],
    keywords: &CategoryKeywordTable,
) -> Resolution {
    match ReferenceResolver::new(categories).resolve(candidate) {
        Resolution::NoMatch => infer_category(candidate, categories, keywords)
            .map(Resolution::Unique)
            .unwrap_or(Resolution::NoMatch),
        resolved => resolved,
    }
}

/// Keyword inference from arbitrary text (usually the description). The
/// first rule whose category exists in the organization wins.
pub(crate) fn infer_category(
    text: &str,
    categories: &[ReferenceItem],
    keywords: &CategoryKeywordTable,
) -> Option<ReferenceItem> {
    let canonical = canonicalize(text);
    keywords.matches(&canonical).find_map(|name| {
        match ReferenceResolver::new(categories).resolve(name) {
            Resolution::Unique(item) => Some(item),
            _ => None,
        }
    })
}

/// The organization's configured default category, if it exists.
pub(crate) fn default_category(
    categories: &[ReferenceItem],
    default_name: Option<&str>,
) -> Option<ReferenceItem> {
    let default_name = canonicalize(default_name?);
    categories
        .iter()
        .find(|c| canonicalize(&c.name) == default_name)
        .cloned()
}

// Responsible.
// ---

/// The shared marker short-circuits everything; first-person references are
/// replaced by the current user before matching. Cost centers that are
/// themselves the shared pseudo-entity are never returned as specific.
pub(crate) fn resolve_responsible(
    candidate: &str,
    current_user_name: &str,
    cost_centers: &[ReferenceItem],
) -> Resolution<Responsible> {
    if is_one_of(candidate, SHARED_MARKERS) {
        return Resolution::Unique(Responsible::Shared);
    }
    let candidate = resolve_self_reference(candidate, current_user_name);
    let specific: Vec<ReferenceItem> = cost_centers
        .iter()
        .filter(|c| !is_one_of(&c.name, SHARED_MARKERS))
        .cloned()
        .collect();
    match ReferenceResolver::new(&specific).resolve(&candidate) {
        Resolution::NoMatch => Resolution::NoMatch,
        Resolution::Unique(item) => Resolution::Unique(Responsible::Specific(item)),
        Resolution::Ambiguous(items) => Resolution::Ambiguous(items),
    }
}

use std::collections::HashMap;
use tracing::debug;

use crate::rewards::types::ClaimableItem;

/// An item can be claimed if it has an id, carries a reward and
/// has not been claimed yet.
pub fn is_eligible(item: &ClaimableItem) -> bool {
    !item.id.is_empty() && item.has_reward && !item.claimed
}

/// Items from several sources keyed by id. The first source to report an
/// id owns it; later duplicates are ignored.
#[derive(Debug, Default)]
pub struct MergedSet {
    items: HashMap<String, ClaimableItem>,
    order: Vec<String>,
}

impl MergedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge per-source lists, given in source priority order
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Vec<ClaimableItem>>,
    {
        let mut merged = Self::new();
        for items in sources {
            for item in items {
                merged.insert(item);
            }
        }
        merged
    }

    /// Returns false when the item was dropped (no id, or id already present)
    pub fn insert(&mut self, item: ClaimableItem) -> bool {
        if item.id.is_empty() || self.items.contains_key(&item.id) {
            debug!(id = %item.id, "Skipping duplicate or anonymous item");
            return false;
        }
        self.order.push(item.id.clone());
        self.items.insert(item.id.clone(), item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ClaimableItem> {
        self.items.get(id)
    }

    /// Eligible items in first-seen order
    pub fn eligible(&self) -> Vec<&ClaimableItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(|item| is_eligible(item))
            .collect()
    }
}

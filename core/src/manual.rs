//! User-typed shopping items that belong to no recipe.

use serde::{Deserialize, Serialize};

use crate::models::ManualItem;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualItems(Vec<ManualItem>);

impl ManualItems {
    /// Append a new item on the need side. Blank names are rejected.
    pub fn add(&mut self, name: &str) -> Option<&ManualItem> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.0.push(ManualItem {
            id: format!("manual-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            have: false,
        });
        self.0.last()
    }

    /// Returns false when no item has this id.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.0.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.have = !item.have;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|item| item.id != id);
        self.0.len() != before
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ManualItem> {
        self.0.iter().find(|item| item.id == id)
    }

    pub fn need(&self) -> impl Iterator<Item = &ManualItem> {
        self.0.iter().filter(|item| !item.have)
    }

    pub fn have(&self) -> impl Iterator<Item = &ManualItem> {
        self.0.iter().filter(|item| item.have)
    }

    #[must_use]
    pub fn items(&self) -> &[ManualItem] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

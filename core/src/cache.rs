//! Recipe detail cache keyed by id.
//!
//! An entry is either in flight or ready. A failed fetch removes the entry so
//! a later prefetch can retry; until then the recipe contributes nothing to
//! the shopping list.

use std::collections::HashMap;

use anyhow::Result;

use crate::models::{Recipe, RecipeId, RecipeSummary};

/// Where full recipes come from: the local catalog or a remote API.
pub trait RecipeSource {
    /// `Ok(None)` when the recipe does not exist.
    fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>>;
    fn get_recipes(&self) -> Result<Vec<RecipeSummary>>;
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Pending,
    Ready(Box<Recipe>),
}

#[derive(Debug, Default)]
pub struct RecipeCache {
    entries: HashMap<RecipeId, CacheEntry>,
}

impl RecipeCache {
    /// Marks `id` as in flight. False when it is already cached or being fetched.
    pub fn begin_fetch(&mut self, id: RecipeId) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, CacheEntry::Pending);
        true
    }

    pub fn complete(&mut self, id: RecipeId, recipe: Recipe) {
        self.entries.insert(id, CacheEntry::Ready(Box::new(recipe)));
    }

    pub fn fail(&mut self, id: RecipeId) {
        self.entries.remove(&id);
    }

    #[must_use]
    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        match self.entries.get(&id) {
            Some(CacheEntry::Ready(recipe)) => Some(recipe.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_pending(&self, id: RecipeId) -> bool {
        matches!(self.entries.get(&id), Some(CacheEntry::Pending))
    }

    /// Drop a cached recipe so the next prefetch sees fresh data.
    pub fn invalidate(&mut self, id: RecipeId) {
        if let Some(CacheEntry::Ready(_)) = self.entries.get(&id) {
            self.entries.remove(&id);
        }
    }

    /// Fetch `id` from `source` unless it is cached or in flight.
    /// Returns whether the recipe is available afterwards.
    pub fn prefetch(&mut self, id: RecipeId, source: &impl RecipeSource) -> bool {
        if !self.begin_fetch(id) {
            return self.get(id).is_some();
        }
        match source.get_recipe(id) {
            Ok(Some(recipe)) => {
                tracing::debug!(recipe_id = id, "Cached recipe");
                self.complete(id, recipe);
                true
            }
            Ok(None) => {
                tracing::warn!(recipe_id = id, "Recipe not found");
                self.fail(id);
                false
            }
            Err(e) => {
                tracing::error!(recipe_id = id, error = %e, "Failed to fetch recipe");
                self.fail(id);
                false
            }
        }
    }
}

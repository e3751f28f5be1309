//! The user's shopping state and the holder that mutates it.
//!
//! `ShoppingState` owns the persisted collections and hands every mutation to
//! an injected [`Persist`] sink along with the key that changed. The sink
//! decides what durability means; the state in memory stays authoritative.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::manual::ManualItems;
use crate::models::{IngredientId, ManualItem, RecipeId};
use crate::storage::StorageKey;

/// Ingredient ids the user has on hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HaveSet(BTreeSet<IngredientId>);

impl HaveSet {
    #[must_use]
    pub fn contains(&self, id: IngredientId) -> bool {
        self.0.contains(&id)
    }

    /// Flip one id. Returns the new state.
    pub fn toggle(&mut self, id: IngredientId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: IngredientId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: IngredientId) -> bool {
        self.0.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = IngredientId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<IngredientId> for HaveSet {
    fn from_iter<I: IntoIterator<Item = IngredientId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Recipes the user intends to make, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RecipeId>", into = "Vec<RecipeId>")]
pub struct CheckedRecipes(Vec<RecipeId>);

impl CheckedRecipes {
    #[must_use]
    pub fn contains(&self, id: RecipeId) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: RecipeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn remove(&mut self, id: RecipeId) -> bool {
        let before = self.0.len();
        self.0.retain(|r| *r != id);
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<RecipeId>> for CheckedRecipes {
    fn from(ids: Vec<RecipeId>) -> Self {
        let mut set = Self::default();
        for id in ids {
            set.insert(id);
        }
        set
    }
}

impl From<CheckedRecipes> for Vec<RecipeId> {
    fn from(set: CheckedRecipes) -> Self {
        set.0
    }
}

impl FromIterator<RecipeId> for CheckedRecipes {
    fn from_iter<I: IntoIterator<Item = RecipeId>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingData {
    pub have: HaveSet,
    pub checked: CheckedRecipes,
    pub recipe_order: Vec<RecipeId>,
    pub manual_items: ManualItems,
}

/// Side effect run after each mutation of a [`ShoppingState`].
pub trait Persist {
    fn persist(&mut self, key: StorageKey, data: &ShoppingData);
}

/// Keeps state in memory only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersist;

impl Persist for NoPersist {
    fn persist(&mut self, _key: StorageKey, _data: &ShoppingData) {}
}

impl<F> Persist for F
where
    F: FnMut(StorageKey, &ShoppingData),
{
    fn persist(&mut self, key: StorageKey, data: &ShoppingData) {
        self(key, data);
    }
}

pub struct ShoppingState<P> {
    data: ShoppingData,
    persistence: P,
}

impl<P: Persist> ShoppingState<P> {
    pub fn new(data: ShoppingData, persistence: P) -> Self {
        Self { data, persistence }
    }

    #[must_use]
    pub fn data(&self) -> &ShoppingData {
        &self.data
    }

    #[must_use]
    pub fn have(&self) -> &HaveSet {
        &self.data.have
    }

    #[must_use]
    pub fn checked(&self) -> &CheckedRecipes {
        &self.data.checked
    }

    #[must_use]
    pub fn manual_items(&self) -> &ManualItems {
        &self.data.manual_items
    }

    fn save(&mut self, key: StorageKey) {
        self.persistence.persist(key, &self.data);
    }

    /// Flip one ingredient between need and have. Returns the new state.
    pub fn toggle_have(&mut self, id: IngredientId) -> bool {
        let now = self.data.have.toggle(id);
        self.save(StorageKey::HaveIngredients);
        now
    }

    /// Flip each id independently, persisting once.
    pub fn toggle_have_all(&mut self, ids: &[IngredientId]) {
        for &id in ids {
            self.data.have.toggle(id);
        }
        self.save(StorageKey::HaveIngredients);
    }

    pub fn set_have(&mut self, ids: &[IngredientId], have: bool) {
        for &id in ids {
            if have {
                self.data.have.insert(id);
            } else {
                self.data.have.remove(id);
            }
        }
        self.save(StorageKey::HaveIngredients);
    }

    pub fn clear_for_recipe(&mut self, ids: &[IngredientId]) {
        self.set_have(ids, false);
    }

    /// Check or uncheck a recipe. Returns whether it is now checked.
    ///
    /// Either way the recipe moves to the boundary between the checked and
    /// unchecked groups of the display order: the bottom of the checked group
    /// when checking, the top of the unchecked group when unchecking.
    pub fn toggle_checked(&mut self, recipe_id: RecipeId) -> bool {
        let now_checked = if self.data.checked.remove(recipe_id) {
            false
        } else {
            self.data.checked.insert(recipe_id);
            true
        };

        let checked = &self.data.checked;
        let order = &mut self.data.recipe_order;
        order.retain(|id| *id != recipe_id);
        let insert_at = order
            .iter()
            .position(|id| !checked.contains(*id))
            .unwrap_or(order.len());
        order.insert(insert_at, recipe_id);

        self.save(StorageKey::RecipeOrder);
        self.save(StorageKey::CheckedRecipes);
        now_checked
    }

    pub fn reorder(&mut self, order: Vec<RecipeId>) {
        self.data.recipe_order = order;
        self.save(StorageKey::RecipeOrder);
    }

    /// Catalog entries in the saved display order, then any the order has not seen.
    pub fn ordered<'a, T>(&self, catalog: &'a [T], id_of: impl Fn(&T) -> RecipeId) -> Vec<&'a T> {
        let mut by_id: HashMap<RecipeId, &'a T> =
            catalog.iter().map(|entry| (id_of(entry), entry)).collect();
        let mut out = Vec::with_capacity(catalog.len());

        for id in &self.data.recipe_order {
            if let Some(entry) = by_id.remove(id) {
                out.push(entry);
            }
        }
        out.extend(
            catalog
                .iter()
                .filter(|entry| by_id.contains_key(&id_of(*entry))),
        );
        out
    }

    pub fn add_manual(&mut self, name: &str) -> Option<ManualItem> {
        let item = self.data.manual_items.add(name).cloned()?;
        self.save(StorageKey::ManualItems);
        Some(item)
    }

    pub fn toggle_manual(&mut self, id: &str) -> bool {
        let found = self.data.manual_items.toggle(id);
        if found {
            self.save(StorageKey::ManualItems);
        }
        found
    }

    pub fn remove_manual(&mut self, id: &str) -> bool {
        let found = self.data.manual_items.remove(id);
        if found {
            self.save(StorageKey::ManualItems);
        }
        found
    }
}

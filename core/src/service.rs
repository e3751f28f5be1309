use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::aggregate::{aggregate, find_item};
use crate::cache::{RecipeCache, RecipeSource};
use crate::format::format_for_shopping;
use crate::models::{
    AggregatedItem, IngredientId, ManualItem, RecipeId, RecipeSummary, ShoppingList,
};
use crate::pantry::{is_specialty, pantry_guesses};
use crate::state::ShoppingState;
use crate::storage::{KeyValueStore, StorageAdapter};

/// One row of the rendered shopping list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedItem {
    Ingredient {
        display: String,
        name: String,
        specialty: bool,
        recipes: Vec<String>,
        /// Every id under this row; a toggle flips all of them.
        ingredient_ids: Vec<IngredientId>,
    },
    Manual {
        display: String,
        id: String,
    },
}

impl RenderedItem {
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Ingredient { display, .. } | Self::Manual { display, .. } => display,
        }
    }

    fn from_aggregated(item: &AggregatedItem) -> Self {
        Self::Ingredient {
            display: format_for_shopping(item),
            name: item.name.clone(),
            specialty: is_specialty(&item.name),
            recipes: item.recipes.clone(),
            ingredient_ids: item.toggle_ids().to_vec(),
        }
    }

    fn from_manual(item: &ManualItem) -> Self {
        Self::Manual {
            display: item.name.clone(),
            id: item.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedList {
    pub need_items: Vec<RenderedItem>,
    pub have_items: Vec<RenderedItem>,
}

impl RenderedList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.need_items.is_empty() && self.have_items.is_empty()
    }
}

/// Application shell: persisted shopping state plus the recipe detail cache.
pub struct ShoppingService<S: KeyValueStore> {
    state: ShoppingState<StorageAdapter<S>>,
    cache: RecipeCache,
}

impl<S: KeyValueStore> ShoppingService<S> {
    pub fn load(store: S) -> Self {
        let adapter = StorageAdapter::new(store);
        let data = adapter.load();
        tracing::debug!(
            checked = data.checked.len(),
            have = data.have.len(),
            manual = data.manual_items.items().len(),
            "Loaded shopping state"
        );
        Self {
            state: ShoppingState::new(data, adapter),
            cache: RecipeCache::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ShoppingState<StorageAdapter<S>> {
        &self.state
    }

    #[must_use]
    pub fn cache(&self) -> &RecipeCache {
        &self.cache
    }

    /// For callers that fetch recipes themselves (the remote catalog).
    pub fn cache_mut(&mut self) -> &mut RecipeCache {
        &mut self.cache
    }

    #[must_use]
    pub fn is_checked(&self, id: RecipeId) -> bool {
        self.state.checked().contains(id)
    }

    /// Fetch every checked recipe not yet cached. Returns how many are available.
    pub fn prefetch_checked(&mut self, source: &impl RecipeSource) -> usize {
        let ids: Vec<RecipeId> = self.state.checked().iter().collect();
        ids.into_iter()
            .filter(|id| self.cache.prefetch(*id, source))
            .count()
    }

    /// Recipes not yet cached are skipped.
    #[must_use]
    pub fn shopping_list(&self) -> ShoppingList {
        let recipes = self
            .state
            .checked()
            .iter()
            .filter_map(|id| self.cache.get(id));
        aggregate(recipes, self.state.have())
    }

    /// Flip the aggregated row named `name`. Returns true when it moved to "have".
    pub fn toggle_item(&mut self, name: &str) -> Result<bool> {
        let list = self.shopping_list();
        let ids = find_item(&list, name)
            .with_context(|| format!("'{}' is not on the shopping list", name.trim()))?
            .toggle_ids()
            .to_vec();
        self.state.toggle_have_all(&ids);
        Ok(ids.first().is_some_and(|id| self.state.have().contains(*id)))
    }

    pub fn toggle_have(&mut self, id: IngredientId) -> bool {
        self.state.toggle_have(id)
    }

    /// Flip the ids that belong to a row of the current list. Ids from no
    /// checked recipe are ignored so the have set never collects orphans.
    /// Returns how many were flipped.
    pub fn toggle_ids(&mut self, ids: &[IngredientId]) -> usize {
        let list = self.shopping_list();
        let known: Vec<IngredientId> = ids
            .iter()
            .copied()
            .filter(|id| {
                list.need_items
                    .iter()
                    .chain(&list.have_items)
                    .any(|item| item.toggle_ids().contains(id))
            })
            .collect();
        if known.len() < ids.len() {
            tracing::debug!(ignored = ids.len() - known.len(), "Ignored ids not on the list");
        }
        self.state.toggle_have_all(&known);
        known.len()
    }

    /// Check or uncheck a recipe, fetching it from `source` when checking an
    /// uncached recipe. Returns whether it is now checked.
    pub fn toggle_recipe(&mut self, id: RecipeId, source: &impl RecipeSource) -> Result<bool> {
        if !self.is_checked(id) && self.cache.get(id).is_none() {
            let recipe = source.get_recipe(id)?.context("Recipe not found")?;
            self.cache.complete(id, recipe);
        }
        self.toggle_cached_recipe(id)
    }

    /// Like [`Self::toggle_recipe`], but checking requires the recipe to be cached.
    ///
    /// Checking seeds the have set with the pantry classifier's guesses.
    /// Unchecking clears the have state of the recipe's ingredients.
    pub fn toggle_cached_recipe(&mut self, id: RecipeId) -> Result<bool> {
        if self.is_checked(id) {
            if let Some(recipe) = self.cache.get(id) {
                let ids: Vec<IngredientId> = recipe.ingredients.iter().map(|i| i.id).collect();
                self.state.clear_for_recipe(&ids);
            }
            self.state.toggle_checked(id);
            tracing::debug!(recipe_id = id, "Unchecked recipe");
            return Ok(false);
        }

        let Some(recipe) = self.cache.get(id) else {
            bail!("Recipe not found");
        };
        let guesses = pantry_guesses(recipe);
        self.state.toggle_checked(id);
        if !guesses.is_empty() {
            self.state.set_have(&guesses, true);
        }
        tracing::debug!(recipe_id = id, pantry_guesses = guesses.len(), "Checked recipe");
        Ok(true)
    }

    /// Drop a recipe from the cache after it was edited or deleted.
    pub fn forget_recipe(&mut self, id: RecipeId) {
        self.cache.invalidate(id);
    }

    pub fn reorder(&mut self, order: Vec<RecipeId>) {
        self.state.reorder(order);
    }

    /// The catalog in the user's display order.
    #[must_use]
    pub fn ordered_catalog(&self, catalog: Vec<RecipeSummary>) -> Vec<RecipeSummary> {
        self.state
            .ordered(&catalog, |r| r.id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn add_manual(&mut self, name: &str) -> Result<ManualItem> {
        self.state
            .add_manual(name)
            .context("Item name is required")
    }

    pub fn toggle_manual(&mut self, id: &str) -> Result<()> {
        if !self.state.toggle_manual(id) {
            bail!("Item '{id}' not found");
        }
        Ok(())
    }

    pub fn remove_manual(&mut self, id: &str) -> Result<()> {
        if !self.state.remove_manual(id) {
            bail!("Item '{id}' not found");
        }
        Ok(())
    }

    /// Need/have sections ready for display, manual items placed by their own flag.
    #[must_use]
    pub fn render(&self) -> RenderedList {
        let list = self.shopping_list();
        let manual = self.state.manual_items();

        let need_items = list
            .need_items
            .iter()
            .map(RenderedItem::from_aggregated)
            .chain(manual.need().map(RenderedItem::from_manual))
            .collect();
        let have_items = list
            .have_items
            .iter()
            .map(RenderedItem::from_aggregated)
            .chain(manual.have().map(RenderedItem::from_manual))
            .collect();

        RenderedList {
            need_items,
            have_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{NewIngredient, NewRecipe};
    use crate::storage::MemoryStore;

    fn ingredient(name: &str, quantity: Option<f64>, unit: Option<&str>) -> NewIngredient {
        NewIngredient {
            name: name.to_string(),
            quantity,
            unit: unit.map(String::from),
            notes: None,
        }
    }

    fn new_recipe(title: &str, ingredients: Vec<NewIngredient>) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            ingredients,
            directions: vec!["Cook it.".to_string()],
            ..NewRecipe::default()
        }
    }

    fn seeded_db() -> (Database, RecipeId, RecipeId) {
        let db = Database::open_in_memory().unwrap();
        let pasta = db
            .create_recipe(&new_recipe(
                "Pasta",
                vec![
                    ingredient("spaghetti", Some(1.0), Some("lb")),
                    ingredient("garlic", Some(4.0), Some("cloves")),
                    ingredient("olive oil", Some(3.0), Some("tbsp")),
                ],
            ))
            .unwrap();
        let soup = db
            .create_recipe(&new_recipe(
                "Soup",
                vec![
                    ingredient("Garlic", Some(2.0), Some("cloves")),
                    ingredient("onion", Some(1.5), Some("medium")),
                ],
            ))
            .unwrap();
        (db, pasta.id, soup.id)
    }

    #[test]
    fn test_check_seeds_pantry_guesses() {
        let (db, pasta, _) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        assert!(service.toggle_recipe(pasta, &db).unwrap());

        let list = service.shopping_list();
        let need: Vec<&str> = list.need_items.iter().map(|i| i.name.as_str()).collect();
        let have: Vec<&str> = list.have_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(need, vec!["spaghetti", "garlic"]);
        assert_eq!(have, vec!["olive oil"]);
    }

    #[test]
    fn test_unknown_recipe_is_not_checked() {
        let (db, _, _) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        let err = service.toggle_recipe(999, &db).unwrap_err();
        assert_eq!(err.to_string(), "Recipe not found");
        assert!(!service.is_checked(999));
    }

    #[test]
    fn test_uncheck_clears_have_state() {
        let (db, pasta, _) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        service.toggle_recipe(pasta, &db).unwrap();
        assert!(!service.state().have().is_empty());

        assert!(!service.toggle_recipe(pasta, &db).unwrap());
        assert!(service.state().have().is_empty());
        assert!(service.shopping_list().is_empty());
    }

    #[test]
    fn test_toggle_item_flips_every_linked_id() {
        let (db, pasta, soup) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        service.toggle_recipe(pasta, &db).unwrap();
        service.toggle_recipe(soup, &db).unwrap();

        let list = service.shopping_list();
        let garlic_ids = find_item(&list, "garlic").unwrap().ingredient_ids.clone();
        assert_eq!(garlic_ids.len(), 2);

        assert!(service.toggle_item("GARLIC").unwrap());
        assert!(garlic_ids.iter().all(|id| service.state().have().contains(*id)));

        assert!(!service.toggle_item("garlic").unwrap());
        assert!(garlic_ids.iter().all(|id| !service.state().have().contains(*id)));

        assert!(service.toggle_item("saffron").is_err());
    }

    #[test]
    fn test_toggle_ids_ignores_ids_off_the_list() {
        let (db, pasta, _) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        service.toggle_recipe(pasta, &db).unwrap();
        let before = service.state().have().len();

        let list = service.shopping_list();
        let garlic = find_item(&list, "garlic").unwrap().ingredient_ids[0];
        assert_eq!(service.toggle_ids(&[garlic, 9999]), 1);
        assert!(service.state().have().contains(garlic));
        assert!(!service.state().have().contains(9999));

        assert_eq!(service.toggle_ids(&[9999]), 0);
        assert_eq!(service.state().have().len(), before + 1);
    }

    #[test]
    fn test_render_merges_manual_items() {
        let (db, _, soup) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        service.toggle_recipe(soup, &db).unwrap();
        let towels = service.add_manual("paper towels").unwrap();
        service.add_manual("coffee").unwrap();
        service.toggle_manual(&towels.id).unwrap();

        let rendered = service.render();
        let need: Vec<&str> = rendered.need_items.iter().map(RenderedItem::display).collect();
        let have: Vec<&str> = rendered.have_items.iter().map(RenderedItem::display).collect();
        assert_eq!(need, vec!["Garlic", "2 onion", "coffee"]);
        assert_eq!(have, vec!["paper towels"]);
    }

    #[test]
    fn test_state_survives_reload() {
        let (db, pasta, soup) = seeded_db();
        let store = MemoryStore::default();
        {
            let mut service = ShoppingService::load(&store);
            service.toggle_recipe(soup, &db).unwrap();
            service.toggle_recipe(pasta, &db).unwrap();
            service.add_manual("foil").unwrap();
        }

        let mut service = ShoppingService::load(&store);
        assert!(service.shopping_list().is_empty());
        assert_eq!(service.prefetch_checked(&db), 2);
        let list = service.shopping_list();
        assert_eq!(list.need_items[0].name, "Garlic");
        assert_eq!(list.need_items[0].recipes, vec!["Soup", "Pasta"]);
        assert_eq!(service.state().manual_items().items().len(), 1);
    }

    #[test]
    fn test_deleted_recipe_drops_out() {
        let (db, pasta, soup) = seeded_db();
        let store = MemoryStore::default();
        {
            let mut service = ShoppingService::load(&store);
            service.toggle_recipe(pasta, &db).unwrap();
            service.toggle_recipe(soup, &db).unwrap();
        }
        db.delete_recipe(pasta).unwrap();

        let mut service = ShoppingService::load(&store);
        assert_eq!(service.prefetch_checked(&db), 1);
        let list = service.shopping_list();
        assert!(list.need_items.iter().all(|i| i.recipes == vec!["Soup"]));
    }

    #[test]
    fn test_ordered_catalog() {
        let (db, pasta, soup) = seeded_db();
        let mut service = ShoppingService::load(MemoryStore::default());
        let catalog = db.list_recipes().unwrap();
        let ids: Vec<RecipeId> = service.ordered_catalog(catalog.clone()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![soup, pasta]);

        service.toggle_recipe(pasta, &db).unwrap();
        let ids: Vec<RecipeId> = service.ordered_catalog(catalog).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![pasta, soup]);
    }

    #[test]
    fn test_manual_errors() {
        let mut service = ShoppingService::load(MemoryStore::default());
        assert!(service.add_manual("   ").is_err());
        assert!(service.toggle_manual("manual-x").is_err());
        assert!(service.remove_manual("manual-x").is_err());
    }
}

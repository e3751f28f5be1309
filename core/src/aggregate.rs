//! Consolidates the ingredients of checked recipes into need/have partitions.
//!
//! Rows are keyed by the trimmed, lowercased ingredient name and kept in
//! first-seen order. A row's quantity only grows when an incoming occurrence
//! has a quantity and exactly the same unit string; otherwise the first-seen
//! quantity and unit stand.

use std::collections::HashMap;

use crate::models::{AggregatedItem, Ingredient, IngredientId, Recipe, ShoppingList};
use crate::state::HaveSet;

#[must_use]
pub fn item_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl AggregatedItem {
    /// Every ingredient id under this row. A toggle flips all of them together.
    #[must_use]
    pub fn toggle_ids(&self) -> &[IngredientId] {
        &self.ingredient_ids
    }
}

/// Insertion-ordered map from item key to aggregated row.
#[derive(Default)]
struct OrderedItems {
    index: HashMap<String, usize>,
    items: Vec<AggregatedItem>,
}

impl OrderedItems {
    fn add(&mut self, recipe_title: &str, ing: &Ingredient) {
        let key = item_key(&ing.name);
        if let Some(&pos) = self.index.get(&key) {
            let existing = &mut self.items[pos];
            if let (Some(current), Some(incoming)) = (existing.quantity, ing.quantity) {
                if existing.unit == ing.unit {
                    existing.quantity = Some(current + incoming);
                }
            }
            if !existing.recipes.iter().any(|r| r == recipe_title) {
                existing.recipes.push(recipe_title.to_string());
            }
            existing.ingredient_ids.push(ing.id);
        } else {
            self.index.insert(key, self.items.len());
            self.items.push(AggregatedItem {
                name: ing.name.clone(),
                quantity: ing.quantity,
                unit: ing.unit.clone(),
                notes: ing.notes.clone(),
                recipes: vec![recipe_title.to_string()],
                ingredient_ids: vec![ing.id],
            });
        }
    }
}

/// Pure function of the checked recipes (in check order) and the have set.
pub fn aggregate<'a>(recipes: impl IntoIterator<Item = &'a Recipe>, have: &HaveSet) -> ShoppingList {
    let mut need = OrderedItems::default();
    let mut owned = OrderedItems::default();

    for recipe in recipes {
        for ing in &recipe.ingredients {
            let target = if have.contains(ing.id) {
                &mut owned
            } else {
                &mut need
            };
            target.add(&recipe.title, ing);
        }
    }

    ShoppingList {
        need_items: need.items,
        have_items: owned.items,
    }
}

/// Find a row by name in either partition.
#[must_use]
pub fn find_item<'a>(list: &'a ShoppingList, name: &str) -> Option<&'a AggregatedItem> {
    let key = item_key(name);
    list.need_items
        .iter()
        .chain(&list.have_items)
        .find(|item| item_key(&item.name) == key)
}

//! Heuristics for guessing which ingredients the user already owns.
//!
//! Matching is a lowercase substring test against a fixed vocabulary. The
//! classifier never learns: a user flipping an ingredient between need and
//! have only changes that ingredient's flag, not future guesses.

use serde::Serialize;

use crate::models::{IngredientId, Recipe};

/// Staples most kitchens keep on hand.
pub const PANTRY_ITEMS: &[&str] = &[
    "all-purpose flour",
    "kosher salt",
    "black pepper",
    "extra-virgin olive oil",
    "olive oil",
    "salt",
    "pepper",
    "sugar",
    "vegetable oil",
    "canola oil",
    "diamond crystal kosher salt",
    "flaky sea salt",
];

/// Rare or expensive items worth a second look before shopping.
pub const SPECIALTY_ITEMS: &[&str] = &[
    "tomato passata",
    "passata",
    "'nduja",
    "nduja",
    "saffron",
    "truffle oil",
    "flaky sea salt",
    "maldon salt",
    "pecorino romano",
    "parmigiano reggiano",
];

#[must_use]
pub fn is_likely_in_pantry(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    let lower = name.to_lowercase();
    PANTRY_ITEMS.iter().any(|item| lower.contains(item))
}

/// Exact match on the normalized name, unlike the pantry substring test.
#[must_use]
pub fn is_specialty(name: &str) -> bool {
    let key = name.trim().to_lowercase();
    SPECIALTY_ITEMS.contains(&key.as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngredientCounts {
    pub shop_count: usize,
    pub have_count: usize,
}

#[must_use]
pub fn ingredient_counts(recipe: Option<&Recipe>) -> IngredientCounts {
    let Some(recipe) = recipe else {
        return IngredientCounts::default();
    };
    let have_count = recipe
        .ingredients
        .iter()
        .filter(|i| is_likely_in_pantry(&i.name))
        .count();
    IngredientCounts {
        shop_count: recipe.ingredients.len() - have_count,
        have_count,
    }
}

/// Ingredient ids of `recipe` the classifier expects to be on hand.
#[must_use]
pub fn pantry_guesses(recipe: &Recipe) -> Vec<IngredientId> {
    recipe
        .ingredients
        .iter()
        .filter(|i| is_likely_in_pantry(&i.name))
        .map(|i| i.id)
        .collect()
}

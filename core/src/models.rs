use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize};

pub type RecipeId = i64;
pub type IngredientId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub prep_time: Option<i64>,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default)]
    pub total_time: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub directions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Catalog row: recipe metadata without child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub prep_time: Option<i64>,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default)]
    pub total_time: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub ingredient_count: i64,
    #[serde(default)]
    pub created_at: String,
}

impl From<&Recipe> for RecipeSummary {
    fn from(r: &Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            description: r.description.clone(),
            source: r.source.clone(),
            source_type: r.source_type.clone(),
            prep_time: r.prep_time,
            cook_time: r.cook_time,
            total_time: r.total_time,
            servings: r.servings,
            ingredient_count: r.ingredients.len() as i64,
            created_at: r.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecipe {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub prep_time: Option<i64>,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default)]
    pub total_time: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub directions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Partial update. Present child collections replace the stored ones wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: Option<i64>,
    pub servings: Option<i64>,
    pub ingredients: Option<Vec<NewIngredient>>,
    pub directions: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

impl RecipeUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.source.is_none()
            && self.notes.is_none()
            && self.prep_time.is_none()
            && self.cook_time.is_none()
            && self.total_time.is_none()
            && self.servings.is_none()
            && self.ingredients.is_none()
            && self.directions.is_none()
            && self.categories.is_none()
    }
}

// --- Shopping list types ---

/// One consolidated row per normalized ingredient name across checked recipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub recipes: Vec<String>,
    pub ingredient_ids: Vec<IngredientId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub need_items: Vec<AggregatedItem>,
    pub have_items: Vec<AggregatedItem>,
}

impl ShoppingList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.need_items.is_empty() && self.have_items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub have: bool,
}

/// Accepts numbers, numeric strings and null. Anything else degrades to `None`
/// so a malformed record falls back to name-only formatting.
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(quantity_from_value(&value))
}

fn quantity_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|q| q.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|q| q.is_finite()),
        _ => None,
    }
}

pub const DEFAULT_SOURCE: &str = "Manual";
pub const DEFAULT_SOURCE_TYPE: &str = "manual";

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate and tidy a recipe payload before it reaches the catalog.
pub fn validate_new_recipe(recipe: NewRecipe) -> Result<NewRecipe> {
    let title = recipe.title.trim().to_string();
    if title.is_empty() {
        bail!("Recipe title is required");
    }
    if recipe.ingredients.is_empty() {
        bail!("At least one ingredient is required");
    }
    if recipe.directions.is_empty() {
        bail!("At least one direction is required");
    }
    if recipe.ingredients.iter().any(|i| i.name.trim().is_empty()) {
        bail!("All ingredients must have a name");
    }

    Ok(NewRecipe {
        title,
        description: trimmed(recipe.description),
        source: Some(trimmed(recipe.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string())),
        source_type: Some(
            trimmed(recipe.source_type).unwrap_or_else(|| DEFAULT_SOURCE_TYPE.to_string()),
        ),
        notes: trimmed(recipe.notes),
        ingredients: recipe
            .ingredients
            .into_iter()
            .map(|i| NewIngredient {
                name: i.name.trim().to_string(),
                unit: trimmed(i.unit),
                notes: trimmed(i.notes),
                ..i
            })
            .collect(),
        ..recipe
    })
}

/// Validate a partial update. Lists that are present replace the stored ones,
/// so they follow the same rules as a new recipe.
pub fn validate_recipe_update(update: RecipeUpdate) -> Result<RecipeUpdate> {
    if update.is_empty() {
        bail!("At least one field must be provided");
    }
    let title = match update.title {
        Some(title) if title.trim().is_empty() => bail!("Recipe title is required"),
        Some(title) => Some(title.trim().to_string()),
        None => None,
    };
    if let Some(ingredients) = &update.ingredients {
        if ingredients.is_empty() {
            bail!("At least one ingredient is required");
        }
        if ingredients.iter().any(|i| i.name.trim().is_empty()) {
            bail!("All ingredients must have a name");
        }
    }
    if update.directions.as_ref().is_some_and(Vec::is_empty) {
        bail!("At least one direction is required");
    }

    Ok(RecipeUpdate {
        title,
        ingredients: update.ingredients.map(|ingredients| {
            ingredients
                .into_iter()
                .map(|i| NewIngredient {
                    name: i.name.trim().to_string(),
                    unit: trimmed(i.unit),
                    notes: trimmed(i.notes),
                    ..i
                })
                .collect()
        }),
        ..update
    })
}

/// Canonical abbreviation for a unit. Unknown units are lowercased and trimmed.
#[must_use]
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "tablespoon" | "tablespoons" | "tbs" | "tbsp" => "tbsp",
        "teaspoon" | "teaspoons" | "tsp" => "tsp",
        "cup" | "cups" => "cup",
        "ounce" | "ounces" | "oz" => "oz",
        "pound" | "pounds" | "lb" | "lbs" => "lb",
        "gram" | "grams" | "g" => "g",
        "kilogram" | "kilograms" | "kg" => "kg",
        "milliliter" | "milliliters" | "ml" => "ml",
        "liter" | "liters" | "l" => "l",
        "clove" | "cloves" => "clove",
        "can" | "cans" => "can",
        "bunch" | "bunches" => "bunch",
        "slice" | "slices" => "slice",
        "piece" | "pieces" => "piece",
        _ => return lower,
    };
    canonical.to_string()
}

/// Lowercase, collapse internal whitespace, trim.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

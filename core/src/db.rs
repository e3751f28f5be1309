use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::cache::RecipeSource;
use crate::models::{
    Ingredient, NewIngredient, NewRecipe, Recipe, RecipeId, RecipeSummary, RecipeUpdate,
};
use crate::storage::KeyValueStore;

pub struct Database {
    conn: Connection,
}

const SUMMARY_COLUMNS: &str = "r.id, r.title, r.description, r.source, r.source_type,
     r.prep_time, r.cook_time, r.total_time, r.servings,
     (SELECT COUNT(*) FROM recipe_ingredients ri WHERE ri.recipe_id = r.id),
     r.created_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    source TEXT,
                    source_type TEXT,
                    notes TEXT,
                    prep_time INTEGER,
                    cook_time INTEGER,
                    total_time INTEGER,
                    servings INTEGER,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    quantity REAL,
                    unit TEXT,
                    notes TEXT,
                    order_index INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_directions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    step_number INTEGER NOT NULL,
                    instruction TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    category TEXT NOT NULL,
                    UNIQUE (recipe_id, category)
                );

                CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_directions_recipe ON recipe_directions(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_categories_category ON recipe_categories(category);
                CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Liveness check for the health endpoint.
    pub fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects SUMMARY_COLUMNS.
    fn summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeSummary> {
        Ok(RecipeSummary {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            source: row.get(3)?,
            source_type: row.get(4)?,
            prep_time: row.get(5)?,
            cook_time: row.get(6)?,
            total_time: row.get(7)?,
            servings: row.get(8)?,
            ingredient_count: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            unit: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    fn query_summaries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RecipeSummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let recipes = stmt
            .query_map(params, Self::summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO recipes (title, description, source, source_type, notes, prep_time, cook_time, total_time, servings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                recipe.title,
                recipe.description,
                recipe.source,
                recipe.source_type,
                recipe.notes,
                recipe.prep_time,
                recipe.cook_time,
                recipe.total_time,
                recipe.servings,
                now,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_ingredients(&tx, id, &recipe.ingredients)?;
        Self::insert_directions(&tx, id, &recipe.directions)?;
        Self::insert_categories(&tx, id, &recipe.categories)?;
        tx.commit()?;

        tracing::debug!(recipe_id = id, title = %recipe.title, "Created recipe");
        self.get_recipe(id)
    }

    fn insert_ingredients(conn: &Connection, recipe_id: RecipeId, ingredients: &[NewIngredient]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO recipe_ingredients (recipe_id, name, quantity, unit, notes, order_index)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (i, ing) in (0_i64..).zip(ingredients) {
            stmt.execute(params![recipe_id, ing.name, ing.quantity, ing.unit, ing.notes, i])?;
        }
        Ok(())
    }

    fn insert_directions(conn: &Connection, recipe_id: RecipeId, directions: &[String]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO recipe_directions (recipe_id, step_number, instruction) VALUES (?1, ?2, ?3)",
        )?;
        for (step_number, step) in (1_i64..).zip(directions) {
            stmt.execute(params![recipe_id, step_number, step])?;
        }
        Ok(())
    }

    fn insert_categories(conn: &Connection, recipe_id: RecipeId, categories: &[String]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO recipe_categories (recipe_id, category) VALUES (?1, ?2)",
        )?;
        for category in categories {
            let category = category.trim();
            if !category.is_empty() {
                stmt.execute(params![recipe_id, category])?;
            }
        }
        Ok(())
    }

    pub fn get_recipe(&self, id: RecipeId) -> Result<Recipe> {
        self.find_recipe(id)?.context("Recipe not found")
    }

    pub fn find_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let recipe = self
            .conn
            .query_row(
                "SELECT id, title, description, source, source_type, notes, prep_time, cook_time, total_time, servings, created_at, updated_at
                 FROM recipes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Recipe {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        source: row.get(3)?,
                        source_type: row.get(4)?,
                        notes: row.get(5)?,
                        prep_time: row.get(6)?,
                        cook_time: row.get(7)?,
                        total_time: row.get(8)?,
                        servings: row.get(9)?,
                        ingredients: Vec::new(),
                        directions: Vec::new(),
                        categories: Vec::new(),
                        created_at: row.get(10)?,
                        updated_at: row.get(11)?,
                    })
                },
            )
            .optional()?;

        let Some(mut recipe) = recipe else {
            return Ok(None);
        };
        recipe.ingredients = self.get_ingredients(id)?;
        recipe.directions = self.get_directions(id)?;
        recipe.categories = self.get_categories(id)?;
        Ok(Some(recipe))
    }

    fn get_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<Ingredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, quantity, unit, notes FROM recipe_ingredients
             WHERE recipe_id = ?1 ORDER BY order_index",
        )?;
        let ingredients = stmt
            .query_map(params![recipe_id], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    fn get_directions(&self, recipe_id: RecipeId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT instruction FROM recipe_directions WHERE recipe_id = ?1 ORDER BY step_number",
        )?;
        let steps = stmt
            .query_map(params![recipe_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(steps)
    }

    fn get_categories(&self, recipe_id: RecipeId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT category FROM recipe_categories WHERE recipe_id = ?1 ORDER BY category",
        )?;
        let categories = stmt
            .query_map(params![recipe_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Newest first.
    pub fn list_recipes(&self) -> Result<Vec<RecipeSummary>> {
        self.query_summaries(
            &format!("SELECT {SUMMARY_COLUMNS} FROM recipes r ORDER BY r.created_at DESC, r.id DESC"),
            [],
        )
    }

    pub fn search_recipes(&self, query: &str) -> Result<Vec<RecipeSummary>> {
        let escaped = query
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        self.query_summaries(
            &format!(
                "SELECT {SUMMARY_COLUMNS} FROM recipes r
                 WHERE r.title LIKE ?1 ESCAPE '\\' OR r.description LIKE ?1 ESCAPE '\\'
                 ORDER BY r.created_at DESC, r.id DESC"
            ),
            params![pattern],
        )
    }

    pub fn recipes_by_category(&self, category: &str) -> Result<Vec<RecipeSummary>> {
        self.query_summaries(
            &format!(
                "SELECT {SUMMARY_COLUMNS} FROM recipes r
                 WHERE r.id IN (SELECT recipe_id FROM recipe_categories WHERE category = ?1)
                 ORDER BY r.created_at DESC, r.id DESC"
            ),
            params![category.trim()],
        )
    }

    /// Applies present fields; present child collections replace the stored ones.
    pub fn update_recipe(&self, id: RecipeId, update: &RecipeUpdate) -> Result<Recipe> {
        // Existence check first so a missing id reports "Recipe not found".
        self.get_recipe(id)?;
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE recipes SET
                title = COALESCE(?1, title),
                description = COALESCE(?2, description),
                source = COALESCE(?3, source),
                notes = COALESCE(?4, notes),
                prep_time = COALESCE(?5, prep_time),
                cook_time = COALESCE(?6, cook_time),
                total_time = COALESCE(?7, total_time),
                servings = COALESCE(?8, servings),
                updated_at = ?9
             WHERE id = ?10",
            params![
                update.title.as_deref().map(str::trim),
                update.description,
                update.source,
                update.notes,
                update.prep_time,
                update.cook_time,
                update.total_time,
                update.servings,
                now,
                id,
            ],
        )?;

        if let Some(ingredients) = &update.ingredients {
            tx.execute(
                "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
                params![id],
            )?;
            Self::insert_ingredients(&tx, id, ingredients)?;
        }
        if let Some(directions) = &update.directions {
            tx.execute(
                "DELETE FROM recipe_directions WHERE recipe_id = ?1",
                params![id],
            )?;
            Self::insert_directions(&tx, id, directions)?;
        }
        if let Some(categories) = &update.categories {
            tx.execute(
                "DELETE FROM recipe_categories WHERE recipe_id = ?1",
                params![id],
            )?;
            Self::insert_categories(&tx, id, categories)?;
        }
        tx.commit()?;

        tracing::debug!(recipe_id = id, "Updated recipe");
        self.get_recipe(id)
    }

    pub fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        for table in ["recipe_ingredients", "recipe_directions", "recipe_categories"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE recipe_id = ?1"),
                params![id],
            )?;
        }
        let rows = tx.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // --- Key-value store ---

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }
}

impl RecipeSource for Database {
    fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.find_recipe(id)
    }

    fn get_recipes(&self) -> Result<Vec<RecipeSummary>> {
        self.list_recipes()
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv_set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, quantity: Option<f64>, unit: Option<&str>) -> NewIngredient {
        NewIngredient {
            name: name.to_string(),
            quantity,
            unit: unit.map(String::from),
            notes: None,
        }
    }

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            title: "Pasta e ceci".to_string(),
            description: Some("Chickpea pasta soup".to_string()),
            source: Some("Manual".to_string()),
            source_type: Some("manual".to_string()),
            servings: Some(4),
            ingredients: vec![
                ingredient("ditalini", Some(8.0), Some("oz")),
                ingredient("chickpeas", Some(2.0), Some("can")),
                ingredient("olive oil", Some(3.0), Some("tbsp")),
            ],
            directions: vec!["Sweat the aromatics.".to_string(), "Simmer.".to_string()],
            categories: vec!["soup".to_string(), "pasta".to_string(), "soup".to_string()],
            ..NewRecipe::default()
        }
    }

    #[test]
    fn test_create_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        assert_eq!(recipe.title, "Pasta e ceci");
        assert_eq!(recipe.servings, Some(4));
        let names: Vec<&str> = recipe.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ditalini", "chickpeas", "olive oil"]);
        assert_eq!(recipe.ingredients[0].quantity, Some(8.0));
        assert_eq!(recipe.directions, vec!["Sweat the aromatics.", "Simmer."]);
        assert_eq!(recipe.categories, vec!["pasta", "soup"]);

        let fetched = db.get_recipe(recipe.id).unwrap();
        assert_eq!(fetched, recipe);
    }

    #[test]
    fn test_missing_recipe() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_recipe(42).unwrap().is_none());
        let err = db.get_recipe(42).unwrap_err();
        assert_eq!(err.to_string(), "Recipe not found");
    }

    #[test]
    fn test_list_newest_first_with_counts() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_recipe(&sample_recipe()).unwrap();
        let mut other = sample_recipe();
        other.title = "Tomato toast".to_string();
        other.ingredients.truncate(1);
        let second = db.create_recipe(&other).unwrap();

        let list = db.list_recipes().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[0].ingredient_count, 1);
        assert_eq!(list[1].id, first.id);
        assert_eq!(list[1].ingredient_count, 3);
    }

    #[test]
    fn test_search_and_category() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe(&sample_recipe()).unwrap();
        let mut salad = sample_recipe();
        salad.title = "Fennel salad".to_string();
        salad.description = None;
        salad.categories = vec!["salad".to_string()];
        db.create_recipe(&salad).unwrap();

        let hits = db.search_recipes("chickpea").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Pasta e ceci");

        let hits = db.search_recipes("FENNEL").unwrap();
        assert_eq!(hits.len(), 1);

        assert!(db.search_recipes("100%").unwrap().is_empty());

        let soups = db.recipes_by_category("soup").unwrap();
        assert_eq!(soups.len(), 1);
        assert!(db.recipes_by_category("dessert").unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_children_wholesale() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();

        let update = RecipeUpdate {
            title: Some("Pasta e fagioli".to_string()),
            ingredients: Some(vec![ingredient("borlotti", Some(1.0), Some("lb"))]),
            ..RecipeUpdate::default()
        };
        let updated = db.update_recipe(recipe.id, &update).unwrap();

        assert_eq!(updated.title, "Pasta e fagioli");
        assert_eq!(updated.description.as_deref(), Some("Chickpea pasta soup"));
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "borlotti");
        assert_eq!(updated.directions.len(), 2);
        assert_eq!(updated.categories, vec!["pasta", "soup"]);
    }

    #[test]
    fn test_update_missing_recipe() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_recipe(9, &RecipeUpdate::default()).unwrap_err();
        assert_eq!(err.to_string(), "Recipe not found");
    }

    #[test]
    fn test_delete_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe()).unwrap();
        assert!(db.delete_recipe(recipe.id).unwrap());
        assert!(!db.delete_recipe(recipe.id).unwrap());
        assert!(db.find_recipe(recipe.id).unwrap().is_none());
        assert!(db.list_recipes().unwrap().is_empty());
    }

    #[test]
    fn test_kv_store_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.kv_get("cookie-recipe-order").unwrap(), None);
        db.kv_set("cookie-recipe-order", "[1,2]").unwrap();
        db.kv_set("cookie-recipe-order", "[2,1]").unwrap();
        assert_eq!(
            db.kv_get("cookie-recipe-order").unwrap().as_deref(),
            Some("[2,1]")
        );
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookie.db");
        let id = {
            let db = Database::open(&path).unwrap();
            db.kv_set("cookie-have-ingredients", "[3]").unwrap();
            db.create_recipe(&sample_recipe()).unwrap().id
        };
        let db = Database::open(&path).unwrap();
        assert!(db.find_recipe(id).unwrap().is_some());
        assert_eq!(
            db.kv_get("cookie-have-ingredients").unwrap().as_deref(),
            Some("[3]")
        );
    }
}

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookie_core::db::Database;
use cookie_core::format::format_for_recipe;
use cookie_core::models::{
    NewIngredient, NewRecipe, Recipe, RecipeId, RecipeSummary, RecipeUpdate, normalize_name,
    normalize_unit, validate_new_recipe, validate_recipe_update,
};
use cookie_core::pantry::{IngredientCounts, ingredient_counts, is_specialty};

use super::helpers::{check_mark, exit_not_found, print_json, read_json_file, truncate};
use super::{Catalog, Shopping};

#[derive(Serialize)]
struct CatalogEntry {
    #[serde(flatten)]
    recipe: RecipeSummary,
    checked: bool,
    #[serde(flatten)]
    counts: IngredientCounts,
    specialty: bool,
}

pub(crate) async fn cmd_recipe_list(
    catalog: &Catalog<'_>,
    shopping: &mut Shopping<'_>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "")]
        mark: &'static str,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Shop")]
        shop: usize,
        #[tabled(rename = "Have")]
        have: usize,
        #[tabled(rename = "")]
        specialty: &'static str,
    }

    let recipes = shopping.ordered_catalog(catalog.recipes().await?);
    if recipes.is_empty() {
        if json {
            println!("[]");
            std::process::exit(2);
        }
        exit_not_found("No recipes found", false);
    }

    let ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();
    catalog.prefetch(shopping.cache_mut(), &ids).await;

    let entries: Vec<CatalogEntry> = recipes
        .into_iter()
        .map(|recipe| {
            let cached = shopping.cache().get(recipe.id);
            CatalogEntry {
                checked: shopping.is_checked(recipe.id),
                counts: ingredient_counts(cached),
                specialty: cached.is_some_and(|r| r.ingredients.iter().any(|i| is_specialty(&i.name))),
                recipe,
            }
        })
        .collect();

    if json {
        return print_json(&entries);
    }

    let rows: Vec<RecipeRow> = entries
        .iter()
        .map(|e| RecipeRow {
            mark: check_mark(e.checked),
            id: e.recipe.id,
            title: truncate(&e.recipe.title, 40),
            shop: e.counts.shop_count,
            have: e.counts.have_count,
            specialty: if e.specialty { "★" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) async fn cmd_recipe_show(
    catalog: &Catalog<'_>,
    shopping: &Shopping<'_>,
    id: RecipeId,
    json: bool,
) -> Result<()> {
    let Some(recipe) = catalog.recipe(id).await? else {
        exit_not_found(&format!("Recipe {id} not found"), json);
    };

    if json {
        return print_json(&recipe);
    }

    let have = shopping.state().have();
    let title = &recipe.title;
    let mark = if shopping.is_checked(id) { " [making this]" } else { "" };
    println!("=== {title} ==={mark}");
    if let Some(description) = &recipe.description {
        println!("  {description}");
    }
    let times = [
        ("Prep", recipe.prep_time),
        ("Cook", recipe.cook_time),
        ("Total", recipe.total_time),
    ]
    .iter()
    .filter_map(|(label, minutes)| minutes.map(|m| format!("{label}: {m} min")))
    .chain(recipe.servings.map(|s| format!("Serves {s}")))
    .collect::<Vec<_>>();
    if !times.is_empty() {
        println!("  {}", times.join("  |  "));
    }
    if let Some(source) = &recipe.source {
        println!("  Source: {source}");
    }
    if !recipe.categories.is_empty() {
        println!("  Categories: {}", recipe.categories.join(", "));
    }

    println!("\n  INGREDIENTS:");
    for ing in &recipe.ingredients {
        let marker = if is_specialty(&ing.name) { " ★" } else { "" };
        println!(
            "    {} {}{marker}",
            check_mark(have.contains(ing.id)),
            format_for_recipe(ing)
        );
    }

    println!("\n  DIRECTIONS:");
    for (n, step) in recipe.directions.iter().enumerate() {
        println!("    {}. {step}", n + 1);
    }

    if let Some(notes) = &recipe.notes {
        println!("\n  NOTES:\n    {notes}");
    }

    Ok(())
}

fn print_saved(verb: &str, recipe: &Recipe, json: bool) -> Result<()> {
    if json {
        return print_json(recipe);
    }
    let title = &recipe.title;
    let id = recipe.id;
    let ing_count = recipe.ingredients.len();
    let steps = recipe.directions.len();
    println!("{verb} recipe: {title} (id: {id}, {ing_count} ingredients, {steps} steps)");
    Ok(())
}

pub(crate) fn cmd_recipe_add(db: &Database, file: &Path, json: bool) -> Result<()> {
    let recipe: NewRecipe = read_json_file(file)?;
    let recipe = validate_new_recipe(recipe)?;
    let created = db.create_recipe(&recipe)?;
    print_saved("Created", &created, json)
}

pub(crate) fn cmd_recipe_update(db: &Database, id: RecipeId, file: &Path, json: bool) -> Result<()> {
    let update = validate_recipe_update(read_json_file::<RecipeUpdate>(file)?)?;
    if db.find_recipe(id)?.is_none() {
        exit_not_found(&format!("Recipe {id} not found"), json);
    }
    let updated = db.update_recipe(id, &update)?;
    print_saved("Updated", &updated, json)
}

pub(crate) fn cmd_recipe_delete(db: &Database, id: RecipeId, json: bool) -> Result<()> {
    if !db.delete_recipe(id)? {
        exit_not_found(&format!("Recipe {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    db: &Database,
    file: &Path,
    title_override: Option<String>,
    servings_override: Option<i64>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let fallback_title = file.file_stem().and_then(|s| s.to_str());
    let recipe = cooklang_to_recipe(&input, title_override, servings_override, fallback_title)?;
    let created = db.create_recipe(&validate_new_recipe(recipe)?)?;
    print_saved("Imported", &created, json)
}

fn cooklang_to_recipe(
    input: &str,
    title_override: Option<String>,
    servings_override: Option<i64>,
    fallback_title: Option<&str>,
) -> Result<NewRecipe> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = title_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| fallback_title.map(String::from))
        .context("Could not determine recipe title. Use --name to specify one")?;

    let servings = servings_override.or_else(|| {
        recipe_data
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(i64::from))
    });

    let converter = cooklang::Converter::default();
    let ingredients: Vec<NewIngredient> = recipe_data
        .group_ingredients(&converter)
        .iter()
        .map(cooklang_ingredient)
        .collect();
    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let directions = cooklang_steps(&recipe_data);

    Ok(NewRecipe {
        title,
        servings,
        ingredients,
        directions,
        source_type: Some("cooklang".to_string()),
        ..NewRecipe::default()
    })
}

fn cooklang_ingredient(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> NewIngredient {
    let (quantity, unit) =
        gi.quantity
            .iter()
            .next()
            .map_or((None, None), |qty: &cooklang::Quantity| {
                let value = match qty.value() {
                    cooklang::Value::Number(n) => Some(n.value()),
                    cooklang::Value::Range { start, .. } => Some(start.value()),
                    cooklang::Value::Text(t) => t.trim().parse::<f64>().ok(),
                };
                (value, qty.unit().map(normalize_unit))
            });

    NewIngredient {
        name: normalize_name(&gi.ingredient.display_name()),
        quantity,
        unit,
        notes: gi.ingredient.note.clone(),
    }
}

/// One direction per step, with ingredient, cookware and timer references
/// rendered back into plain text.
fn cooklang_steps(recipe: &cooklang::Recipe) -> Vec<String> {
    use cooklang::{Content, Item};

    let mut steps = Vec::new();
    for section in &recipe.sections {
        for content in &section.content {
            let Content::Step(step) = content else {
                continue;
            };
            let mut text = String::new();
            for item in &step.items {
                match item {
                    Item::Text { value } => text.push_str(value),
                    Item::Ingredient { index } => {
                        text.push_str(&recipe.ingredients[*index].display_name());
                    }
                    Item::Cookware { index } => text.push_str(&recipe.cookware[*index].name),
                    Item::Timer { index } => {
                        if let Some(quantity) = &recipe.timers[*index].quantity {
                            text.push_str(&quantity.to_string());
                        }
                    }
                    _ => {}
                }
            }
            let text = text.trim();
            if !text.is_empty() {
                steps.push(text.to_string());
            }
        }
    }
    steps
}

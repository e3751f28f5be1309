use anyhow::Result;

use cookie_core::models::RecipeId;
use cookie_core::service::{RenderedItem, RenderedList};

use super::helpers::{check_mark, exit_not_found, print_json};
use super::{Catalog, Shopping};

pub(crate) async fn cmd_check(
    catalog: &Catalog<'_>,
    shopping: &mut Shopping<'_>,
    id: RecipeId,
    json: bool,
) -> Result<()> {
    // Unchecking also wants the recipe, to clear its ingredients' have state.
    let available = catalog.prefetch(shopping.cache_mut(), &[id]).await == 1;
    if !available && !shopping.is_checked(id) {
        exit_not_found(&format!("Recipe {id} not found"), json);
    }

    let checked = shopping.toggle_cached_recipe(id)?;
    if json {
        println!("{}", serde_json::json!({ "recipe_id": id, "checked": checked }));
        return Ok(());
    }

    let title = shopping
        .cache()
        .get(id)
        .map_or_else(|| format!("Recipe {id}"), |r| r.title.clone());
    if checked {
        println!("Making {title}");
    } else {
        println!("No longer making {title}");
    }
    Ok(())
}

fn print_section(heading: &str, items: &[RenderedItem], have: bool) {
    println!("{heading} ({})", items.len());
    for item in items {
        let line = match item {
            RenderedItem::Ingredient {
                display,
                specialty,
                recipes,
                ..
            } => {
                let marker = if *specialty { " ★" } else { "" };
                format!("{display}{marker}  · {}", recipes.join(", "))
            }
            RenderedItem::Manual { display, id } => format!("{display}  ({id})"),
        };
        println!("  {} {line}", check_mark(have));
    }
}

fn print_list(list: &RenderedList) {
    print_section("NEED", &list.need_items, false);
    println!();
    print_section("HAVE", &list.have_items, true);
}

pub(crate) async fn cmd_list(catalog: &Catalog<'_>, shopping: &mut Shopping<'_>, json: bool) -> Result<()> {
    catalog.prefetch_checked(shopping).await;
    let list = shopping.render();

    if list.is_empty() {
        exit_not_found(
            "Shopping list is empty. Check a recipe with: cookie check <recipe-id>",
            json,
        );
    }

    if json {
        return print_json(&list);
    }
    print_list(&list);
    Ok(())
}

pub(crate) async fn cmd_have(
    catalog: &Catalog<'_>,
    shopping: &mut Shopping<'_>,
    name: &str,
    json: bool,
) -> Result<()> {
    catalog.prefetch_checked(shopping).await;
    let have = match shopping.toggle_item(name) {
        Ok(have) => have,
        Err(e) => exit_not_found(&e.to_string(), json),
    };

    if json {
        println!("{}", serde_json::json!({ "name": name.trim(), "have": have }));
    } else if have {
        println!("Have {}", name.trim());
    } else {
        println!("Need {}", name.trim());
    }
    Ok(())
}

pub(crate) fn cmd_reorder(shopping: &mut Shopping<'_>, order: Vec<RecipeId>, json: bool) -> Result<()> {
    shopping.reorder(order);
    let order = &shopping.state().data().recipe_order;
    if json {
        return print_json(order);
    }
    let ids: Vec<String> = order.iter().map(ToString::to_string).collect();
    println!("Recipe order: {}", ids.join(", "));
    Ok(())
}

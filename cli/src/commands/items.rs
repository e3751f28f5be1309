use anyhow::Result;

use super::Shopping;
use super::helpers::{exit_not_found, print_json};

pub(crate) fn cmd_item_add(shopping: &mut Shopping<'_>, name: &str, json: bool) -> Result<()> {
    let item = shopping.add_manual(name)?;
    if json {
        return print_json(&item);
    }
    println!("Added {} (id: {})", item.name, item.id);
    Ok(())
}

pub(crate) fn cmd_item_toggle(shopping: &mut Shopping<'_>, id: &str, json: bool) -> Result<()> {
    if let Err(e) = shopping.toggle_manual(id) {
        exit_not_found(&e.to_string(), json);
    }
    let Some(item) = shopping.state().manual_items().get(id) else {
        exit_not_found(&format!("Item '{id}' not found"), json);
    };
    if json {
        return print_json(item);
    }
    let status = if item.have { "have" } else { "need" };
    println!("{}: {status}", item.name);
    Ok(())
}

pub(crate) fn cmd_item_remove(shopping: &mut Shopping<'_>, id: &str, json: bool) -> Result<()> {
    if let Err(e) = shopping.remove_manual(id) {
        exit_not_found(&e.to_string(), json);
    }
    if json {
        println!("{}", serde_json::json!({ "removed": id }));
    } else {
        println!("Removed {id}");
    }
    Ok(())
}

mod helpers;
mod items;
mod recipe;
mod shopping;

use anyhow::{Result, bail};

use crate::remote::RemoteCatalog;
use cookie_core::cache::RecipeCache;
use cookie_core::db::Database;
use cookie_core::models::{Recipe, RecipeId, RecipeSummary};
use cookie_core::service::ShoppingService;

pub(crate) use items::{cmd_item_add, cmd_item_remove, cmd_item_toggle};
pub(crate) use recipe::{
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list, cmd_recipe_show,
    cmd_recipe_update,
};
pub(crate) use shopping::{cmd_check, cmd_have, cmd_list, cmd_reorder};

/// Shopping state always lives in the local database.
pub(crate) type Shopping<'a> = ShoppingService<&'a Database>;

/// Where recipes are read from: the local catalog, or another Cookie server.
pub(crate) enum Catalog<'a> {
    Local(&'a Database),
    Remote(RemoteCatalog),
}

impl Catalog<'_> {
    pub(crate) async fn recipes(&self) -> Result<Vec<RecipeSummary>> {
        match self {
            Catalog::Local(db) => db.list_recipes(),
            Catalog::Remote(remote) => remote.get_recipes_async().await,
        }
    }

    pub(crate) async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        match self {
            Catalog::Local(db) => db.find_recipe(id),
            Catalog::Remote(remote) => remote.get_recipe_async(id).await,
        }
    }

    /// Cache every recipe in `ids`. Returns how many are available.
    pub(crate) async fn prefetch(&self, cache: &mut RecipeCache, ids: &[RecipeId]) -> usize {
        match self {
            Catalog::Local(db) => ids.iter().filter(|id| cache.prefetch(**id, *db)).count(),
            Catalog::Remote(remote) => remote.prefetch(cache, ids).await,
        }
    }

    /// Cache every checked recipe.
    pub(crate) async fn prefetch_checked(&self, shopping: &mut Shopping<'_>) -> usize {
        let ids: Vec<RecipeId> = shopping.state().checked().iter().collect();
        self.prefetch(shopping.cache_mut(), &ids).await
    }

    /// The local database, for commands that edit the catalog.
    pub(crate) fn local(&self, command: &str) -> Result<&Database> {
        match self {
            Catalog::Local(db) => Ok(db),
            Catalog::Remote(_) => {
                bail!("`{command}` edits the local catalog and cannot be used with --server")
            }
        }
    }
}

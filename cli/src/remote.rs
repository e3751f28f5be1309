use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::task::{self, JoinSet};

use cookie_core::cache::RecipeCache;
use cookie_core::models::{Recipe, RecipeId, RecipeSummary};

/// Bearer token sent to a remote Cookie API.
pub const API_KEY_ENV: &str = "COOKIE_API_KEY";

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Read-only client for another Cookie server's recipe catalog.
#[derive(Clone)]
pub struct RemoteCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteCatalog {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "cookie-cli/{} (shopping list)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to reach Cookie API at {}", self.base_url))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        let body: Envelope<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))?;
        unwrap_envelope(status, body).map(Some)
    }

    pub async fn get_recipes_async(&self) -> Result<Vec<RecipeSummary>> {
        Ok(self.fetch("/api/recipes").await?.unwrap_or_default())
    }

    /// `Ok(None)` when the server answers 404.
    pub async fn get_recipe_async(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.fetch(&format!("/api/recipes/{id}")).await
    }

    /// Fill `cache` with every recipe in `ids` not already cached or in flight,
    /// fetching concurrently. Failed fetches leave no entry behind.
    pub async fn prefetch(&self, cache: &mut RecipeCache, ids: &[RecipeId]) -> usize {
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        for &id in ids {
            if cache.begin_fetch(id) {
                let catalog = self.clone();
                let handle = tasks.spawn(async move { (id, catalog.get_recipe_async(id).await) });
                in_flight.insert(handle.id(), id);
            }
        }

        settle_fetches(cache, tasks, &in_flight).await;
        ids.iter().filter(|id| cache.get(**id).is_some()).count()
    }
}

type FetchResult = (RecipeId, Result<Option<Recipe>>);

/// Drain `tasks` into `cache`. A task that panics or is cancelled still clears
/// its pending entry, found through `in_flight`.
async fn settle_fetches(
    cache: &mut RecipeCache,
    mut tasks: JoinSet<FetchResult>,
    in_flight: &HashMap<task::Id, RecipeId>,
) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(Some(recipe)))) => {
                tracing::debug!(recipe_id = id, "Cached remote recipe");
                cache.complete(id, recipe);
            }
            Ok((id, Ok(None))) => {
                tracing::warn!(recipe_id = id, "Recipe not found on server");
                cache.fail(id);
            }
            Ok((id, Err(e))) => {
                tracing::error!(recipe_id = id, error = %e, "Failed to fetch recipe");
                cache.fail(id);
            }
            Err(e) => {
                tracing::error!(error = %e, "Recipe fetch task failed");
                if let Some(&id) = in_flight.get(&e.id()) {
                    cache.fail(id);
                }
            }
        }
    }
}

fn unwrap_envelope<T>(status: StatusCode, body: Envelope<T>) -> Result<T> {
    if !status.is_success() || !body.success {
        let message = body
            .error
            .map_or_else(|| status.to_string(), |e| e.message);
        bail!("Cookie API error: {message}");
    }
    body.data.context("Cookie API response has no data")
}

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use cookie_core::cache::RecipeSource;
use cookie_core::db::Database;
use cookie_core::models::{
    IngredientId, NewRecipe, Recipe, RecipeId, RecipeSummary, RecipeUpdate, validate_new_recipe,
    validate_recipe_update,
};
use cookie_core::service::ShoppingService;
use cookie_core::storage::KeyValueStore;

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

/// One connection shared by the catalog handlers and the shopping state.
///
/// Each call takes the lock for its own duration only, so the shopping
/// service can read recipes and persist state through it while a handler
/// holds the service lock.
#[derive(Clone)]
pub struct SharedDatabase(Arc<Mutex<Database>>);

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self(Arc::new(Mutex::new(db)))
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RecipeSource for SharedDatabase {
    fn get_recipe(&self, id: RecipeId) -> anyhow::Result<Option<Recipe>> {
        self.lock().find_recipe(id)
    }

    fn get_recipes(&self) -> anyhow::Result<Vec<RecipeSummary>> {
        self.lock().list_recipes()
    }
}

impl KeyValueStore for SharedDatabase {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.lock().kv_get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock().kv_set(key, value)
    }
}

// Lock order: `shopping` before `db`. Never take `shopping` while holding `db`.
#[derive(Clone)]
struct AppState {
    db: SharedDatabase,
    shopping: Arc<Mutex<ShoppingService<SharedDatabase>>>,
    api_key: Option<String>,
}

impl AppState {
    fn new(db: Database, api_key: Option<String>) -> Self {
        let db = SharedDatabase::new(db);
        let shopping = ShoppingService::load(db.clone());
        Self {
            db,
            shopping: Arc::new(Mutex::new(shopping)),
            api_key,
        }
    }

    fn shopping(&self) -> MutexGuard<'_, ShoppingService<SharedDatabase>> {
        self.shopping
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

#[derive(Serialize)]
struct Message {
    success: bool,
    message: String,
}

fn message(text: &str) -> Json<Message> {
    Json(Message {
        success: true,
        message: text.to_string(),
    })
}

#[derive(Deserialize)]
struct RecipeQuery {
    search: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    ingredient_ids: Vec<IngredientId>,
}

#[derive(Deserialize)]
struct ReorderRequest {
    order: Vec<RecipeId>,
}

#[derive(Deserialize)]
struct ManualItemRequest {
    name: String,
}

#[derive(Serialize)]
struct CheckedResponse {
    recipe_id: RecipeId,
    checked: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };
        let body = ErrorResponse {
            success: false,
            error: ErrorBody { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn recipe_not_found() -> ApiError {
    ApiError::NotFound("Recipe not found".to_string())
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            tracing::warn!(path = %request.uri().path(), "Rejected request without valid API key");
            return ApiError::Unauthorized("Invalid or missing API key".to_string())
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn health(State(state): State<AppState>) -> Response {
    match state.db.lock().ping() {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "services": { "database": "connected", "api": "running" },
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {e:#}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "success": false,
                    "status": "unhealthy",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Envelope<Vec<RecipeSummary>>>, ApiError> {
    let db = state.db.lock();
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let category = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let recipes = if let Some(search) = search {
        db.search_recipes(search)
    } else if let Some(category) = category {
        db.recipes_by_category(category)
    } else {
        db.list_recipes()
    }
    .context("failed to list recipes")?;

    Ok(ok(recipes))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<Envelope<Recipe>>, ApiError> {
    let recipe = state
        .db
        .lock()
        .find_recipe(id)
        .context("database error")?
        .ok_or_else(recipe_not_found)?;
    Ok(ok(recipe))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Envelope<Recipe>>), ApiError> {
    let recipe = validate_new_recipe(req).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let created = state
        .db
        .lock()
        .create_recipe(&recipe)
        .context("failed to create recipe")?;
    tracing::info!(recipe_id = created.id, title = %created.title, "Created recipe");
    Ok((StatusCode::CREATED, ok(created)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(req): Json<RecipeUpdate>,
) -> Result<Json<Envelope<Recipe>>, ApiError> {
    let req = validate_recipe_update(req).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let updated = {
        let db = state.db.lock();
        if db.find_recipe(id).context("database error")?.is_none() {
            return Err(recipe_not_found());
        }
        db.update_recipe(id, &req)
            .context("failed to update recipe")?
    };
    state.shopping().forget_recipe(id);
    Ok(ok(updated))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<Message>, ApiError> {
    let deleted = state
        .db
        .lock()
        .delete_recipe(id)
        .context("failed to delete recipe")?;
    if !deleted {
        return Err(recipe_not_found());
    }
    state.shopping().forget_recipe(id);
    Ok(message("Recipe deleted successfully"))
}

async fn get_shopping_list(
    State(state): State<AppState>,
) -> Json<Envelope<cookie_core::service::RenderedList>> {
    let mut shopping = state.shopping();
    shopping.prefetch_checked(&state.db);
    ok(shopping.render())
}

async fn toggle_items(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<Envelope<cookie_core::service::RenderedList>>, ApiError> {
    if req.ingredient_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "ingredient_ids must not be empty".to_string(),
        ));
    }
    let mut shopping = state.shopping();
    shopping.prefetch_checked(&state.db);
    if shopping.toggle_ids(&req.ingredient_ids) == 0 {
        return Err(ApiError::NotFound(
            "No such ingredient on the shopping list".to_string(),
        ));
    }
    Ok(ok(shopping.render()))
}

async fn toggle_checked(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<Envelope<CheckedResponse>>, ApiError> {
    let mut shopping = state.shopping();
    if shopping.is_checked(id) {
        // Needed to clear the recipe's have state after a restart.
        shopping.cache_mut().prefetch(id, &state.db);
    } else {
        let recipe = state
            .db
            .lock()
            .find_recipe(id)
            .context("database error")?
            .ok_or_else(recipe_not_found)?;
        shopping.cache_mut().complete(id, recipe);
    }
    let checked = shopping.toggle_cached_recipe(id)?;
    Ok(ok(CheckedResponse {
        recipe_id: id,
        checked,
    }))
}

async fn set_recipe_order(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Json<Envelope<Vec<RecipeId>>> {
    state.shopping().reorder(req.order.clone());
    ok(req.order)
}

async fn add_manual_item(
    State(state): State<AppState>,
    Json(req): Json<ManualItemRequest>,
) -> Result<(StatusCode, Json<Envelope<cookie_core::models::ManualItem>>), ApiError> {
    let item = state
        .shopping()
        .add_manual(&req.name)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((StatusCode::CREATED, ok(item)))
}

async fn toggle_manual_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<cookie_core::models::ManualItem>>, ApiError> {
    let mut shopping = state.shopping();
    shopping
        .toggle_manual(&id)
        .map_err(|e| ApiError::NotFound(format!("{e}")))?;
    let item = shopping
        .state()
        .manual_items()
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Item '{id}' not found")))?;
    Ok(ok(item))
}

async fn delete_manual_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    state
        .shopping()
        .remove_manual(&id)
        .map_err(|e| ApiError::NotFound(format!("{e}")))?;
    Ok(message("Item removed"))
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {method} {} not found", uri.path()))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/shopping-list", get(get_shopping_list))
        .route("/api/shopping-list/toggle", post(toggle_items))
        .route("/api/checked/{id}", post(toggle_checked))
        .route("/api/recipe-order", put(set_recipe_order))
        .route("/api/manual-items", post(add_manual_item))
        .route("/api/manual-items/{id}", axum::routing::delete(delete_manual_item))
        .route("/api/manual-items/{id}/toggle", post(toggle_manual_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/api/health", get(health))
        .fallback(route_not_found)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub(crate) fn app(db: Database, api_key: Option<String>) -> Router {
    build_router(AppState::new(db, api_key))
}

pub async fn start_server(
    db: Database,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let router = app(db, api_key.clone());

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_app(api_key: Option<String>) -> Router {
        app(Database::open_in_memory().unwrap(), api_key)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn pasta() -> Value {
        json!({
            "title": "Aglio e olio",
            "ingredients": [
                {"name": "spaghetti", "quantity": 1, "unit": "lb"},
                {"name": "garlic", "quantity": "6", "unit": "cloves"},
                {"name": "olive oil", "quantity": 0.5, "unit": "cup"}
            ],
            "directions": ["Boil pasta.", "Toast garlic in oil.", "Toss."],
            "categories": ["pasta", "quick"]
        })
    }

    async fn create(app: &Router, recipe: Value) -> RecipeId {
        let (status, json) = call(app, "POST", "/api/recipes", Some(recipe)).await;
        assert_eq!(status, StatusCode::CREATED);
        json["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let (status, json) = call(&app, "GET", "/api/recipes", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
        assert_eq!(json["error"]["message"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));
        let response = app
            .oneshot(
                axum::http::Request::get("/api/recipes")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app(Some("secret".to_string()));
        let (status, json) = call(&app, "GET", "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["database"], "connected");
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);
        let response = app
            .oneshot(
                axum::http::Request::get("/api/recipes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/recipes")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/cookie.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let app = test_app(None);
        let (status, json) = call(&app, "GET", "/api/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Route GET /api/nope not found");
    }

    #[tokio::test]
    async fn create_and_fetch_recipe() {
        let app = test_app(None);
        let id = create(&app, pasta()).await;

        let (status, json) = call(&app, "GET", &format!("/api/recipes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["title"], "Aglio e olio");
        assert_eq!(json["data"]["source"], "Manual");
        assert_eq!(json["data"]["ingredients"][1]["quantity"], 6.0);
        assert_eq!(json["data"]["directions"].as_array().unwrap().len(), 3);

        let (_, json) = call(&app, "GET", "/api/recipes?category=quick", None).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        let (_, json) = call(&app, "GET", "/api/recipes?search=aglio", None).await;
        assert_eq!(json["data"][0]["ingredient_count"], 3);
    }

    #[tokio::test]
    async fn create_recipe_validation() {
        let app = test_app(None);
        let mut recipe = pasta();
        recipe["directions"] = json!([]);
        let (status, json) = call(&app, "POST", "/api/recipes", Some(recipe)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "At least one direction is required");
    }

    #[tokio::test]
    async fn missing_recipe_returns_404() {
        let app = test_app(None);
        let (status, json) = call(&app, "GET", "/api/recipes/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["message"], "Recipe not found");

        let (status, _) = call(&app, "DELETE", "/api/recipes/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "POST", "/api/checked/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_delete_recipe() {
        let app = test_app(None);
        let id = create(&app, pasta()).await;

        let (status, json) = call(
            &app,
            "PUT",
            &format!("/api/recipes/{id}"),
            Some(json!({"title": "Spaghetti aglio e olio", "servings": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["title"], "Spaghetti aglio e olio");
        assert_eq!(json["data"]["servings"], 2);
        assert_eq!(json["data"]["ingredients"].as_array().unwrap().len(), 3);

        let (status, _) = call(&app, "PUT", &format!("/api/recipes/{id}"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = call(
            &app,
            "PUT",
            &format!("/api/recipes/{id}"),
            Some(json!({"ingredients": [{"name": "  "}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "All ingredients must have a name");

        let (status, json) = call(&app, "DELETE", &format!("/api/recipes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Recipe deleted successfully");
    }

    #[tokio::test]
    async fn checking_recipe_builds_shopping_list() {
        let app = test_app(None);
        let id = create(&app, pasta()).await;

        let (status, json) = call(&app, "POST", &format!("/api/checked/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["checked"], true);

        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        let need: Vec<&str> = json["data"]["need_items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["display"].as_str().unwrap())
            .collect();
        let have: Vec<&str> = json["data"]["have_items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["display"].as_str().unwrap())
            .collect();
        assert_eq!(need, vec!["spaghetti (16 oz)", "garlic"]);
        assert_eq!(have, vec!["olive oil"]);

        let (_, json) = call(&app, "POST", &format!("/api/checked/{id}"), None).await;
        assert_eq!(json["data"]["checked"], false);
        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        assert!(json["data"]["need_items"].as_array().unwrap().is_empty());
        assert!(json["data"]["have_items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_moves_item_to_have() {
        let app = test_app(None);
        let id = create(&app, pasta()).await;
        call(&app, "POST", &format!("/api/checked/{id}"), None).await;

        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        let garlic = json["data"]["need_items"][1].clone();
        assert_eq!(garlic["name"], "garlic");

        let (status, json) = call(
            &app,
            "POST",
            "/api/shopping-list/toggle",
            Some(json!({"ingredient_ids": garlic["ingredient_ids"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let have: Vec<&str> = json["data"]["have_items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(have, vec!["garlic", "olive oil"]);

        let (status, _) = call(
            &app,
            "POST",
            "/api/shopping-list/toggle",
            Some(json!({"ingredient_ids": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            "/api/shopping-list/toggle",
            Some(json!({"ingredient_ids": [9999]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        assert_eq!(json["data"]["have_items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn manual_items_lifecycle() {
        let app = test_app(None);

        let (status, json) = call(
            &app,
            "POST",
            "/api/manual-items",
            Some(json!({"name": "  paper towels "})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["name"], "paper towels");
        assert_eq!(json["data"]["have"], false);
        let id = json["data"]["id"].as_str().unwrap().to_string();

        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        assert_eq!(json["data"]["need_items"][0]["kind"], "manual");

        let (status, json) = call(&app, "POST", &format!("/api/manual-items/{id}/toggle"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["have"], true);

        let (_, json) = call(&app, "GET", "/api/shopping-list", None).await;
        assert_eq!(json["data"]["have_items"][0]["display"], "paper towels");

        let (status, _) = call(&app, "DELETE", &format!("/api/manual-items/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", &format!("/api/manual-items/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(&app, "POST", "/api/manual-items", Some(json!({"name": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Item name is required");
    }

    #[tokio::test]
    async fn recipe_order_round_trip() {
        let app = test_app(None);
        let (status, json) = call(
            &app,
            "PUT",
            "/api/recipe-order",
            Some(json!({"order": [3, 1, 2]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], json!([3, 1, 2]));
    }
}

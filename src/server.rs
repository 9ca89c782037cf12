//! HTTP API for shopping lists.
//!
//! Every `/shopping` route requires `Authorization: Bearer <jwt>`; the
//! token's tenant scopes every lookup, so ids from another tenant read as
//! not found.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`/`POST` | `/shopping/lists` | List summaries / create a list |
//! | `GET`  | `/shopping/lists/{id}` | One list with visible items |
//! | `GET`  | `/shopping/default` | The default list, created if missing |
//! | `POST` | `/shopping/lists/{id}/items` | Add an item (merge / prompt / create) |
//! | `PUT`/`DELETE` | `/shopping/lists/{id}/items/{item}` | Edit / delete an item |
//! | `POST` | `/shopping/lists/{id}/items/{item}/toggle` | Check or uncheck |
//! | `POST` | `/shopping/lists/{id}/complete` | Check everything off |
//! | `GET`  | `/shopping/suggestions` | Item names for autocomplete |
//! | `GET`  | `/shopping/categories` | Built-in category names |
//! | `GET`  | `/shopping/units` | Common units |
//! | `GET`  | `/shopping/categories/full` | The tenant's categories |
//! | `POST` | `/shopping/categories` | Create a category |
//! | `PUT`  | `/shopping/categories/reorder` | Reorder categories |
//! | `PUT`/`DELETE` | `/shopping/categories/{id}` | Edit / delete a category |
//! | `POST` | `/shopping/categories/{id}/keywords` | Add a keyword |
//! | `DELETE` | `/shopping/categories/{id}/keywords/{keyword}` | Remove a keyword |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "shopping list 7c0e... not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `conflict` (409), `internal` (500).

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use hearth_core::categories::{CategoryDraft, CategoryPatch};
use hearth_core::defaults::{default_category_names, COMMON_UNITS};
use hearth_core::items::ItemPatch;
use hearth_core::lists::{ListView, DEFAULT_LIST_NAME};
use hearth_core::models::{ListSummary, ShoppingCategory, ShoppingItem};
use hearth_core::reconcile::{AddItemRequest, AddOutcome};
use hearth_core::ShoppingError;

use crate::auth::{AuthError, JwtVerifier, Principal};
use crate::config::Config;
use crate::shopping::ShoppingService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ShoppingService>,
    pub auth: Arc<JwtVerifier>,
}

impl AppState {
    fn principal(&self, headers: &HeaderMap) -> Result<Principal, AppError> {
        Ok(self.auth.authenticate(headers)?)
    }
}

/// Opens the database, runs migrations, and serves until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(ShoppingService::open(config).await?),
        auth: Arc::new(JwtVerifier::new(&config.auth.jwt_secret)),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "hearth listening");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let shopping = Router::new()
        .route("/lists", get(handle_lists).post(handle_create_list))
        .route("/lists/{list_id}", get(handle_list_view))
        .route("/default", get(handle_default_view))
        .route("/lists/{list_id}/items", post(handle_add_item))
        .route(
            "/lists/{list_id}/items/{item_id}",
            put(handle_update_item).delete(handle_delete_item),
        )
        .route(
            "/lists/{list_id}/items/{item_id}/toggle",
            post(handle_toggle_item),
        )
        .route("/lists/{list_id}/complete", post(handle_complete_shop))
        .route("/suggestions", get(handle_suggestions))
        .route(
            "/categories",
            get(handle_category_names).post(handle_create_category),
        )
        .route("/categories/full", get(handle_categories_full))
        .route("/categories/reorder", put(handle_reorder_categories))
        .route(
            "/categories/{category_id}",
            put(handle_update_category).delete(handle_delete_category),
        )
        .route("/categories/{category_id}/keywords", post(handle_add_keyword))
        .route(
            "/categories/{category_id}/keywords/{keyword}",
            delete(handle_remove_keyword),
        )
        .route("/units", get(handle_units));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/shopping", shopping)
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<ShoppingError> for AppError {
    fn from(err: ShoppingError) -> Self {
        match err {
            ShoppingError::Validation(msg) => bad_request(msg),
            ShoppingError::NotFound(what) => {
                app_error(StatusCode::NOT_FOUND, "not_found", format!("{} not found", what))
            }
            ShoppingError::Conflict(msg) => app_error(StatusCode::CONFLICT, "conflict", msg),
            ShoppingError::Store(err) => {
                error!(error = ?err, "store failure");
                app_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error",
                )
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        app_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
    }
}

/// Unwraps path parameters, reporting malformed ids as `bad_request`.
fn path_params<T>(params: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    params
        .map(|Path(value)| value)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

/// Unwraps a JSON body, turning extractor rejections into `bad_request`.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Lists ============

#[derive(Deserialize)]
struct CreateListRequest {
    #[serde(default = "default_list_name")]
    name: String,
    #[serde(default)]
    is_default: bool,
}

fn default_list_name() -> String {
    DEFAULT_LIST_NAME.to_string()
}

async fn handle_lists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ListSummary>>, AppError> {
    let principal = state.principal(&headers)?;
    Ok(Json(state.service.lists(principal.tenant_id).await?))
}

async fn handle_create_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateListRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ListSummary>), AppError> {
    let principal = state.principal(&headers)?;
    let req = body(payload)?;
    let list = state
        .service
        .create_list(principal.tenant_id, &req.name, req.is_default)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ListSummary {
            id: list.id,
            name: list.name,
            is_default: list.is_default,
            item_count: 0,
            checked_count: 0,
            updated_at: list.updated_at,
        }),
    ))
}

async fn handle_list_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ListView>, AppError> {
    let principal = state.principal(&headers)?;
    let list_id = path_params(params)?;
    Ok(Json(
        state.service.list_view(principal.tenant_id, list_id).await?,
    ))
}

async fn handle_default_view(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListView>, AppError> {
    let principal = state.principal(&headers)?;
    Ok(Json(state.service.default_view(principal.tenant_id).await?))
}

// ============ Items ============

#[derive(Serialize)]
struct RecentlyCompleted {
    id: Uuid,
    name: String,
    checked_at: Option<DateTime<Utc>>,
    hours_ago: f64,
}

#[derive(Serialize)]
struct AddItemResponse {
    item: Option<ShoppingItem>,
    merged: bool,
    previous_quantity: Option<Decimal>,
    duplicate_detected: bool,
    recently_completed: Option<RecentlyCompleted>,
}

impl From<AddOutcome> for AddItemResponse {
    fn from(outcome: AddOutcome) -> Self {
        match outcome {
            AddOutcome::Merged {
                item,
                previous_quantity,
            } => Self {
                item: Some(item),
                merged: true,
                previous_quantity: Some(previous_quantity),
                duplicate_detected: false,
                recently_completed: None,
            },
            AddOutcome::Created { item } => Self {
                item: Some(item),
                merged: false,
                previous_quantity: None,
                duplicate_detected: false,
                recently_completed: None,
            },
            AddOutcome::DuplicatePrompt {
                existing,
                hours_since_checked,
            } => Self {
                item: None,
                merged: false,
                previous_quantity: None,
                duplicate_detected: true,
                recently_completed: Some(RecentlyCompleted {
                    id: existing.id,
                    name: existing.name,
                    checked_at: existing.checked_at,
                    hours_ago: hours_since_checked,
                }),
            },
        }
    }
}

async fn handle_add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<AddItemResponse>, AppError> {
    let principal = state.principal(&headers)?;
    let list_id = path_params(params)?;
    let mut req = body(payload)?;
    req.added_by = Some(principal.user_id);
    let outcome = state
        .service
        .add_item(principal.tenant_id, list_id, req)
        .await?;
    Ok(Json(outcome.into()))
}

async fn handle_update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<(Uuid, Uuid)>, PathRejection>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> Result<Json<ShoppingItem>, AppError> {
    let principal = state.principal(&headers)?;
    let (list_id, item_id) = path_params(params)?;
    let patch = body(payload)?;
    let item = state
        .service
        .update_item(principal.tenant_id, list_id, item_id, patch)
        .await?;
    Ok(Json(item))
}

async fn handle_delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let principal = state.principal(&headers)?;
    let (list_id, item_id) = path_params(params)?;
    state
        .service
        .delete_item(principal.tenant_id, list_id, item_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Item deleted".to_string(),
    }))
}

#[derive(Serialize)]
struct ToggleResponse {
    id: Uuid,
    checked: bool,
    checked_at: Option<DateTime<Utc>>,
}

async fn handle_toggle_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<ToggleResponse>, AppError> {
    let principal = state.principal(&headers)?;
    let (list_id, item_id) = path_params(params)?;
    let item = state
        .service
        .toggle_item(principal.tenant_id, list_id, item_id)
        .await?;
    Ok(Json(ToggleResponse {
        id: item.id,
        checked: item.checked,
        checked_at: item.checked_at,
    }))
}

#[derive(Serialize)]
struct CompleteShopResponse {
    message: String,
    items_completed: u64,
    items_remaining: u64,
}

async fn handle_complete_shop(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CompleteShopResponse>, AppError> {
    let principal = state.principal(&headers)?;
    let list_id = path_params(params)?;
    let summary = state
        .service
        .complete_shop(principal.tenant_id, list_id)
        .await?;
    let message = if summary.completed > 0 {
        "Shopping complete"
    } else {
        "All items already checked"
    };
    Ok(Json(CompleteShopResponse {
        message: message.to_string(),
        items_completed: summary.completed,
        items_remaining: summary.remaining,
    }))
}

// ============ Metadata ============

async fn handle_suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, AppError> {
    let principal = state.principal(&headers)?;
    Ok(Json(state.service.suggestions(principal.tenant_id).await?))
}

async fn handle_category_names(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<&'static str>>, AppError> {
    state.principal(&headers)?;
    Ok(Json(default_category_names()))
}

async fn handle_units(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<&'static [&'static str]>, AppError> {
    state.principal(&headers)?;
    Ok(Json(COMMON_UNITS))
}

// ============ Categories ============

async fn handle_categories_full(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ShoppingCategory>>, AppError> {
    let principal = state.principal(&headers)?;
    Ok(Json(state.service.categories(principal.tenant_id).await?))
}

async fn handle_create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CategoryDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ShoppingCategory>), AppError> {
    let principal = state.principal(&headers)?;
    let draft = body(payload)?;
    let category = state
        .service
        .create_category(principal.tenant_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn handle_update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CategoryPatch>, JsonRejection>,
) -> Result<Json<ShoppingCategory>, AppError> {
    let principal = state.principal(&headers)?;
    let category_id = path_params(params)?;
    let patch = body(payload)?;
    let category = state
        .service
        .update_category(principal.tenant_id, category_id, patch)
        .await?;
    Ok(Json(category))
}

async fn handle_delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let principal = state.principal(&headers)?;
    let category_id = path_params(params)?;
    let (name, _moved) = state
        .service
        .delete_category(principal.tenant_id, category_id)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("Category '{}' deleted. Items moved to 'Other'.", name),
    }))
}

#[derive(Deserialize)]
struct ReorderRequest {
    category_ids: Vec<Uuid>,
}

async fn handle_reorder_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Json<Vec<ShoppingCategory>>, AppError> {
    let principal = state.principal(&headers)?;
    let req = body(payload)?;
    let categories = state
        .service
        .reorder_categories(principal.tenant_id, &req.category_ids)
        .await?;
    Ok(Json(categories))
}

#[derive(Deserialize)]
struct KeywordRequest {
    keyword: String,
}

async fn handle_add_keyword(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<KeywordRequest>, JsonRejection>,
) -> Result<Json<ShoppingCategory>, AppError> {
    let principal = state.principal(&headers)?;
    let category_id = path_params(params)?;
    let req = body(payload)?;
    let category = state
        .service
        .add_keyword(principal.tenant_id, category_id, &req.keyword)
        .await?;
    Ok(Json(category))
}

async fn handle_remove_keyword(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Path<(Uuid, String)>, PathRejection>,
) -> Result<Json<ShoppingCategory>, AppError> {
    let principal = state.principal(&headers)?;
    let (category_id, keyword) = path_params(params)?;
    let category = state
        .service
        .remove_keyword(principal.tenant_id, category_id, &keyword)
        .await?;
    Ok(Json(category))
}

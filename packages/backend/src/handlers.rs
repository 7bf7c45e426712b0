//! HTTP handlers and router assembly.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, CurrentAdvisor};
use crate::catalog;
use crate::error::BackendError;
use crate::farms::{self, FarmPayload};
use crate::plans::{self, PlanPayload, PlanUpdatePayload};
use crate::state::AppState;

/// Error wrapper mapping [`BackendError`] to an HTTP response.
///
/// Client-caused failures carry their message; everything else is logged
/// and answered with an opaque 500.
pub struct ApiError(BackendError);

impl<E: Into<BackendError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BackendError::FarmNotFound(_) | BackendError::PlanNotFound(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            BackendError::FarmNotOwned(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            BackendError::ProductNotFound(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            BackendError::ProductInUse(_) => (StatusCode::CONFLICT, self.0.to_string()),
            BackendError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            _ => {
                tracing::error!(error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok("OK")
}

// --- Farms ---

async fn list_farms(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
) -> ApiResult<impl IntoResponse> {
    let farms = farms::list_farms(&state.pool, advisor.id).await?;
    Ok(Json(farms))
}

async fn create_farm(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Json(payload): Json<FarmPayload>,
) -> ApiResult<impl IntoResponse> {
    let farm = farms::create_farm(&state.pool, advisor.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(farm)))
}

async fn get_farm(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let farm = farms::get_farm(&state.pool, advisor.id, id).await?;
    Ok(Json(farm))
}

async fn update_farm(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
    Json(payload): Json<FarmPayload>,
) -> ApiResult<impl IntoResponse> {
    let farm = farms::update_farm(&state.pool, advisor.id, id, &payload).await?;
    Ok(Json(farm))
}

async fn delete_farm(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    farms::delete_farm(&state.pool, advisor.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Plans ---

async fn list_plans(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
) -> ApiResult<impl IntoResponse> {
    let plans = plans::list_plans(&state.pool, advisor.id).await?;
    Ok(Json(plans))
}

async fn create_plan(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Json(payload): Json<PlanPayload>,
) -> ApiResult<impl IntoResponse> {
    let plan = plans::create_plan(&state.pool, advisor.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn get_plan(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let plan = plans::get_plan(&state.pool, advisor.id, id).await?;
    Ok(Json(plan))
}

async fn update_plan(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
    Json(payload): Json<PlanUpdatePayload>,
) -> ApiResult<impl IntoResponse> {
    let plan = plans::update_plan(&state.pool, advisor.id, id, &payload).await?;
    Ok(Json(plan))
}

async fn delete_plan(
    State(state): State<AppState>,
    Extension(advisor): Extension<CurrentAdvisor>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    plans::delete_plan(&state.pool, advisor.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Catalog ---

#[derive(Deserialize)]
struct ProductsQuery {
    crop: Option<i64>,
}

#[derive(Deserialize)]
struct PestsQuery {
    crop: Option<i64>,
    product: Option<i64>,
}

#[derive(Deserialize)]
struct ApprovalsQuery {
    crop: Option<i64>,
    product: Option<i64>,
    pest: Option<i64>,
}

async fn list_crops(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let crops = catalog::list_crops(&state.pool).await?;
    Ok(Json(crops))
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductsQuery>,
) -> ApiResult<impl IntoResponse> {
    let products = catalog::list_products(&state.pool, params.crop).await?;
    Ok(Json(products))
}

async fn list_pests(
    State(state): State<AppState>,
    Query(params): Query<PestsQuery>,
) -> ApiResult<impl IntoResponse> {
    let pests = catalog::list_pests(&state.pool, params.crop, params.product).await?;
    Ok(Json(pests))
}

async fn list_approvals(
    State(state): State<AppState>,
    Query(params): Query<ApprovalsQuery>,
) -> ApiResult<impl IntoResponse> {
    let approvals =
        catalog::list_approvals(&state.pool, params.crop, params.product, params.pest).await?;
    Ok(Json(approvals))
}

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/farms", get(list_farms).post(create_farm))
        .route(
            "/api/farms/{id}",
            get(get_farm).put(update_farm).delete(delete_farm),
        )
        .route("/api/plans", get(list_plans).post(create_plan))
        .route(
            "/api/plans/{id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route("/api/crops", get(list_crops))
        .route("/api/products", get(list_products))
        .route("/api/pests", get(list_pests))
        .route("/api/approvals", get(list_approvals))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// Quotable - HTTP adapter
// REST API with Axum over the query service

use crate::error::QueryError;
use crate::model::{Author, Quote};
use crate::query::{ListQuotesParams, PageParams, RandomQuotesParams};
use crate::service::{Page, QuoteQueryService, RandomQuotes, TagList};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: QuoteQueryService,
}

/// Errors become `{"error": ...}`; store failures never leak their cause
impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            QueryError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            QueryError::Upstream(e) => {
                error!("Store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, QueryError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| QueryError::validation(rejection.body_text()))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /quotes - Filtered, sorted, paginated listing
async fn list_quotes(
    State(state): State<AppState>,
    query: Result<Query<ListQuotesParams>, QueryRejection>,
) -> Result<Json<Page<Quote>>, QueryError> {
    let (filter, pagination, sort) = query_params(query)?.validate()?;
    let page = state.service.list_quotes(&filter, pagination, sort)?;
    Ok(Json(page))
}

/// GET /quotes/random - One quote or a list of random draws
async fn random_quotes(
    State(state): State<AppState>,
    query: Result<Query<RandomQuotesParams>, QueryRejection>,
) -> Result<Json<RandomQuotes>, QueryError> {
    let (filter, limit) = query_params(query)?.validate()?;
    let quotes = state.service.get_random_quotes(&filter, limit)?;
    Ok(Json(quotes))
}

/// GET /quotes/:id
async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, QueryError> {
    Ok(Json(state.service.get_quote_by_id(&id)?))
}

/// GET /tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagList>, QueryError> {
    Ok(Json(state.service.list_tags()?))
}

/// GET /authors
async fn list_authors(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Author>>, QueryError> {
    let pagination = query_params(query)?.validate()?;
    Ok(Json(state.service.list_authors(pagination)?))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

// ============================================================================
// Router
// ============================================================================

pub fn router(service: QuoteQueryService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(health_check))
        .route("/quotes", get(list_quotes))
        .route("/quotes/random", get(random_quotes))
        .route("/random", get(random_quotes))
        .route("/quotes/:id", get(get_quote))
        .route("/tags", get(list_tags))
        .route("/authors", get(list_authors))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

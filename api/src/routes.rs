use std::sync::Arc;

use application::{
    CreatePostRequest, ListPostsQuery, PostService, SearchPostsQuery, StatsService,
};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header, request::Parts},
    middleware::map_response,
    response::IntoResponse,
    routing::{get, put},
};
use domain::{PostId, PostPatch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::{ApiError, json_method_not_allowed, route_not_found};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub post_service: Arc<PostService>,
    pub stats_service: Arc<StatsService>,
}

/// Builds the full router: post routes at the root and under `/api`,
/// operational routes, JSON error formatting, tracing and permissive CORS.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats_handler))
        .merge(post_routes())
        .nest("/api", post_routes())
        .fallback(route_not_found)
        .with_state(state)
        .layer(map_response(json_method_not_allowed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts_handler).post(create_post_handler))
        .route("/posts/search", get(search_posts_handler))
        .route(
            "/posts/:id",
            put(update_post_handler)
                .delete(delete_post_handler)
                .fallback(post_id_method_not_allowed),
        )
}

// --- Extractors ---

/// JSON body whose rejections become `400 {"error": ...}`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string whose rejections become `400 {"error": ...}`.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Post id path segment. A segment that is not an unsigned integer does not
/// match the route, so it is reported as an unmatched route.
pub struct PostIdPath(pub PostId);

#[async_trait]
impl<S> FromRequestParts<S> for PostIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<u64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::RouteNotFound)?;
        Ok(Self(PostId::new(id)))
    }
}

// --- API Handlers ---

/// Other methods on `/posts/:id`. The id is parsed first so a non-integer
/// segment is still an unmatched route.
async fn post_id_method_not_allowed(PostIdPath(_): PostIdPath) -> impl IntoResponse {
    ([(header::ALLOW, "PUT,DELETE")], ApiError::MethodNotAllowed)
}

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

async fn get_stats_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    info!("Received request to get statistics");
    let stats = state.stats_service.get_stats().await.inspect_err(|e| {
        error!("Failed to get statistics via handler: {}", e);
    })?;
    Ok(Json(stats))
}

/// Handler for listing posts (GET /posts?sort=..&direction=..).
async fn list_posts_handler(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListPostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(sort = ?query.sort, direction = ?query.direction, "Received request to list posts");
    let posts = state.post_service.list_posts(&query).await?;
    Ok(Json(posts))
}

/// Handler for creating a post (POST /posts). Responds with every post.
async fn create_post_handler(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received request to create post");
    let posts = state.post_service.create_post(payload).await?;
    Ok((StatusCode::CREATED, Json(posts)))
}

/// Handler for deleting a post (DELETE /posts/:id).
async fn delete_post_handler(
    State(state): State<AppState>,
    PostIdPath(id): PostIdPath,
) -> Result<impl IntoResponse, ApiError> {
    info!(post_id = %id, "Received request to delete post");
    let message = state.post_service.delete_post(id).await?;
    Ok(Json(message))
}

/// Handler for updating a post (PUT /posts/:id).
async fn update_post_handler(
    State(state): State<AppState>,
    PostIdPath(id): PostIdPath,
    body: Result<JsonBody<PostPatch>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    info!(post_id = %id, "Received request to update post");
    // An unknown id wins over a bad body.
    state.post_service.get_post(id).await?;
    let JsonBody(patch) = body?;
    let message = state.post_service.update_post(id, patch).await?;
    Ok(Json(message))
}

/// Handler for searching posts by exact title (GET /posts/search?title=..).
async fn search_posts_handler(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchPostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(title = ?query.title, "Received search request");
    let posts = state.post_service.search_posts(&query).await?;
    Ok(Json(posts))
}

use super::{ApiError, ApiResult, AppState, PageParams};
use crate::posts::{CreatePostInput, PostPage, PostService, PostView};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

pub(crate) async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let service = PostService::new(state.database.clone());
    let post = service.create(payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<PostView> {
    let service = PostService::new(state.database.clone());
    Ok(Json(service.get(&post_id)?))
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<PostPage> {
    let service = PostService::new(state.database.clone());
    let page = service.list(params.limit_or(20), params.skip())?;
    Ok(Json(page))
}

use super::{ApiError, ApiResult, AppState, PageParams};
use crate::users::{CreateUserInput, UserPage, UserService, UserView};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

pub(crate) async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let service = UserService::new(state.database.clone());
    let user = service.create(payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<UserView> {
    let service = UserService::new(state.database.clone());
    Ok(Json(service.get(&user_id)?))
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<UserPage> {
    let service = UserService::new(state.database.clone());
    let page = service.list(params.limit_or(50), params.skip())?;
    Ok(Json(page))
}

use super::{ApiError, ApiResult, AppState, PageParams};
use crate::contacts::{
    ActivityEntry, ContactCounts, ContactPage, ContactService, ContactView, SuggestedUser,
};
use crate::users::UserSummary;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FollowPayload {
    follower_id: String,
    followee_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FollowCheckResponse {
    is_following: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitParams {
    #[serde(default)]
    limit: Option<usize>,
}

pub(crate) async fn follow_user(
    State(state): State<AppState>,
    Json(payload): Json<FollowPayload>,
) -> Result<(StatusCode, Json<ContactView>), ApiError> {
    let service = ContactService::new(state.database.clone());
    let view = service.follow(&payload.follower_id, &payload.followee_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn unfollow_user(
    State(state): State<AppState>,
    Json(payload): Json<FollowPayload>,
) -> Result<StatusCode, ApiError> {
    let service = ContactService::new(state.database.clone());
    service.unfollow(&payload.follower_id, &payload.followee_id)?;
    Ok(StatusCode::OK)
}

pub(crate) async fn check_following(
    State(state): State<AppState>,
    Path((follower_id, followee_id)): Path<(String, String)>,
) -> ApiResult<FollowCheckResponse> {
    let service = ContactService::new(state.database.clone());
    let is_following = service.is_following(&follower_id, &followee_id)?;
    Ok(Json(FollowCheckResponse { is_following }))
}

pub(crate) async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ContactPage> {
    let service = ContactService::new(state.database.clone());
    let page = service.followers(&user_id, params.limit_or(50), params.skip())?;
    Ok(Json(page))
}

pub(crate) async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ContactPage> {
    let service = ContactService::new(state.database.clone());
    let page = service.following(&user_id, params.limit_or(50), params.skip())?;
    Ok(Json(page))
}

pub(crate) async fn get_counts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ContactCounts> {
    let service = ContactService::new(state.database.clone());
    Ok(Json(service.counts(&user_id)?))
}

pub(crate) async fn get_mutual_follows(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<UserSummary>> {
    let service = ContactService::new(state.database.clone());
    Ok(Json(service.mutual_follows(&user_id)?))
}

pub(crate) async fn get_suggestions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<SuggestedUser>> {
    let service = ContactService::new(state.database.clone());
    let limit = params.limit.unwrap_or(10).min(100);
    Ok(Json(service.suggestions(&user_id, limit)?))
}

pub(crate) async fn get_recent_activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<ActivityEntry>> {
    let service = ContactService::new(state.database.clone());
    let limit = params.limit.unwrap_or(20).min(100);
    Ok(Json(service.recent_activity(&user_id, limit)?))
}

pub(crate) async fn remove_follower(
    State(state): State<AppState>,
    Path((user_id, follower_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let service = ContactService::new(state.database.clone());
    service.remove_follower(&user_id, &follower_id)?;
    Ok(StatusCode::OK)
}

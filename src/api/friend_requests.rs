use super::{ApiError, ApiResult, AppState, PageParams};
use crate::friend_requests::{
    FriendRequestPage, FriendRequestService, FriendRequestStats, FriendRequestView, RequestStatus,
    SendFriendRequestInput,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActorPayload {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CancelParams {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceivedParams {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
}

pub(crate) async fn send_request(
    State(state): State<AppState>,
    Json(payload): Json<SendFriendRequestInput>,
) -> Result<(StatusCode, Json<FriendRequestView>), ApiError> {
    let service = FriendRequestService::new(state.database.clone());
    let request = service.send(payload)?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub(crate) async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<FriendRequestView> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.get(&request_id)?))
}

pub(crate) async fn pending_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Vec<FriendRequestView>> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.pending_for_post(&post_id)?))
}

pub(crate) async fn sent_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<FriendRequestView>> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.sent_by(&user_id)?))
}

pub(crate) async fn received_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ReceivedParams>,
) -> ApiResult<FriendRequestPage> {
    let service = FriendRequestService::new(state.database.clone());
    let status = params
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()?;
    let limit = params.limit.unwrap_or(20).min(200);
    let skip = params.skip.unwrap_or(0);
    Ok(Json(service.received_by(&user_id, status, limit, skip)?))
}

pub(crate) async fn request_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<FriendRequestStats> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.stats(&user_id)?))
}

pub(crate) async fn by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<FriendRequestPage> {
    let service = FriendRequestService::new(state.database.clone());
    let status: RequestStatus = status.parse()?;
    let page = service.list_by_status(status, params.limit_or(50), params.skip())?;
    Ok(Json(page))
}

pub(crate) async fn accept_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> ApiResult<FriendRequestView> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.accept(&request_id, &payload.user_id)?))
}

pub(crate) async fn reject_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(payload): Json<ActorPayload>,
) -> ApiResult<FriendRequestView> {
    let service = FriendRequestService::new(state.database.clone());
    Ok(Json(service.reject(&request_id, &payload.user_id)?))
}

pub(crate) async fn cancel_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(params): Query<CancelParams>,
) -> Result<StatusCode, ApiError> {
    let Some(user_id) = params.user_id else {
        return Err(ApiError::BadRequest(
            "userId query parameter is required".into(),
        ));
    };
    let service = FriendRequestService::new(state.database.clone());
    service.cancel(&request_id, &user_id)?;
    Ok(StatusCode::OK)
}

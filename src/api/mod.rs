mod contacts;
mod friend_requests;
mod posts;
mod users;

use crate::config::LedgerfeedConfig;
use crate::database::Database;
use crate::error::DomainError;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: LedgerfeedConfig,
    pub database: Database,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse { message: msg }),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse { message: msg }),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::BadRequest(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::InvalidState(msg) => ApiError::Conflict(msg),
            DomainError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
}

impl PageParams {
    pub(crate) fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(200)
    }

    pub(crate) fn skip(&self) -> usize {
        self.skip.unwrap_or(0)
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
}

pub(crate) async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/:id", get(posts::get_post))
        .route("/contacts/follow", post(contacts::follow_user))
        .route("/contacts/unfollow", delete(contacts::unfollow_user))
        .route(
            "/contacts/check/:follower_id/:followee_id",
            get(contacts::check_following),
        )
        .route("/contacts/:user_id/followers", get(contacts::get_followers))
        .route("/contacts/:user_id/following", get(contacts::get_following))
        .route("/contacts/:user_id/counts", get(contacts::get_counts))
        .route("/contacts/:user_id/mutual", get(contacts::get_mutual_follows))
        .route(
            "/contacts/:user_id/suggestions",
            get(contacts::get_suggestions),
        )
        .route(
            "/contacts/:user_id/activity",
            get(contacts::get_recent_activity),
        )
        .route(
            "/contacts/:user_id/followers/:follower_id",
            delete(contacts::remove_follower),
        )
        .route("/friend-requests", post(friend_requests::send_request))
        .route(
            "/friend-requests/post/:post_id",
            get(friend_requests::pending_for_post),
        )
        .route(
            "/friend-requests/sent/:user_id",
            get(friend_requests::sent_by_user),
        )
        .route(
            "/friend-requests/received/:user_id",
            get(friend_requests::received_by_user),
        )
        .route(
            "/friend-requests/stats/:user_id",
            get(friend_requests::request_stats),
        )
        .route(
            "/friend-requests/status/:status",
            get(friend_requests::by_status),
        )
        .route(
            "/friend-requests/:id",
            get(friend_requests::get_request).delete(friend_requests::cancel_request),
        )
        .route(
            "/friend-requests/:id/accept",
            patch(friend_requests::accept_request),
        )
        .route(
            "/friend-requests/:id/reject",
            patch(friend_requests::reject_request),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(config: LedgerfeedConfig, database: Database) -> Result<()> {
    let state = AppState {
        config: config.clone(),
        database,
    };
    let router = router(state);

    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

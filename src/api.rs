//! HTTP API for the ticket service.
//!
//! Public routes file and track tickets. Staff routes (listing, full records,
//! updates, deletion) sit behind a shared secret sent as `x-admin-secret`, or
//! as the `admin` query parameter for quick manual testing.

use crate::config::ServerConfig;
use crate::protocol::{
    HealthResponse, IdQuery, ListQuery, ListResponse, MessageResponse, SubmitResponse, TicketResponse,
    TrackResponse, UpdateRequest,
};
use crate::service::TicketService;
use crate::store::StoreError;
use crate::types::NewTicket;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::CorsLayer;

/// Header carrying the admin secret.
pub const ADMIN_HEADER: &str = "x-admin-secret";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: TicketService,
    admin_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: TicketService, admin_secret: Option<String>) -> Self {
        Self {
            service,
            admin_secret: admin_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }
}

/// An error rendered as `{success: false, message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<eyre::Report> for ApiError {
    fn from(err: eyre::Report) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::TicketNotFound(_)) => Self::new(StatusCode::NOT_FOUND, "Ticket not found"),
            Some(StoreError::Validation(e)) => Self::bad_request(e.to_string()),
            _ => {
                log::error!("Request failed: {:#}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        }
    }
}

/// Any body the handlers cannot read is answered with 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        log::debug!("Rejected request body ({}): {}", rejection.status(), rejection.body_text());
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageResponse::error(self.message))).into_response()
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let staff = Router::new()
        .route("/tickets", get(list_tickets))
        .route("/ticket", get(get_ticket).delete(delete_ticket))
        .route("/update-ticket", post(update_ticket))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate));

    Router::new()
        .route("/", get(health))
        .route("/submit-ticket", post(submit_ticket))
        .route("/track", get(track_ticket))
        .merge(staff)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let service = TicketService::from_config(&config)?;
    if config.admin_secret.is_none() {
        log::warn!("ADMIN_SECRET is not set; staff routes will refuse every request");
    }

    let app = router(AppState::new(service.clone(), config.admin_secret.clone()));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    log::info!(
        "Helpdesk listening on {} (store: {})",
        config.bind,
        config.data_file.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    service.flush_notifications().await;
    log::info!("Helpdesk shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[derive(Deserialize)]
struct AdminQuery {
    admin: Option<String>,
}

async fn admin_gate(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_secret.as_deref() else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Admin secret not configured",
        ));
    };

    let supplied = headers
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or(query.admin.as_deref())
        .unwrap_or_default();

    if !secret_matches(supplied, expected) {
        log::debug!("Rejected staff request to {}", request.uri().path());
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison; an empty secret never matches.
fn secret_matches(supplied: &str, expected: &str) -> bool {
    !supplied.is_empty() && supplied.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() == 1
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active",
        message: "IT support backend running",
    })
}

async fn submit_ticket(
    State(state): State<AppState>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(input) = payload?;
    let ticket = state.service.submit(input).await?;
    Ok(Json(SubmitResponse::from(&ticket)))
}

async fn track_ticket(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<TrackResponse>, ApiError> {
    let id = query.id().ok_or_else(|| ApiError::bad_request("Missing ticket ID"))?;
    let ticket = state.service.track(id).await?;
    Ok(Json(TrackResponse { success: true, ticket }))
}

async fn get_ticket(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<TicketResponse>, ApiError> {
    let id = query.id().ok_or_else(|| ApiError::bad_request("Missing ticket ID"))?;
    let ticket = state.service.get_full(id).await?;
    Ok(Json(TicketResponse {
        success: true,
        message: None,
        ticket: ticket.into(),
    }))
}

async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let page = state.service.list(query.into_filter()).await?;
    Ok(Json(page.into()))
}

async fn update_ticket(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    let Json(body) = payload?;
    let request = UpdateRequest::from_value(body).map_err(ApiError::bad_request)?;
    let ticket = state.service.apply_update(&request.id, request.update).await?;
    Ok(Json(TicketResponse {
        success: true,
        message: Some("Ticket updated"),
        ticket: ticket.into(),
    }))
}

async fn delete_ticket(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = query.id().ok_or_else(|| ApiError::bad_request("Missing ticket ID"))?;
    let ticket = state.service.delete(id).await?;
    Ok(Json(MessageResponse::ok(format!("Ticket {} deleted", ticket.id))))
}

//! HTTP request handlers

use super::AppState;
use crate::assistants::{AssistantsError, AssistantsErrorKind};
use crate::wire::{
    CreateMessageRequest, CreateRunRequest, Envelope, ListMessagesRequest, MessageListResponse,
    MessageResponse, RetrieveRunRequest, RunResponse, ThreadResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

type Reply<T> = (StatusCode, Json<T>);

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/thread/create", post(create_thread))
        .route("/api/message/list", post(list_messages))
        .route("/api/message/create", post(create_message))
        .route("/api/run/create", post(create_run))
        .route("/api/run/retrieve", post(retrieve_run))
        .route("/version", get(get_version))
        .with_state(state)
}

fn ok<T: Envelope>(status: StatusCode, payload: T::Payload) -> Reply<T> {
    (status, Json(T::ok(payload)))
}

fn rejected<T: Envelope>(cause: &str) -> Reply<T> {
    (StatusCode::BAD_REQUEST, Json(T::failure(cause)))
}

/// Map a provider failure onto a status and a short client-facing cause.
/// The provider's own message only goes to the log.
fn upstream_failure<T: Envelope>(operation: &str, cause: &str, err: &AssistantsError) -> Reply<T> {
    tracing::error!(operation, error = %err, kind = ?err.kind, "Provider call failed");
    let status = match err.kind {
        AssistantsErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        AssistantsErrorKind::NotFound => StatusCode::NOT_FOUND,
        AssistantsErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        AssistantsErrorKind::Auth | AssistantsErrorKind::Network => StatusCode::BAD_GATEWAY,
        AssistantsErrorKind::ServerError | AssistantsErrorKind::Unknown => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(T::failure(cause)))
}

// ============================================================
// Threads
// ============================================================

async fn create_thread(State(state): State<AppState>) -> Reply<ThreadResponse> {
    match state.assistants.create_thread().await {
        Ok(thread) => {
            tracing::info!(thread_id = %thread.id, "Created thread");
            ok(StatusCode::OK, thread.id)
        }
        Err(e) => upstream_failure("create_thread", "Error creating thread", &e),
    }
}

// ============================================================
// Messages
// ============================================================

async fn list_messages(
    State(state): State<AppState>,
    Json(req): Json<ListMessagesRequest>,
) -> Reply<MessageListResponse> {
    if req.thread_id.is_empty() {
        return rejected("ThreadID is missing");
    }

    match state.assistants.list_messages(&req.thread_id).await {
        Ok(messages) => ok(StatusCode::OK, messages),
        Err(e) => upstream_failure("list_messages", "Failed to list messages", &e),
    }
}

async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Reply<MessageResponse> {
    if req.message.is_empty() || req.thread_id.is_empty() {
        return rejected("ThreadID or Message is missing");
    }

    let from_user = req.from_user_flag();
    tracing::debug!(thread_id = %req.thread_id, %from_user, "Creating message");

    match state
        .assistants
        .create_message(&req.thread_id, &req.message, &from_user)
        .await
    {
        Ok(message) => ok(StatusCode::CREATED, message),
        Err(e) => upstream_failure("create_message", "Something went wrong", &e),
    }
}

// ============================================================
// Runs
// ============================================================

async fn create_run(
    State(state): State<AppState>,
    Json(req): Json<CreateRunRequest>,
) -> Reply<RunResponse> {
    if req.thread_id.is_empty() || req.assistant_id.is_empty() {
        return rejected("ThreadID or AssistantID is missing");
    }

    match state
        .assistants
        .create_run(&req.thread_id, &req.assistant_id)
        .await
    {
        Ok(run) => {
            tracing::info!(thread_id = %req.thread_id, run_id = %run.id, "Started run");
            ok(StatusCode::OK, run)
        }
        Err(e) => upstream_failure("create_run", "Failed to create run", &e),
    }
}

async fn retrieve_run(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRunRequest>,
) -> Reply<RunResponse> {
    if req.thread_id.is_empty() || req.run_id.is_empty() {
        return rejected("ThreadID or RunID is missing");
    }

    match state
        .assistants
        .retrieve_run(&req.thread_id, &req.run_id)
        .await
    {
        Ok(run) => ok(StatusCode::OK, run),
        Err(e) => upstream_failure("retrieve_run", "Failed to retrieve run", &e),
    }
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use sumika_core::dispatch::TurnDispatcher;
use sumika_core::errors::{ApplicationError, InterfaceError};
use sumika_core::session::{Channel, Language, SessionId, SessionState, UserId};
use sumika_db::repositories::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<TurnDispatcher>,
    pub sessions: Arc<dyn SessionStore>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_thread")]
    pub thread_id: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_channel() -> String {
    "web".to_string()
}

fn default_thread() -> String {
    "default".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
    pub escalation: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    correlation_id: String,
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let correlation_id = match &error {
        InterfaceError::BadRequest { correlation_id, .. }
        | InterfaceError::ServiceUnavailable { correlation_id, .. }
        | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
    };
    (status, Json(ErrorBody { error: error.user_message().to_string(), correlation_id }))
}

fn parse_language(raw: &str) -> Language {
    match raw.trim().to_ascii_lowercase().as_str() {
        "ja" => Language::Ja,
        _ => Language::En,
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    let channel: Channel = match request.channel.parse() {
        Ok(channel) => channel,
        Err(message) => {
            return error_response(InterfaceError::BadRequest {
                message,
                correlation_id,
            })
            .into_response();
        }
    };

    let session_id = SessionId(request.thread_id.clone());
    let mut session = match state.sessions.load(&session_id).await {
        Ok(Some(existing)) => existing,
        Ok(None) => SessionState::new(
            session_id.clone(),
            UserId(request.user_id.clone()),
            channel,
            parse_language(&request.language),
        ),
        Err(load_error) => {
            error!(
                event_name = "chat.session_load_failed",
                correlation_id = %correlation_id,
                thread_id = %request.thread_id,
                error = %load_error,
                "session snapshot load failed"
            );
            return error_response(
                ApplicationError::Persistence(load_error.to_string())
                    .into_interface(correlation_id),
            )
            .into_response();
        }
    };

    let outcome = state.dispatcher.process_turn(&mut session, &request.message).await;

    if let Err(save_error) = state.sessions.save(&session).await {
        error!(
            event_name = "chat.session_save_failed",
            correlation_id = %correlation_id,
            thread_id = %request.thread_id,
            error = %save_error,
            "session snapshot save failed"
        );
        return error_response(
            ApplicationError::Persistence(save_error.to_string()).into_interface(correlation_id),
        )
        .into_response();
    }

    info!(
        event_name = "chat.turn_completed",
        correlation_id = %correlation_id,
        thread_id = %request.thread_id,
        escalation = outcome.escalation_flag,
        turn_count = session.turn_count,
        "turn processed"
    );

    Json(ChatResponse {
        response: outcome.response_text,
        thread_id: request.thread_id,
        escalation: outcome.escalation_flag,
    })
    .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

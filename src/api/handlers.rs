//! HTTP request handlers

use super::types::{ErrorResponse, ExerciseInfo, ExercisesResponse, TokenQuery};
use super::AppState;
use crate::protocol::{ClientMessage, ServerMessage, MALFORMED_MESSAGE};
use crate::runtime::SessionHandle;
use crate::state_machine::Event;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

/// Longest inbound text echoed into the logs
const LOG_SNIPPET_CHARS: usize = 200;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Supervision transport
        .route("/ws/supervision/:exercise_id", get(supervision_socket))
        // Exercise catalogue
        .route("/api/exercises", get(list_exercises))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Supervision WebSocket
// ============================================================

async fn supervision_socket(
    State(state): State<AppState>,
    Path(exercise_id): Path<String>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers)
        .or(query.token.as_deref())
        .ok_or(AppError::Unauthorized)?;

    let user_id = state
        .auth
        .authenticate(token)
        .await
        .map_err(AppError::Internal)?
        .ok_or(AppError::Unauthorized)?;

    let ws = ws.ok_or_else(|| AppError::BadRequest("Expected WebSocket upgrade".to_string()))?;

    tracing::info!(user_id, exercise_id = %exercise_id, "Supervision connection accepted");
    Ok(ws.on_upgrade(move |socket| async move {
        let handle = state.sessions.start_session(user_id, &exercise_id).await;
        run_socket(socket, handle).await;
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Pump frames from the socket into the session and server messages back out
async fn run_socket(socket: WebSocket, handle: SessionHandle) {
    let SessionHandle {
        session_id,
        event_tx,
        mut outbound_rx,
    } = handle;
    let (mut sink, mut stream) = socket.split();

    // Replies produced by the transport itself, not the session
    let (local_tx, mut local_rx) = mpsc::channel::<ServerMessage>(8);

    let writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(message) = outbound_rx.recv() => message,
                Some(message) = local_rx.recv() => message,
                else => break,
            };
            if sink.send(Message::Text(message.to_json())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match ClientMessage::parse(&text) {
                Ok(ClientMessage::PoseLandmarks {
                    landmarks,
                    exercise_name,
                }) => {
                    let event = Event::PoseFrame {
                        landmarks,
                        exercise_name,
                    };
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(ClientMessage::Unknown) => {
                    tracing::debug!(session_id = %session_id, "Ignoring unknown message type");
                }
                Err(e) => {
                    let snippet: String = text.chars().take(LOG_SNIPPET_CHARS).collect();
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        payload = %snippet,
                        "Malformed client message"
                    );
                    let _ = local_tx.send(ServerMessage::error(MALFORMED_MESSAGE)).await;
                }
            },
            Message::Close(_) => break,
            // Ping/pong is answered by axum; binary frames carry nothing we read
            _ => {}
        }
    }

    tracing::info!(session_id = %session_id, "Supervision connection closed");
    let _ = event_tx.send(Event::Disconnected).await;
    drop(local_tx);
    let _ = writer.await;
}

// ============================================================
// Catalogue
// ============================================================

async fn list_exercises(State(state): State<AppState>) -> Json<ExercisesResponse> {
    let exercises = state
        .sessions
        .registry()
        .entries()
        .into_iter()
        .map(|(name, kind)| ExerciseInfo {
            name: name.to_string(),
            kind,
        })
        .collect();
    Json(ExercisesResponse { exercises })
}

async fn get_version() -> &'static str {
    concat!("gym-supervisor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::auth::jwt::{verify_token, Claims};
use crate::services::log_list::{LogListPresenter, LogRow};
use crate::services::session::{GateDecision, SessionGate, SessionState};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// Fanned out to every open socket; each socket keeps only its own user's.
#[derive(Debug, Clone, Copy)]
pub struct LogChange {
    pub user_id: Uuid,
    pub log_id: Uuid,
    pub action: ChangeAction,
}

pub fn publish(state: &AppState, change: LogChange) {
    // Err only means no socket is listening.
    if state.events.send(change).is_err() {
        tracing::trace!(user_id = %change.user_id, "No live subscribers for log change");
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage<'a> {
    Snapshot { rows: &'a [LogRow] },
    Error { message: String },
    Redirect { location: &'static str },
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let claims = match query.token.as_deref() {
        Some(token) => match verify_token(token, &state.config) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("WebSocket auth failed: {}", e);
                return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            }
        },
        None => {
            tracing::warn!("WebSocket auth failed: missing token query parameter");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

async fn send_json<S, T>(sender: &mut S, msg: &T) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    T: Serialize,
{
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(text)).await
}

/// Re-fetch (when asked) and push the current rows. A failed fetch is
/// reported to the client without closing the socket.
async fn push_rows<S>(
    sender: &mut S,
    list: &mut LogListPresenter,
    state: &AppState,
    reload: bool,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    if reload {
        if let Err(e) = list.load(state.logs.as_ref()).await {
            tracing::error!(user_id = %list.user_id(), error = %e, "Live log reload failed");
            return send_json(
                sender,
                &ServerMessage::Error {
                    message: "Could not load logs".into(),
                },
            )
            .await;
        }
    }
    send_json(sender, &ServerMessage::Snapshot { rows: list.rows() }).await
}

async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let (sender, receiver) = socket.split();
    live_view(sender, receiver, state, claims).await;
}

/// One live log view: gate on the session, push snapshots as this user's
/// logs change, and redirect once the access token lapses.
async fn live_view<S, R>(mut sender: S, mut receiver: R, state: AppState, claims: Claims)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let user_id = claims.sub;
    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let gate = SessionGate::new();
    let mut session = gate.observe();
    let mut changes = state.events.subscribe();
    let mut list = LogListPresenter::new(user_id);

    let expiry = tokio::time::sleep(Duration::from_secs(claims.remaining_secs()));
    tokio::pin!(expiry);

    gate.resolve(Some(user_id));

    loop {
        tokio::select! {
            next = session.changed() => {
                match next.map(|s| s.decision()) {
                    Some(GateDecision::Proceed(_)) => {
                        if push_rows(&mut sender, &mut list, &state, true).await.is_err() {
                            break;
                        }
                    }
                    Some(GateDecision::Redirect(location)) => {
                        let _ = send_json(&mut sender, &ServerMessage::Redirect { location }).await;
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    Some(GateDecision::Wait) => {}
                    None => break,
                }
            }
            _ = &mut expiry, if gate.state() != SessionState::Unauthenticated => {
                tracing::debug!(user_id = %user_id, "Access token expired on live socket");
                gate.resolve(None);
            }
            change = changes.recv() => {
                let sent = match change {
                    Ok(change) if change.user_id != user_id => Ok(()),
                    Ok(change) if change.action == ChangeAction::Deleted => {
                        list.forget(change.log_id);
                        push_rows(&mut sender, &mut list, &state, false).await
                    }
                    Ok(_) => push_rows(&mut sender, &mut list, &state, true).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id = %user_id, skipped, "Live socket lagged, reloading");
                        push_rows(&mut sender, &mut list, &state, true).await
                    }
                    Err(RecvError::Closed) => break,
                };
                if sent.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(user_id = %user_id, message = %text, "WebSocket message received");
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.unsubscribe();
    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}

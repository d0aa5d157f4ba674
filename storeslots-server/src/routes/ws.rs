use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use storeslots::persistence::ConfigEvent;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::middleware::auth::validate_token;
use crate::AppState;

#[derive(serde::Deserialize)]
struct WsQuery {
    token: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/configurations/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let claims =
        validate_token(&query.token, &state.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, state, claims.store_id, claims.sub, claims.sid)
    }))
}

fn get_or_create_channel(state: &AppState, store_id: &str) -> broadcast::Sender<(Uuid, String)> {
    state
        .store_channels
        .entry(store_id.to_string())
        .or_insert_with(|| broadcast::channel(100).0)
        .clone()
}

/// Relay `event` to every editor of `store_id` except the session that
/// caused it.
pub(crate) fn notify(state: &AppState, store_id: &str, origin: Uuid, event: &ConfigEvent) {
    let Some(tx) = state.store_channels.get(store_id) else {
        return;
    };
    match serde_json::to_string(event) {
        Ok(payload) => {
            let _ = tx.send((origin, payload));
        }
        Err(e) => tracing::error!("Failed to encode change event: {}", e),
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    store_id: String,
    editor: String,
    session_id: Uuid,
) {
    let (mut sender, mut receiver) = socket.split();

    let tx = get_or_create_channel(&state, &store_id);
    let mut rx = tx.subscribe();

    // Direct channel for messages targeted at this specific connection
    let (direct_tx, mut direct_rx) = mpsc::channel::<String>(8);

    tracing::info!("WebSocket connected: store={}, editor={}", store_id, editor);

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok((origin, payload)) => {
                            if origin == session_id {
                                continue;
                            }
                            if sender.send(Message::Text(payload.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("WebSocket client lagged, skipped {} events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                Some(payload) = direct_rx.recv() => {
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // The stream is server-to-client only; anything else gets an error event.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    let reply = ConfigEvent::Error {
                        message: "This stream does not accept messages".to_string(),
                    };
                    if let Ok(json) = serde_json::to_string(&reply) {
                        let _ = direct_tx.send(json).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait out the aborted task so its broadcast receiver is dropped before
    // the channel is pruned.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    prune_channel(&state, &store_id);

    tracing::info!("WebSocket disconnected: store={}, editor={}", store_id, editor);
}

/// Drop the store's channel once its last subscriber is gone.
fn prune_channel(state: &AppState, store_id: &str) {
    state
        .store_channels
        .remove_if(store_id, |_, tx| tx.receiver_count() == 0);
}

#[cfg(test)]
mod tests {
    use storeslots::persistence::PageType;
    use uuid::Uuid;

    use super::*;
    use crate::routes::test_support::state;

    #[tokio::test]
    async fn events_reach_other_sessions_of_the_same_store() {
        let state = state();
        let mut rx = get_or_create_channel(&state, "store-1").subscribe();
        let origin = Uuid::new_v4();

        notify(
            &state,
            "store-1",
            origin,
            &ConfigEvent::Published {
                page_type: PageType::Cart,
                version: 3,
                updated_by: Some("ana".into()),
            },
        );
        notify(
            &state,
            "store-2",
            origin,
            &ConfigEvent::DraftDiscarded {
                page_type: PageType::Home,
                updated_by: None,
            },
        );

        let (from, payload) = rx.recv().await.unwrap();
        assert_eq!(from, origin);
        let event: ConfigEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            event,
            ConfigEvent::Published {
                page_type: PageType::Cart,
                version: 3,
                updated_by: Some("ana".into())
            }
        );
        assert!(rx.try_recv().is_err());
        assert!(state.store_channels.get("store-2").is_none());
    }

    #[tokio::test]
    async fn channel_is_pruned_after_its_last_subscriber_task_ends() {
        let state = state();
        let keep = get_or_create_channel(&state, "store-1").subscribe();

        let mut rx = get_or_create_channel(&state, "store-1").subscribe();
        let task = tokio::spawn(async move { while rx.recv().await.is_ok() {} });
        task.abort();
        let _ = task.await;
        assert_eq!(state.store_channels.get("store-1").unwrap().receiver_count(), 1);

        prune_channel(&state, "store-1");
        assert!(state.store_channels.get("store-1").is_some());

        drop(keep);
        prune_channel(&state, "store-1");
        assert!(state.store_channels.get("store-1").is_none());
    }
}

use axum::{debug_handler, extract::{ws::{Message as Frame, WebSocket}, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{Sink, SinkExt, StreamExt};
use sqlx::SqlitePool;

use crate::{auth::ApiUser, chats, messages, models::Identity};

use super::{send_message, ClientEvent, Relay, ServerEvent, Subscription};

#[debug_handler(state = crate::AppState)]
pub async fn socket(
    ApiUser(me): ApiUser,
    State(db_pool): State<SqlitePool>,
    State(relay): State<Relay>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve(stream, me, db_pool, relay))
}

async fn push<S>(sender: &mut S, event: &ServerEvent) -> Result<(), S::Error>
where
    S: Sink<Frame> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "couldn't encode frame");
            return Ok(());
        }
    };
    sender.send(Frame::Text(text.into())).await
}

/// Sends a new socket the global history snapshot.
async fn greet<S>(sender: &mut S, db_pool: &SqlitePool) -> Result<(), S::Error>
where
    S: Sink<Frame> + Unpin,
{
    match messages::store::list_global_history(db_pool).await {
        Ok(history) => push(sender, &ServerEvent::PreviousMessages(history)).await,
        Err(err) => {
            tracing::error!(error = %err, "couldn't load global history");
            Ok(())
        }
    }
}

async fn serve(stream: WebSocket, me: Identity, db_pool: SqlitePool, relay: Relay) {
    tracing::debug!(user = %me.id, "socket connected");

    // subscribe before the snapshot so nothing posted in between is lost; a global
    // message committed in that window arrives twice, in the snapshot and as newMessage
    let mut subscription = relay.connect();
    let (mut sender, mut receiver) = stream.split();

    if greet(&mut sender, &db_pool).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if push(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => {
                        on_frame(text.as_str(), &me, &db_pool, &relay, &mut subscription).await;
                    }
                    Some(Ok(Frame::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    tracing::debug!(user = %me.id, "socket closed");
}

async fn on_frame(text: &str, me: &Identity, db_pool: &SqlitePool, relay: &Relay, subscription: &mut Subscription) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed frame");
            return;
        }
    };

    match event {
        ClientEvent::JoinChat(chat_id) => {
            match chats::store::ensure_participant(db_pool, chat_id, me.id).await {
                Ok(()) => {
                    subscription.join(chat_id);
                }
                Err(err) => tracing::warn!(user = %me.id, chat = %chat_id, error = %err, "join refused"),
            }
        }
        ClientEvent::SendMessage(payload) => {
            if let Err(err) = send_message(db_pool, relay, me, payload).await {
                tracing::warn!(user = %me.id, error = %err, "message dropped");
            }
        }
    }
}

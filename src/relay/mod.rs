//! In-process fan-out of new messages to connected sockets.
//!
//! There is one broadcast channel for the whole process. Every socket holds a
//! [`Subscription`] and drops the chat-scoped events for chats it never joined.

pub mod ws;

use std::{collections::HashSet, sync::Arc};

use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{chats, messages, models::{Identity, Message}, AppResult};

/// Slow sockets that fall this far behind skip ahead.
pub const RELAY_CAPACITY: usize = 1024;

/// Frames the server pushes down a socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    PreviousMessages(Vec<Message>),
    Message(Message),
    NewMessage(Message),
}

/// Frames a client sends up its socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinChat(Uuid),
    SendMessage(SendMessage),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub chat_id: Option<Uuid>,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "text")]
    pub message: String,
}

/// An empty or null `chatId` means the global room.
fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(id) if !id.is_empty() => Uuid::parse_str(&id).map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Chat(Uuid),
}

#[derive(Debug)]
struct Envelope {
    scope: Scope,
    event: ServerEvent,
}

#[derive(Clone)]
pub struct Relay {
    tx: broadcast::Sender<Arc<Envelope>>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RELAY_CAPACITY)
    }
}

impl Relay {
    pub fn new(capacity: usize) -> Self {
        Relay { tx: broadcast::channel(capacity).0 }
    }

    /// A fresh subscription that sees global events and no chat channels yet.
    pub fn connect(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            channels: HashSet::new(),
        }
    }

    pub fn broadcast_global(&self, msg: Message) {
        self.send(Scope::Global, ServerEvent::NewMessage(msg));
    }

    pub fn broadcast_to_chat(&self, chat_id: Uuid, msg: Message) {
        self.send(Scope::Chat(chat_id), ServerEvent::Message(msg));
    }

    fn send(&self, scope: Scope, event: ServerEvent) {
        // no receivers is fine
        if self.tx.send(Arc::new(Envelope { scope, event })).is_err() {
            tracing::debug!(?scope, "nobody connected to relay");
        }
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<Arc<Envelope>>,
    channels: HashSet<Uuid>,
}

impl Subscription {
    /// Returns false when the channel was already joined.
    pub fn join(&mut self, chat_id: Uuid) -> bool {
        self.channels.insert(chat_id)
    }

    pub fn has_joined(&self, chat_id: Uuid) -> bool {
        self.channels.contains(&chat_id)
    }

    fn accepts(&self, scope: Scope) -> bool {
        match scope {
            Scope::Global => true,
            Scope::Chat(chat_id) => self.has_joined(chat_id),
        }
    }

    /// Next event meant for this subscription, or `None` once the relay is gone.
    /// Cancel-safe.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.accepts(envelope.scope) => return Some(envelope.event.clone()),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "socket fell behind relay");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Persists a global message, then announces it to every socket.
pub async fn publish_global(db_pool: &SqlitePool, relay: &Relay, author: &str, text: &str) -> AppResult<Message> {
    let msg = messages::store::append_global_message(db_pool, author, text).await?;
    relay.broadcast_global(msg.clone());
    Ok(msg)
}

/// Persists a chat message from one of the chat's participants, then announces it to the chat's channel.
pub async fn publish_to_chat(
    db_pool: &SqlitePool,
    relay: &Relay,
    sender: &Identity,
    chat_id: Uuid,
    author: &str,
    text: &str,
) -> AppResult<Message> {
    chats::store::ensure_participant(db_pool, chat_id, sender.id).await?;
    let msg = messages::store::append_chat_message(db_pool, chat_id, author, text).await?;
    relay.broadcast_to_chat(chat_id, msg.clone());
    Ok(msg)
}

/// Routes a `sendMessage` frame: chat-scoped when it names a chat, global otherwise.
pub async fn send_message(
    db_pool: &SqlitePool,
    relay: &Relay,
    sender: &Identity,
    SendMessage { chat_id, username, message }: SendMessage,
) -> AppResult<Message> {
    match chat_id {
        Some(chat_id) => publish_to_chat(db_pool, relay, sender, chat_id, &username, &message).await,
        None => publish_global(db_pool, relay, &username, &message).await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::{db, users::store::tests::identity, AppError};

    async fn next(sub: &mut Subscription) -> Option<ServerEvent> {
        timeout(Duration::from_millis(50), sub.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn chat_messages_reach_joined_sockets_only() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;
        let b = identity(&db_pool, "b").await;
        let chat = chats::store::get_or_create_direct_chat(&db_pool, a.id, b.id).await.unwrap();

        let relay = Relay::default();
        let mut joined = relay.connect();
        let mut elsewhere = relay.connect();
        assert!(joined.join(chat.id));
        assert!(!joined.join(chat.id));
        elsewhere.join(Uuid::now_v7());

        let payload = SendMessage { chat_id: Some(chat.id), username: "a".into(), message: "psst".into() };
        let msg = send_message(&db_pool, &relay, &a, payload).await.unwrap();

        assert_eq!(next(&mut joined).await, Some(ServerEvent::Message(msg)));
        assert_eq!(next(&mut elsewhere).await, None);
    }

    #[tokio::test]
    async fn global_messages_reach_everyone() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;

        let relay = Relay::default();
        let mut plain = relay.connect();
        let mut in_a_chat = relay.connect();
        in_a_chat.join(Uuid::now_v7());

        let payload = SendMessage { chat_id: None, username: "a".into(), message: "hi".into() };
        let msg = send_message(&db_pool, &relay, &a, payload).await.unwrap();
        assert_eq!(msg.chat_id, None);

        assert_eq!(next(&mut plain).await, Some(ServerEvent::NewMessage(msg.clone())));
        assert_eq!(next(&mut in_a_chat).await, Some(ServerEvent::NewMessage(msg)));
    }

    #[tokio::test]
    async fn outsiders_cannot_post_into_a_chat() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;
        let b = identity(&db_pool, "b").await;
        let mallory = identity(&db_pool, "mallory").await;
        let chat = chats::store::get_or_create_direct_chat(&db_pool, a.id, b.id).await.unwrap();

        let relay = Relay::default();
        let mut watcher = relay.connect();
        watcher.join(chat.id);

        let payload = SendMessage { chat_id: Some(chat.id), username: "mallory".into(), message: "hi".into() };
        let err = send_message(&db_pool, &relay, &mallory, payload).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(next(&mut watcher).await, None);
        assert!(messages::store::list_chat_history(&db_pool, chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_messages_are_not_broadcast() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;

        let relay = Relay::default();
        let mut sub = relay.connect();

        let payload = SendMessage { chat_id: None, username: "a".into(), message: String::new() };
        assert!(send_message(&db_pool, &relay, &a, payload).await.is_err());
        assert_eq!(next(&mut sub).await, None);
    }

    #[test]
    fn client_frames_parse() {
        let chat_id = Uuid::now_v7();

        let join: ClientEvent = serde_json::from_value(json!({ "event": "joinChat", "data": chat_id })).unwrap();
        assert_eq!(join, ClientEvent::JoinChat(chat_id));

        let room: ClientEvent = serde_json::from_value(json!({
            "event": "sendMessage",
            "data": { "chatId": chat_id, "username": "a", "text": "hi" }
        })).unwrap();
        assert_eq!(room, ClientEvent::SendMessage(SendMessage {
            chat_id: Some(chat_id),
            username: "a".into(),
            message: "hi".into(),
        }));

        let global: ClientEvent = serde_json::from_value(json!({
            "event": "sendMessage",
            "data": { "username": "a", "message": "hi" }
        })).unwrap();
        assert_eq!(global, ClientEvent::SendMessage(SendMessage {
            chat_id: None,
            username: "a".into(),
            message: "hi".into(),
        }));
    }

    #[tokio::test]
    async fn blank_chat_id_posts_globally() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;
        let relay = Relay::default();
        let mut sub = relay.connect();

        let frame: ClientEvent = serde_json::from_value(json!({
            "event": "sendMessage",
            "data": { "chatId": "", "username": "a", "message": "hi" }
        })).unwrap();
        let ClientEvent::SendMessage(payload) = frame else {
            panic!("expected sendMessage");
        };
        assert_eq!(payload.chat_id, None);

        let msg = send_message(&db_pool, &relay, &a, payload).await.unwrap();
        assert_eq!(next(&mut sub).await, Some(ServerEvent::NewMessage(msg)));
        assert_eq!(messages::store::list_global_history(&db_pool).await.unwrap().len(), 1);

        let null_id: SendMessage = serde_json::from_value(json!({ "chatId": null, "message": "x" })).unwrap();
        assert_eq!(null_id.chat_id, None);
        assert!(serde_json::from_value::<SendMessage>(json!({ "chatId": "nope" })).is_err());
    }

    #[test]
    fn server_frames_are_tagged() {
        let json = serde_json::to_value(ServerEvent::PreviousMessages(Vec::new())).unwrap();
        assert_eq!(json, json!({ "event": "previousMessages", "data": [] }));
    }
}

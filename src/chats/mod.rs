mod direct;
mod history;
mod list;
pub mod store;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_chats).post(direct::direct_chat))
        .route("/{chat_id}/messages", get(history::chat_history))
}

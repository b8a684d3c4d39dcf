use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::ApiUser, messages, models::Message, AppResult};

use super::store;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_history(
    ApiUser(me): ApiUser,
    Path(chat_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<Message>>> {
    store::ensure_participant(&db_pool, chat_id, me.id).await?;
    Ok(Json(messages::store::list_chat_history(&db_pool, chat_id).await?))
}

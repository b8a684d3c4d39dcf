use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::ApiUser, models::Chat, AppResult};

use super::store;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DirectChatBody {
    participant_id: Uuid,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn direct_chat(
    ApiUser(me): ApiUser,
    State(db_pool): State<SqlitePool>,
    Json(DirectChatBody { participant_id }): Json<DirectChatBody>,
) -> AppResult<Json<Chat>> {
    Ok(Json(store::get_or_create_direct_chat(&db_pool, me.id, participant_id).await?))
}

use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use crate::{auth::ApiUser, models::Chat, AppResult};

use super::store;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_chats(
    ApiUser(me): ApiUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<Chat>>> {
    Ok(Json(store::list_chats_for(&db_pool, me.id).await?))
}

use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use crate::{auth::ApiUser, models::UserSummary, AppResult};

use super::store;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_users(
    ApiUser(me): ApiUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(store::list_users_except(&db_pool, me.id).await?))
}

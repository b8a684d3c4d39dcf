use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{auth::ApiUser, models::Message, relay::{self, Relay}, AppResult};

use super::store;

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    message: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn global_history(
    ApiUser(_): ApiUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(store::list_global_history(&db_pool).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_global(
    ApiUser(_): ApiUser,
    State(db_pool): State<SqlitePool>,
    State(relay): State<Relay>,
    Json(PostMessageBody { username, message }): Json<PostMessageBody>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let msg = relay::publish_global(&db_pool, &relay, &username, &message).await?;
    Ok((StatusCode::CREATED, Json(msg)))
}

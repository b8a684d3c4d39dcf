//! Who is asking. API callers without a live session get 401, page visitors
//! are sent back to the landing page.

use axum::{extract::FromRequestParts, http::request::Parts, response::{IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{models::Identity, session::USER_ID, users, AppError, AppResult, AppState};

pub async fn current_identity(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<Identity>> {
    let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
        return Ok(None);
    };
    users::store::find_by_id(db_pool, user_id).await
}

async fn resolve(parts: &mut Parts, state: &AppState) -> AppResult<Option<Identity>> {
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::from(msg))?;
    current_identity(&session, &state.db_pool).await
}

/// Signed-in caller of a JSON or socket endpoint.
#[derive(Debug, Clone)]
pub struct ApiUser(pub Identity);

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?
            .map(ApiUser)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Signed-in visitor of an HTML page.
#[derive(Debug, Clone)]
pub struct PageUser(pub Identity);

impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(Some(identity)) => Ok(PageUser(identity)),
            Ok(None) => Err(Redirect::to("/").into_response()),
            Err(err) => Err(err.into_response()),
        }
    }
}

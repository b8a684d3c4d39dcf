use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{models::{Identity, UserSummary}, AppError, AppResult};

pub async fn find_by_id(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Identity>> {
    Ok(
        sqlx::query_as("SELECT id,google_id,display_name,email,created_at,updated_at FROM identities WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?
    )
}

pub async fn exists(db_pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    Ok(
        sqlx::query("SELECT 1 FROM identities WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?
            .is_some()
    )
}

/// Looks the identity up by Google subject id, creating it on first login.
pub async fn find_or_create(
    db_pool: &SqlitePool,
    google_id: &str,
    display_name: &str,
    email: &str,
) -> AppResult<Identity> {
    if google_id.is_empty() || display_name.is_empty() || email.is_empty() {
        return Err(AppError::validation("identity needs a google id, a display name and an email"));
    }

    let now = OffsetDateTime::now_utc();
    let inserted = sqlx::query(
        "INSERT INTO identities (id,google_id,display_name,email,created_at,updated_at) VALUES (?,?,?,?,?,?)
         ON CONFLICT(google_id) DO NOTHING"
    )
        .bind(Uuid::now_v7())
        .bind(google_id)
        .bind(display_name)
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(db_pool)
        .await?
        .rows_affected();

    let identity: Identity = sqlx::query_as("SELECT id,google_id,display_name,email,created_at,updated_at FROM identities WHERE google_id=?")
        .bind(google_id)
        .fetch_one(db_pool)
        .await?;

    if inserted == 1 {
        tracing::info!(id = %identity.id, name = %identity.display_name, "new identity");
    }
    Ok(identity)
}

pub async fn list_users_except(db_pool: &SqlitePool, id: Uuid) -> AppResult<Vec<UserSummary>> {
    Ok(
        sqlx::query_as("SELECT id,display_name,email FROM identities WHERE id<>? ORDER BY rowid")
            .bind(id)
            .fetch_all(db_pool)
            .await?
    )
}

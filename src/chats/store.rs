use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{models::Chat, users, AppError, AppResult};

pub const DIRECT_CHAT_NAME: &str = "Direct Chat";

/// Key that names the unordered pair `{a, b}`.
pub fn direct_key(a: Uuid, b: Uuid) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{low}:{high}")
}

async fn participants(db_pool: &SqlitePool, chat_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT identity_id FROM chat_participants WHERE chat_id=? ORDER BY position")
        .bind(chat_id)
        .fetch_all(db_pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn hydrate(db_pool: &SqlitePool, (id, name, created_at): (Uuid, String, OffsetDateTime)) -> AppResult<Chat> {
    Ok(Chat {
        id,
        name,
        participants: participants(db_pool, id).await?,
        created_at,
    })
}

pub async fn get_chat(db_pool: &SqlitePool, chat_id: Uuid) -> AppResult<Option<Chat>> {
    let row: Option<(Uuid, String, OffsetDateTime)> = sqlx::query_as("SELECT id,name,created_at FROM chats WHERE id=?")
        .bind(chat_id)
        .fetch_optional(db_pool)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(db_pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn is_participant(db_pool: &SqlitePool, chat_id: Uuid, identity_id: Uuid) -> AppResult<bool> {
    Ok(
        sqlx::query("SELECT 1 FROM chat_participants WHERE chat_id=? AND identity_id=?")
            .bind(chat_id)
            .bind(identity_id)
            .fetch_optional(db_pool)
            .await?
            .is_some()
    )
}

/// Fails with `NotFound` for an unknown chat and `Forbidden` when the identity isn't in it.
pub async fn ensure_participant(db_pool: &SqlitePool, chat_id: Uuid, identity_id: Uuid) -> AppResult<()> {
    if !is_participant(db_pool, chat_id, identity_id).await? {
        if get_chat(db_pool, chat_id).await?.is_none() {
            return Err(AppError::NotFound(format!("no chat {chat_id}")));
        }
        return Err(AppError::Forbidden(format!("not a participant of chat {chat_id}")));
    }
    Ok(())
}

pub async fn list_chats_for(db_pool: &SqlitePool, identity_id: Uuid) -> AppResult<Vec<Chat>> {
    let rows: Vec<(Uuid, String, OffsetDateTime)> = sqlx::query_as(
        "SELECT c.id,c.name,c.created_at FROM chats c
         JOIN chat_participants p ON p.chat_id=c.id
         WHERE p.identity_id=?
         ORDER BY c.rowid"
    )
        .bind(identity_id)
        .fetch_all(db_pool)
        .await?;

    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        chats.push(hydrate(db_pool, row).await?);
    }
    Ok(chats)
}

/// Returns the one direct chat between `a` and `b`, creating it with participants `[a, b]`
/// when they have none. The unique `direct_key` keeps racing callers on the same chat.
pub async fn get_or_create_direct_chat(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> AppResult<Chat> {
    if a == b {
        return Err(AppError::validation("a direct chat needs two different participants"));
    }
    for id in [a, b] {
        if !users::store::exists(db_pool, id).await? {
            return Err(AppError::NotFound(format!("no user {id}")));
        }
    }

    let key = direct_key(a, b);
    let chat_id = Uuid::now_v7();

    let mut tx = db_pool.begin().await?;
    let inserted = sqlx::query("INSERT INTO chats (id,name,direct_key,created_at) VALUES (?,?,?,?) ON CONFLICT(direct_key) DO NOTHING")
        .bind(chat_id)
        .bind(DIRECT_CHAT_NAME)
        .bind(&key)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if inserted == 1 {
        for (position, identity_id) in [a, b].into_iter().enumerate() {
            sqlx::query("INSERT INTO chat_participants (chat_id,identity_id,position) VALUES (?,?,?)")
                .bind(chat_id)
                .bind(identity_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
    }
    tx.commit().await?;

    let row: (Uuid, String, OffsetDateTime) = sqlx::query_as("SELECT id,name,created_at FROM chats WHERE direct_key=?")
        .bind(&key)
        .fetch_one(db_pool)
        .await?;

    if inserted == 1 {
        tracing::info!(chat = %row.0, %a, %b, "created direct chat");
    }
    hydrate(db_pool, row).await
}

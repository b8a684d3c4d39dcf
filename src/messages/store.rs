use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{chats, models::Message, AppError, AppResult};

/// How many global messages a history snapshot holds.
pub const GLOBAL_HISTORY_LIMIT: i64 = 50;

fn validate(author: &str, text: &str) -> AppResult<()> {
    if author.is_empty() {
        return Err(AppError::validation("message needs a username"));
    }
    if text.is_empty() {
        return Err(AppError::validation("message needs text"));
    }
    Ok(())
}

async fn insert(db_pool: &SqlitePool, chat_id: Option<Uuid>, author: &str, text: &str) -> AppResult<Message> {
    validate(author, text)?;

    let msg = Message {
        id: Uuid::now_v7(),
        chat_id,
        author: author.to_owned(),
        text: text.to_owned(),
        created_at: OffsetDateTime::now_utc(),
    };
    sqlx::query("INSERT INTO messages (id,chat_id,author,text,created_at) VALUES (?,?,?,?,?)")
        .bind(msg.id)
        .bind(msg.chat_id)
        .bind(&msg.author)
        .bind(&msg.text)
        .bind(msg.created_at)
        .execute(db_pool)
        .await?;

    Ok(msg)
}

pub async fn append_global_message(db_pool: &SqlitePool, author: &str, text: &str) -> AppResult<Message> {
    insert(db_pool, None, author, text).await
}

pub async fn append_chat_message(db_pool: &SqlitePool, chat_id: Uuid, author: &str, text: &str) -> AppResult<Message> {
    validate(author, text)?;
    if chats::store::get_chat(db_pool, chat_id).await?.is_none() {
        return Err(AppError::NotFound(format!("no chat {chat_id}")));
    }
    insert(db_pool, Some(chat_id), author, text).await
}

/// The most recent global messages, oldest first. Order is insertion order.
pub async fn list_global_history(db_pool: &SqlitePool) -> AppResult<Vec<Message>> {
    Ok(
        sqlx::query_as(
            "SELECT id,chat_id,author,text,created_at FROM (
                SELECT id,chat_id,author,text,created_at,rowid AS seq FROM messages
                WHERE chat_id IS NULL
                ORDER BY seq DESC
                LIMIT ?
            ) ORDER BY seq"
        )
            .bind(GLOBAL_HISTORY_LIMIT)
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn list_chat_history(db_pool: &SqlitePool, chat_id: Uuid) -> AppResult<Vec<Message>> {
    Ok(
        sqlx::query_as("SELECT id,chat_id,author,text,created_at FROM messages WHERE chat_id=? ORDER BY rowid")
            .bind(chat_id)
            .fetch_all(db_pool)
            .await?
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, users::store::tests::identity};

    #[tokio::test]
    async fn global_history_keeps_the_latest_fifty_in_order() {
        let db_pool = db::memory().await.unwrap();
        let mut posted = Vec::new();
        for i in 0..55 {
            posted.push(append_global_message(&db_pool, "a", &format!("msg {i}")).await.unwrap().id);
        }

        let history = list_global_history(&db_pool).await.unwrap();
        let ids: Vec<Uuid> = history.iter().map(|m| m.id).collect();
        assert_eq!(history.len(), 50);
        assert_eq!(ids, posted[5..]);
        assert_eq!(history.last().unwrap().text, "msg 54");
    }

    #[tokio::test]
    async fn global_history_excludes_chat_messages() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;
        let b = identity(&db_pool, "b").await;
        let chat = chats::store::get_or_create_direct_chat(&db_pool, a.id, b.id).await.unwrap();

        append_global_message(&db_pool, "a", "hello all").await.unwrap();
        append_chat_message(&db_pool, chat.id, "a", "psst").await.unwrap();

        let global = list_global_history(&db_pool).await.unwrap();
        assert_eq!(global.len(), 1);
        assert!(global.iter().all(|m| m.chat_id.is_none()));

        let private = list_chat_history(&db_pool, chat.id).await.unwrap();
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].chat_id, Some(chat.id));
        assert_eq!(private[0].text, "psst");
    }

    #[tokio::test]
    async fn chat_history_is_unbounded_and_ascending() {
        let db_pool = db::memory().await.unwrap();
        let a = identity(&db_pool, "a").await;
        let b = identity(&db_pool, "b").await;
        let chat = chats::store::get_or_create_direct_chat(&db_pool, a.id, b.id).await.unwrap();

        for i in 0..60 {
            append_chat_message(&db_pool, chat.id, "b", &format!("{i}")).await.unwrap();
        }

        let history = list_chat_history(&db_pool, chat.id).await.unwrap();
        assert_eq!(history.len(), 60);
        assert_eq!(history[0].text, "0");
        assert_eq!(history[59].text, "59");
    }

    #[tokio::test]
    async fn empty_fields_and_unknown_chats_are_rejected() {
        let db_pool = db::memory().await.unwrap();

        assert!(matches!(append_global_message(&db_pool, "", "hi").await, Err(AppError::Validation(_))));
        assert!(matches!(append_global_message(&db_pool, "a", "").await, Err(AppError::Validation(_))));
        assert!(matches!(
            append_chat_message(&db_pool, Uuid::now_v7(), "a", "hi").await,
            Err(AppError::NotFound(_))
        ));
        assert!(list_global_history(&db_pool).await.unwrap().is_empty());
    }
}

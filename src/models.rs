use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// A signed-in user, tied to the Google account that created it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub google_id: String,
    pub display_name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// What other users get to see of an identity.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub name: String,
    pub participants: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A posted message. `chat_id` of `None` puts it on the global timeline.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "chat", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<Uuid>,
    #[serde(rename = "username")]
    pub author: String,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn global_messages_serialize_without_chat() {
        let msg = Message {
            id: Uuid::now_v7(),
            chat_id: None,
            author: "a".to_owned(),
            text: "hi".to_owned(),
            created_at: datetime!(2025-01-02 03:04:05 UTC),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("chat").is_none());
        assert_eq!(json["username"], "a");
        assert_eq!(json["message"], "hi");
        assert_eq!(json["timestamp"], "2025-01-02T03:04:05Z");
    }

    #[test]
    fn chat_messages_carry_their_chat() {
        let chat_id = Uuid::now_v7();
        let msg = Message {
            id: Uuid::now_v7(),
            chat_id: Some(chat_id),
            author: "a".to_owned(),
            text: "hi".to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["chat"], chat_id.to_string());
    }
}

//! 消息Repository实现
//!
//! 单调状态机直接落在 SQL 里：每次推进都带 rank 比较的
//! WHERE 条件，重复或回退的更新影响零行，调用方据此判断
//! 本次更新是否真的被应用。私聊消息本体的聚合状态与唯一
//! 接收者的状态同步推进。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ConversationId, DomainError, Message, MessageDraft, MessageId, MessageStatus, RepositoryError,
    UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

use application::MessageRepository;

use super::{invalid_data, map_sqlx_err};
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    conversation_id: i64,
    sender_id: Uuid,
    body: String,
    content_type: String,
    media_url: Option<String>,
    status: String,
    edited: bool,
    deleted: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content_type = value
            .content_type
            .parse()
            .map_err(|err: DomainError| invalid_data(err.to_string()))?;
        let status = value
            .status
            .parse()
            .map_err(|err: DomainError| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId::new(value.id),
            conversation_id: ConversationId::new(value.conversation_id),
            sender_id: UserId::from(value.sender_id),
            body: value.body,
            content_type,
            media_url: value.media_url,
            status,
            edited: value.edited,
            deleted: value.deleted,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create_direct(
        &self,
        sender: UserId,
        recipient: UserId,
        draft: MessageDraft,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT c.id
            FROM conversations c
            JOIN conversation_members a ON a.conversation_id = c.id AND a.user_id = $1
            JOIN conversation_members b ON b.conversation_id = c.id AND b.user_id = $2
            WHERE c.kind = 'direct'
            LIMIT 1
            "#,
        )
        .bind(sender.0)
        .bind(recipient.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let conversation_id = match existing {
            Some(id) => id,
            None => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO conversations (kind) VALUES ('direct') RETURNING id",
                )
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;

                let members: Vec<Uuid> = vec![sender.0, recipient.0];
                sqlx::query(
                    r#"
                    INSERT INTO conversation_members (conversation_id, user_id)
                    SELECT $1, unnest($2::uuid[])
                    "#,
                )
                .bind(id)
                .bind(&members)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
                id
            }
        };

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, content_type, media_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, sender_id, body, content_type, media_url,
                      status, edited, deleted, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender.0)
        .bind(draft.body.as_str())
        .bind(draft.content_type.as_str())
        .bind(&draft.media_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn create_in_conversation(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        draft: MessageDraft,
    ) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, content_type, media_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, sender_id, body, content_type, media_url,
                      status, edited, deleted, created_at
            "#,
        )
        .bind(conversation_id.0)
        .bind(sender.0)
        .bind(draft.body.as_str())
        .bind(draft.content_type.as_str())
        .bind(&draft.media_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, sender_id, body, content_type, media_url,
                   status, edited, deleted, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: MessageId,
        recipient: UserId,
        status: MessageStatus,
    ) -> Result<bool, RepositoryError> {
        let rank = i32::from(status.rank());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1)")
            .bind(id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        // 无状态行等价于 sent，所以插入本身也要求 rank > 0
        let result = sqlx::query(
            r#"
            INSERT INTO message_recipient_status (message_id, recipient_id, status)
            SELECT $1, $2, $3
            WHERE $4 > 0
            ON CONFLICT (message_id, recipient_id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = NOW()
            WHERE CASE message_recipient_status.status
                      WHEN 'sent' THEN 0
                      WHEN 'delivered' THEN 1
                      ELSE 2
                  END < $4
            "#,
        )
        .bind(id.0)
        .bind(recipient.0)
        .bind(status.as_str())
        .bind(rank)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        let applied = result.rows_affected() > 0;

        // 私聊只有一个接收者，消息本体的状态与其保持同步
        if applied {
            sqlx::query(
                r#"
                UPDATE messages m
                SET status = $2
                FROM conversations c
                WHERE m.id = $1
                  AND c.id = m.conversation_id
                  AND c.kind = 'direct'
                  AND CASE m.status
                          WHEN 'sent' THEN 0
                          WHEN 'delivered' THEN 1
                          ELSE 2
                      END < $3
                "#,
            )
            .bind(id.0)
            .bind(status.as_str())
            .bind(rank)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(applied)
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        up_to: MessageId,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let senders: Vec<Uuid> = sqlx::query_scalar(
            r#"
            WITH advanced AS (
                INSERT INTO message_recipient_status (message_id, recipient_id, status)
                SELECT m.id, $2, 'read'
                FROM messages m
                WHERE m.conversation_id = $1
                  AND m.id <= $3
                  AND m.sender_id <> $2
                  AND NOT m.deleted
                ON CONFLICT (message_id, recipient_id) DO UPDATE
                SET status = EXCLUDED.status, updated_at = NOW()
                WHERE CASE message_recipient_status.status
                          WHEN 'sent' THEN 0
                          WHEN 'delivered' THEN 1
                          ELSE 2
                      END < 2
                RETURNING message_id
            )
            SELECT DISTINCT m.sender_id
            FROM advanced a
            JOIN messages m ON m.id = a.message_id
            ORDER BY m.sender_id
            "#,
        )
        .bind(conversation_id.0)
        .bind(reader.0)
        .bind(up_to.0)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            UPDATE messages m
            SET status = 'read'
            FROM conversations c
            WHERE c.id = m.conversation_id
              AND c.kind = 'direct'
              AND m.conversation_id = $1
              AND m.id <= $2
              AND m.sender_id <> $3
              AND NOT m.deleted
              AND CASE m.status
                      WHEN 'sent' THEN 0
                      WHEN 'delivered' THEN 1
                      ELSE 2
                  END < 2
            "#,
        )
        .bind(conversation_id.0)
        .bind(up_to.0)
        .bind(reader.0)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(senders.into_iter().map(UserId::from).collect())
    }

    async fn update_body(&self, id: MessageId, body: String) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            UPDATE messages SET body = $2, edited = TRUE
            WHERE id = $1
            RETURNING id, conversation_id, sender_id, body, content_type, media_url,
                      status, edited, deleted, created_at
            "#,
        )
        .bind(id.0)
        .bind(body)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Message::try_from(record)
    }

    async fn delete_for_everyone(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE messages SET deleted = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn hide_for_user(&self, id: MessageId, user_id: UserId) -> Result<(), RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1)")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"
            INSERT INTO message_hidden (message_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id.0)
        .bind(user_id.0)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}

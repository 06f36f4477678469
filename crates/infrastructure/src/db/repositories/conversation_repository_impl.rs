//! 会话Repository实现
//!
//! 成员列表在查询时用 array_agg 一次聚合出来，避免逐会话的
//! 二次查询。成员增删依赖外键级联，删除会话即清空成员与消息。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Conversation, ConversationId, ConversationKind, DomainError, NewGroup, RepositoryError, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

use application::ConversationRepository;

use super::{invalid_data, map_sqlx_err};
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct ConversationRecord {
    id: i64,
    kind: String,
    name: Option<String>,
    description: Option<String>,
    avatar_url: Option<String>,
    admin_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    member_ids: Vec<Uuid>,
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = RepositoryError;

    fn try_from(value: ConversationRecord) -> Result<Self, Self::Error> {
        let kind = value
            .kind
            .parse()
            .map_err(|err: DomainError| invalid_data(err.to_string()))?;
        Ok(Conversation {
            id: ConversationId::new(value.id),
            kind,
            name: value.name,
            description: value.description,
            avatar_url: value.avatar_url,
            admin_id: value.admin_id.map(UserId::from),
            member_ids: value.member_ids.into_iter().map(UserId::from).collect(),
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgConversationRepository {
    pool: DbPool,
}

impl PgConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT c.id, c.kind, c.name, c.description, c.avatar_url, c.admin_id, c.created_at,
                   COALESCE(
                       array_agg(m.user_id ORDER BY m.joined_at, m.user_id)
                           FILTER (WHERE m.user_id IS NOT NULL),
                       '{}'
                   ) AS member_ids
            FROM conversations c
            LEFT JOIN conversation_members m ON m.conversation_id = c.id
            WHERE c.id = $1
            GROUP BY c.id
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Conversation::try_from).transpose()
    }

    async fn create_group(&self, group: NewGroup) -> Result<Conversation, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO conversations (kind, name, description, avatar_url, admin_id)
            VALUES ('group', $1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(group.name.as_str())
        .bind(&group.description)
        .bind(&group.avatar_url)
        .bind(group.admin_id.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let member_ids: Vec<Uuid> = group.member_ids.iter().map(|member| member.0).collect();
        sqlx::query(
            r#"
            INSERT INTO conversation_members (conversation_id, user_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(id)
        .bind(&member_ids)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        Ok(Conversation {
            id: ConversationId::new(id),
            kind: ConversationKind::Group,
            name: Some(group.name.into_inner()),
            description: group.description,
            avatar_url: group.avatar_url,
            admin_id: Some(group.admin_id),
            member_ids: group.member_ids,
            created_at,
        })
    }

    async fn add_member(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO conversation_members (conversation_id, user_id)
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

    async fn remove_member(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM conversation_members WHERE conversation_id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(user_id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn update_info(
        &self,
        id: ConversationId,
        name: Option<String>,
        description: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                avatar_url = COALESCE($4, avatar_url)
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(name)
        .bind(description)
        .bind(avatar_url)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_admin(
        &self,
        id: ConversationId,
        new_admin: UserId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET admin_id = $2 WHERE id = $1")
            .bind(id.0)
            .bind(new_admin.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: ConversationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

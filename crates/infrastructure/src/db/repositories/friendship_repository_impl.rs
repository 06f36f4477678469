//! 好友关系与好友请求Repository实现
//!
//! 好友关系按 (user_a < user_b) 规范化成对存储，
//! 任一方向的查询都落到同一行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    DomainError, FriendRequest, FriendRequestId, FriendRequestView, RepositoryError, UserId,
    UserSummary,
};
use sqlx::FromRow;
use uuid::Uuid;

use application::FriendshipRepository;

use super::user_repository_impl::UserRecord;
use super::{invalid_data, map_sqlx_err};
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct RequestRecord {
    id: i64,
    sender_id: Uuid,
    recipient_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RequestRecord> for FriendRequest {
    type Error = RepositoryError;

    fn try_from(value: RequestRecord) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse()
            .map_err(|err: DomainError| invalid_data(err.to_string()))?;
        Ok(FriendRequest {
            id: FriendRequestId::new(value.id),
            sender_id: UserId::from(value.sender_id),
            recipient_id: UserId::from(value.recipient_id),
            status,
            created_at: value.created_at,
        })
    }
}

/// 请求详情行，双方用户摘要一次查出
#[derive(Debug, FromRow)]
struct RequestViewRecord {
    id: i64,
    created_at: DateTime<Utc>,
    sender_id: Uuid,
    sender_username: String,
    sender_display_name: Option<String>,
    sender_avatar_url: Option<String>,
    sender_is_online: bool,
    sender_last_seen: Option<DateTime<Utc>>,
    recipient_id: Uuid,
    recipient_username: String,
    recipient_display_name: Option<String>,
    recipient_avatar_url: Option<String>,
    recipient_is_online: bool,
    recipient_last_seen: Option<DateTime<Utc>>,
}

impl From<RequestViewRecord> for FriendRequestView {
    fn from(record: RequestViewRecord) -> Self {
        FriendRequestView {
            id: FriendRequestId::new(record.id),
            sender: UserSummary {
                id: UserId::from(record.sender_id),
                username: record.sender_username,
                display_name: record.sender_display_name,
                avatar_url: record.sender_avatar_url,
                online: record.sender_is_online,
                last_seen: record.sender_last_seen,
            },
            recipient: UserSummary {
                id: UserId::from(record.recipient_id),
                username: record.recipient_username,
                display_name: record.recipient_display_name,
                avatar_url: record.recipient_avatar_url,
                online: record.recipient_is_online,
                last_seen: record.recipient_last_seen,
            },
            created_at: record.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgFriendshipRepository {
    pool: DbPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friendships
                WHERE user_a = LEAST($1, $2) AND user_b = GREATEST($1, $2)
            )
            "#,
        )
        .bind(a.0)
        .bind(b.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(exists)
    }

    async fn list_friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END
            FROM friendships
            WHERE user_a = $1 OR user_b = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(UserId::from).collect())
    }

    async fn list_friends(&self, user_id: UserId) -> Result<Vec<UserSummary>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url, u.is_online, u.last_seen
            FROM friendships f
            JOIN users u ON u.id = CASE WHEN f.user_a = $1 THEN f.user_b ELSE f.user_a END
            WHERE f.user_a = $1 OR f.user_b = $1
            ORDER BY u.username
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(UserSummary::from).collect())
    }

    async fn create_request(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<FriendRequest, RepositoryError> {
        let record = sqlx::query_as::<_, RequestRecord>(
            r#"
            INSERT INTO friend_requests (sender_id, recipient_id)
            VALUES ($1, $2)
            RETURNING id, sender_id, recipient_id, status, created_at
            "#,
        )
        .bind(sender.0)
        .bind(recipient.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        FriendRequest::try_from(record)
    }

    async fn find_request(
        &self,
        id: FriendRequestId,
    ) -> Result<Option<FriendRequest>, RepositoryError> {
        let record = sqlx::query_as::<_, RequestRecord>(
            r#"
            SELECT id, sender_id, recipient_id, status, created_at
            FROM friend_requests
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(FriendRequest::try_from).transpose()
    }

    async fn pending_request_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friend_requests
                WHERE status = 'pending'
                  AND ((sender_id = $1 AND recipient_id = $2)
                    OR (sender_id = $2 AND recipient_id = $1))
            )
            "#,
        )
        .bind(a.0)
        .bind(b.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(exists)
    }

    async fn accept_request(&self, id: FriendRequestId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let pair: Option<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            UPDATE friend_requests SET status = 'accepted'
            WHERE id = $1 AND status = 'pending'
            RETURNING sender_id, recipient_id
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        let Some((sender_id, recipient_id)) = pair else {
            return Err(RepositoryError::NotFound);
        };

        sqlx::query(
            r#"
            INSERT INTO friendships (user_a, user_b)
            VALUES (LEAST($1, $2), GREATEST($1, $2))
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(sender_id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn reject_request(&self, id: FriendRequestId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE friend_requests SET status = 'rejected' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn view(
        &self,
        id: FriendRequestId,
    ) -> Result<Option<FriendRequestView>, RepositoryError> {
        let record = sqlx::query_as::<_, RequestViewRecord>(
            r#"
            SELECT r.id, r.created_at,
                   s.id AS sender_id, s.username AS sender_username,
                   s.display_name AS sender_display_name, s.avatar_url AS sender_avatar_url,
                   s.is_online AS sender_is_online, s.last_seen AS sender_last_seen,
                   t.id AS recipient_id, t.username AS recipient_username,
                   t.display_name AS recipient_display_name, t.avatar_url AS recipient_avatar_url,
                   t.is_online AS recipient_is_online, t.last_seen AS recipient_last_seen
            FROM friend_requests r
            JOIN users s ON s.id = r.sender_id
            JOIN users t ON t.id = r.recipient_id
            WHERE r.id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(FriendRequestView::from))
    }

    async fn list_sent(&self, user_id: UserId) -> Result<Vec<FriendRequestView>, RepositoryError> {
        let records = sqlx::query_as::<_, RequestViewRecord>(
            r#"
            SELECT r.id, r.created_at,
                   s.id AS sender_id, s.username AS sender_username,
                   s.display_name AS sender_display_name, s.avatar_url AS sender_avatar_url,
                   s.is_online AS sender_is_online, s.last_seen AS sender_last_seen,
                   t.id AS recipient_id, t.username AS recipient_username,
                   t.display_name AS recipient_display_name, t.avatar_url AS recipient_avatar_url,
                   t.is_online AS recipient_is_online, t.last_seen AS recipient_last_seen
            FROM friend_requests r
            JOIN users s ON s.id = r.sender_id
            JOIN users t ON t.id = r.recipient_id
            WHERE r.sender_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(FriendRequestView::from).collect())
    }

    async fn list_received(
        &self,
        user_id: UserId,
    ) -> Result<Vec<FriendRequestView>, RepositoryError> {
        let records = sqlx::query_as::<_, RequestViewRecord>(
            r#"
            SELECT r.id, r.created_at,
                   s.id AS sender_id, s.username AS sender_username,
                   s.display_name AS sender_display_name, s.avatar_url AS sender_avatar_url,
                   s.is_online AS sender_is_online, s.last_seen AS sender_last_seen,
                   t.id AS recipient_id, t.username AS recipient_username,
                   t.display_name AS recipient_display_name, t.avatar_url AS recipient_avatar_url,
                   t.is_online AS recipient_is_online, t.last_seen AS recipient_last_seen
            FROM friend_requests r
            JOIN users s ON s.id = r.sender_id
            JOIN users t ON t.id = r.recipient_id
            WHERE r.recipient_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(FriendRequestView::from).collect())
    }
}

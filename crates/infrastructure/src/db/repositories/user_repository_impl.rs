//! 用户Repository实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{RepositoryError, Timestamp, UserId, UserSummary};
use sqlx::FromRow;
use uuid::Uuid;

use application::UserRepository;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库用户模型
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<UserRecord> for UserSummary {
    fn from(record: UserRecord) -> Self {
        UserSummary {
            id: UserId::from(record.id),
            username: record.username,
            display_name: record.display_name,
            avatar_url: record.avatar_url,
            online: record.is_online,
            last_seen: record.last_seen,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, display_name, avatar_url, is_online, last_seen
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(UserSummary::from))
    }

    async fn set_online(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET is_online = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn set_offline(&self, id: UserId, last_seen: Timestamp) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET is_online = FALSE, last_seen = $2 WHERE id = $1")
            .bind(id.0)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

//! PostgreSQL 仓储实现
//!
//! 实现应用层定义的仓储接口。枚举一律以小写字符串落库，
//! 读取时解析回领域类型，解析失败按存储错误上报。

use std::sync::Arc;

use domain::RepositoryError;

use crate::db::DbPool;

pub mod conversation_repository_impl;
pub mod friendship_repository_impl;
pub mod message_repository_impl;
pub mod user_repository_impl;

pub use conversation_repository_impl::PgConversationRepository;
pub use friendship_repository_impl::PgFriendshipRepository;
pub use message_repository_impl::PgMessageRepository;
pub use user_repository_impl::PgUserRepository;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

pub(crate) fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

/// 全套 PostgreSQL 仓储与共享连接池
#[derive(Clone)]
pub struct PgStorage {
    pub pool: DbPool,
    pub user_repository: Arc<PgUserRepository>,
    pub friendship_repository: Arc<PgFriendshipRepository>,
    pub conversation_repository: Arc<PgConversationRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            friendship_repository: Arc::new(PgFriendshipRepository::new(pool.clone())),
            conversation_repository: Arc::new(PgConversationRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

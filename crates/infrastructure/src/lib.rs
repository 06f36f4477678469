//! 基础设施层实现。
//!
//! 提供 PostgreSQL 连接池、迁移和应用层仓储接口的数据库适配器。

pub mod db;
pub mod migrations;

pub use db::repositories::{
    PgConversationRepository, PgFriendshipRepository, PgMessageRepository, PgStorage,
    PgUserRepository,
};
pub use db::{create_pg_pool, DbPool};
pub use migrations::MIGRATOR;

//! 内嵌数据库迁移
//!
//! 迁移文件随二进制打包，启动时由 main 统一执行。

/// 工作区根目录 migrations/ 下的全部迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

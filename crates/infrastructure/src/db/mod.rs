//! 数据库连接池与仓储实现

use sqlx::{postgres::PgPoolOptions, PgPool};

pub mod repositories;

pub type DbPool = PgPool;

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

//! 主应用程序入口
//!
//! 装配存储、应用服务与 Web API，启动 Axum 服务。

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use application::{
    BroadcastGroups, CallService, CallServiceDependencies, CallSessionRegistry, FriendService,
    FriendServiceDependencies, GroupService, GroupServiceDependencies, MessageService,
    MessageServiceDependencies, PresenceRegistry, SessionService, SessionServiceDependencies,
    SystemClock,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, PgStorage, MIGRATOR};
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config
            .database
            .url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    MIGRATOR.run(&pg_pool).await?;

    let storage = PgStorage::new(pg_pool);

    // 进程内注册表：在线状态、广播组、通话会话
    let presence = Arc::new(PresenceRegistry::new());
    let groups = Arc::new(BroadcastGroups::new());
    let calls = Arc::new(CallSessionRegistry::new());

    // 应用层服务
    let session_service = Arc::new(SessionService::new(SessionServiceDependencies {
        user_repository: storage.user_repository.clone(),
        friendship_repository: storage.friendship_repository.clone(),
        presence: presence.clone(),
        groups: groups.clone(),
        clock: Arc::new(SystemClock),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: storage.message_repository.clone(),
        conversation_repository: storage.conversation_repository.clone(),
        friendship_repository: storage.friendship_repository.clone(),
        user_repository: storage.user_repository.clone(),
        presence: presence.clone(),
        groups: groups.clone(),
    }));
    let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
        conversation_repository: storage.conversation_repository.clone(),
        user_repository: storage.user_repository.clone(),
        groups: groups.clone(),
    }));
    let friend_service = Arc::new(FriendService::new(FriendServiceDependencies {
        friendship_repository: storage.friendship_repository.clone(),
        user_repository: storage.user_repository.clone(),
        groups: groups.clone(),
    }));
    let call_service = Arc::new(CallService::new(CallServiceDependencies {
        calls,
        presence: presence.clone(),
        groups: groups.clone(),
    }));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(
        session_service,
        message_service,
        group_service,
        friend_service,
        call_service,
        presence,
        groups,
        jwt_service,
    );

    // 启动 Web 服务器
    let app = router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "无法监听 Ctrl+C 信号");
    }
    tracing::info!("收到关停信号，开始优雅退出");
}

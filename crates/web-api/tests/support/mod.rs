//! 集成测试支撑
//!
//! 用内存仓储搭起完整路由，测试自行播种用户并签发令牌，
//! 不依赖外部数据库。仓储句柄保留在外，服务器跑起来之后
//! 仍然可以继续播种。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;

use application::{
    repository::memory::{
        MemoryConversationRepository, MemoryFriendshipRepository, MemoryMessageRepository,
        MemoryUserRepository,
    },
    BroadcastGroups, CallService, CallServiceDependencies, CallSessionRegistry, FriendService,
    FriendServiceDependencies, GroupService, GroupServiceDependencies, MessageService,
    MessageServiceDependencies, PresenceRegistry, SessionService, SessionServiceDependencies,
    SystemClock,
};
use domain::{UserId, UserSummary};
use web_api::{router, AppState, JwtConfig, JwtService};

/// 内存后端的完整应用
pub struct TestApp {
    pub users: Arc<MemoryUserRepository>,
    pub friendships: Arc<MemoryFriendshipRepository>,
    pub jwt_service: Arc<JwtService>,
    state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserRepository::new());
        let friendships = Arc::new(MemoryFriendshipRepository::new(users.clone()));
        let conversations = Arc::new(MemoryConversationRepository::new());
        let messages = Arc::new(MemoryMessageRepository::new(conversations.clone()));
        let presence = Arc::new(PresenceRegistry::new());
        let groups = Arc::new(BroadcastGroups::new());
        let calls = Arc::new(CallSessionRegistry::new());

        let session_service = Arc::new(SessionService::new(SessionServiceDependencies {
            user_repository: users.clone(),
            friendship_repository: friendships.clone(),
            presence: presence.clone(),
            groups: groups.clone(),
            clock: Arc::new(SystemClock),
        }));
        let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
            message_repository: messages.clone(),
            conversation_repository: conversations.clone(),
            friendship_repository: friendships.clone(),
            user_repository: users.clone(),
            presence: presence.clone(),
            groups: groups.clone(),
        }));
        let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
            conversation_repository: conversations.clone(),
            user_repository: users.clone(),
            groups: groups.clone(),
        }));
        let friend_service = Arc::new(FriendService::new(FriendServiceDependencies {
            friendship_repository: friendships.clone(),
            user_repository: users.clone(),
            groups: groups.clone(),
        }));
        let call_service = Arc::new(CallService::new(CallServiceDependencies {
            calls,
            presence: presence.clone(),
            groups: groups.clone(),
        }));

        let jwt_service = Arc::new(JwtService::new(JwtConfig {
            secret: "test-secret-key-of-sufficient-length".to_string(),
            expiration_hours: 24,
        }));

        let state = AppState::new(
            session_service,
            message_service,
            group_service,
            friend_service,
            call_service,
            presence,
            groups,
            jwt_service.clone(),
        );

        Self {
            users,
            friendships,
            jwt_service,
            state,
        }
    }

    /// 播种一个用户
    pub async fn seed_user(&self, username: &str) -> UserId {
        let id = UserId::new(uuid::Uuid::new_v4());
        self.users
            .insert(UserSummary {
                id,
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
                online: false,
                last_seen: None,
            })
            .await;
        id
    }

    /// 播种两个互为好友的用户
    pub async fn seed_friends(&self, a: &str, b: &str) -> (UserId, UserId) {
        let a = self.seed_user(a).await;
        let b = self.seed_user(b).await;
        self.friendships.insert_friendship(a, b).await;
        (a, b)
    }

    /// 为用户签发测试令牌
    pub fn token_for(&self, user_id: UserId) -> String {
        self.jwt_service
            .generate_token(user_id.0)
            .expect("issue test token")
    }

    /// 在随机端口上启动服务器，返回地址与关停句柄
    pub async fn spawn(&self) -> (SocketAddr, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(self.state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // 等待服务器启动
        sleep(Duration::from_millis(100)).await;
        (addr, shutdown_tx)
    }
}

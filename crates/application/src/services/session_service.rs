use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use domain::{ConnectionId, ServerEvent, UserId};

use crate::{
    clock::Clock,
    error::ApplicationError,
    groups::{user_group, BroadcastGroups},
    presence::PresenceRegistry,
    repository::{FriendshipRepository, UserRepository},
};

pub struct SessionServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub friendship_repository: Arc<dyn FriendshipRepository>,
    pub presence: Arc<PresenceRegistry>,
    pub groups: Arc<BroadcastGroups>,
    pub clock: Arc<dyn Clock>,
}

/// 连接生命周期
///
/// connect 在鉴权后、收首条消息前调用；disconnect 在连接
/// 关闭后必定调用一次，且从不失败：清理路径上的错误只记
/// 日志，不向上传播。
pub struct SessionService {
    deps: SessionServiceDependencies,
}

impl SessionService {
    pub fn new(deps: SessionServiceDependencies) -> Self {
        Self { deps }
    }

    /// 连接建立：登记连接、订阅个人组、标记在线并广播上线
    ///
    /// 上线广播每次连接都发，哪怕用户已有其他在线设备。信号
    /// 幂等，好友端的状态显示因此可以自愈。
    pub async fn connect(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: UnboundedSender<ServerEvent>,
    ) -> Result<(), ApplicationError> {
        self.deps.groups.register_connection(connection_id, sender);
        self.deps.groups.subscribe(user_group(user_id), connection_id);
        let connection_count = self.deps.presence.register(user_id, connection_id);

        self.deps.user_repository.set_online(user_id).await?;

        let event = ServerEvent::user_status_changed(user_id, true, None);
        let friend_ids = self
            .deps
            .friendship_repository
            .list_friend_ids(user_id)
            .await?;
        for friend_id in friend_ids {
            self.deps.groups.send_to_user(friend_id, &event);
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            connections = connection_count,
            "用户连接建立"
        );
        Ok(())
    }

    /// 连接关闭：注销登记并在最后一个连接断开时广播离线
    ///
    /// 离线广播以 unregister 的返回值为准，无论多少连接并发
    /// 断开，每次"完全离线"只广播一次。
    pub async fn disconnect(&self, user_id: UserId, connection_id: ConnectionId) {
        self.deps.groups.drop_connection(connection_id);
        let became_offline = self.deps.presence.unregister(user_id, connection_id);

        if !became_offline {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "连接关闭，用户仍有其他在线连接"
            );
            return;
        }

        let last_seen = self.deps.clock.now();
        if let Err(error) = self
            .deps
            .user_repository
            .set_offline(user_id, last_seen)
            .await
        {
            tracing::error!(user_id = %user_id, error = %error, "离线状态落库失败");
        }

        let event = ServerEvent::user_status_changed(user_id, false, Some(last_seen));
        match self
            .deps
            .friendship_repository
            .list_friend_ids(user_id)
            .await
        {
            Ok(friend_ids) => {
                for friend_id in friend_ids {
                    self.deps.groups.send_to_user(friend_id, &event);
                }
            }
            Err(error) => {
                tracing::error!(user_id = %user_id, error = %error, "获取好友列表失败，跳过离线广播");
            }
        }

        tracing::info!(user_id = %user_id, connection_id = %connection_id, "用户完全离线");
    }
}

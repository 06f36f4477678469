use std::sync::Arc;

use application::{
    BroadcastGroups, CallService, FriendService, GroupService, MessageService, PresenceRegistry,
    SessionService,
};

use crate::JwtService;

/// 路由共享状态
///
/// 全部字段都是 Arc，克隆廉价，每个请求/连接各持一份。
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub message_service: Arc<MessageService>,
    pub group_service: Arc<GroupService>,
    pub friend_service: Arc<FriendService>,
    pub call_service: Arc<CallService>,
    pub presence: Arc<PresenceRegistry>,
    pub groups: Arc<BroadcastGroups>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_service: Arc<SessionService>,
        message_service: Arc<MessageService>,
        group_service: Arc<GroupService>,
        friend_service: Arc<FriendService>,
        call_service: Arc<CallService>,
        presence: Arc<PresenceRegistry>,
        groups: Arc<BroadcastGroups>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            session_service,
            message_service,
            group_service,
            friend_service,
            call_service,
            presence,
            groups,
            jwt_service,
        }
    }
}

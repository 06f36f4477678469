//! 好友请求服务
//!
//! 发送、接受、拒绝好友请求。每次状态变化都把双方的
//! 请求列表（和接受后的好友列表）整体推送下去，客户端
//! 不用自己维护增量。

use std::sync::Arc;

use domain::{DomainError, FriendRequestId, RepositoryError, ServerEvent, UserId, UserSummary};

use crate::{
    error::ApplicationError,
    groups::BroadcastGroups,
    repository::{FriendshipRepository, UserRepository},
};

pub struct FriendServiceDependencies {
    pub friendship_repository: Arc<dyn FriendshipRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub groups: Arc<BroadcastGroups>,
}

pub struct FriendService {
    deps: FriendServiceDependencies,
}

impl FriendService {
    pub fn new(deps: FriendServiceDependencies) -> Self {
        Self { deps }
    }

    async fn user_summary(&self, user_id: UserId) -> Result<UserSummary, ApplicationError> {
        let summary = self
            .deps
            .user_repository
            .find_summary(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id.to_string()))?;
        Ok(summary)
    }

    async fn push_sent_requests(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let requests = self.deps.friendship_repository.list_sent(user_id).await?;
        self.deps
            .groups
            .send_to_user(user_id, &ServerEvent::SentRequestsUpdated { requests });
        Ok(())
    }

    async fn push_received_requests(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let requests = self
            .deps
            .friendship_repository
            .list_received(user_id)
            .await?;
        self.deps
            .groups
            .send_to_user(user_id, &ServerEvent::ReceivedRequestsUpdated { requests });
        Ok(())
    }

    async fn push_friends_list(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let friends = self.deps.friendship_repository.list_friends(user_id).await?;
        self.deps
            .groups
            .send_to_user(user_id, &ServerEvent::FriendsListUpdated { friends });
        Ok(())
    }

    pub async fn send(
        &self,
        actor_id: UserId,
        recipient_id: UserId,
    ) -> Result<(), ApplicationError> {
        if actor_id == recipient_id {
            return Err(
                DomainError::invalid_argument("recipientId", "cannot friend yourself").into(),
            );
        }
        self.user_summary(recipient_id).await?;

        if self
            .deps
            .friendship_repository
            .are_friends(actor_id, recipient_id)
            .await?
        {
            return Err(DomainError::AlreadyFriends.into());
        }
        // 双向去重：任一方向已有待处理请求都算重复
        if self
            .deps
            .friendship_repository
            .pending_request_between(actor_id, recipient_id)
            .await?
        {
            return Err(DomainError::DuplicateFriendRequest.into());
        }

        let request = self
            .deps
            .friendship_repository
            .create_request(actor_id, recipient_id)
            .await?;
        let view = self
            .deps
            .friendship_repository
            .view(request.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        self.deps.groups.send_to_user(
            recipient_id,
            &ServerEvent::FriendRequestReceived {
                request: view.clone(),
            },
        );
        self.push_received_requests(recipient_id).await?;

        self.deps
            .groups
            .send_to_user(actor_id, &ServerEvent::FriendRequestSent { request: view });
        self.push_sent_requests(actor_id).await?;

        tracing::info!(sender_id = %actor_id, recipient_id = %recipient_id, "好友请求已发送");
        Ok(())
    }

    pub async fn accept(
        &self,
        actor_id: UserId,
        request_id: FriendRequestId,
    ) -> Result<(), ApplicationError> {
        let request = self
            .deps
            .friendship_repository
            .find_request(request_id)
            .await?
            .ok_or_else(|| DomainError::friend_request_not_found(request_id.to_string()))?;
        if request.recipient_id != actor_id {
            return Err(DomainError::NotRequestRecipient.into());
        }
        if !request.is_pending() {
            return Err(DomainError::operation_not_allowed("request is not pending").into());
        }

        self.deps
            .friendship_repository
            .accept_request(request_id)
            .await?;

        let sender_summary = self.user_summary(request.sender_id).await?;
        let recipient_summary = self.user_summary(actor_id).await?;

        // 发起方：收到新好友的资料 + 刷新好友和已发送列表
        self.deps.groups.send_to_user(
            request.sender_id,
            &ServerEvent::FriendRequestAccepted {
                friend: recipient_summary,
            },
        );
        self.push_friends_list(request.sender_id).await?;
        self.push_sent_requests(request.sender_id).await?;

        // 接受方：确认事件 + 刷新好友和收到列表
        self.deps.groups.send_to_user(
            actor_id,
            &ServerEvent::FriendRequestAcceptedConfirm {
                friend: sender_summary,
            },
        );
        self.push_friends_list(actor_id).await?;
        self.push_received_requests(actor_id).await?;

        tracing::info!(request_id = %request_id, "好友请求已接受");
        Ok(())
    }

    pub async fn reject(
        &self,
        actor_id: UserId,
        request_id: FriendRequestId,
    ) -> Result<(), ApplicationError> {
        let request = self
            .deps
            .friendship_repository
            .find_request(request_id)
            .await?
            .ok_or_else(|| DomainError::friend_request_not_found(request_id.to_string()))?;
        if request.recipient_id != actor_id {
            return Err(DomainError::NotRequestRecipient.into());
        }
        if !request.is_pending() {
            return Err(DomainError::operation_not_allowed("request is not pending").into());
        }

        self.deps
            .friendship_repository
            .reject_request(request_id)
            .await?;

        self.deps.groups.send_to_user(
            request.sender_id,
            &ServerEvent::FriendRequestRejected { request_id },
        );
        self.push_sent_requests(request.sender_id).await?;

        self.deps.groups.send_to_user(
            actor_id,
            &ServerEvent::FriendRequestRejectedConfirm { request_id },
        );
        self.push_received_requests(actor_id).await?;
        Ok(())
    }
}

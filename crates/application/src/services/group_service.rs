//! 群组管理服务
//!
//! 任何成员可以拉人，其余管理操作（踢人、改资料、转让、
//! 解散）只限群主。每个操作都先落库，再向受影响的成员
//! 广播携带最新群状态的事件。

use std::sync::Arc;

use domain::{
    Conversation, ConversationId, DomainError, GroupName, GroupPayload, NewGroup, ServerEvent,
    UserId,
};

use crate::{
    error::ApplicationError,
    groups::BroadcastGroups,
    repository::{ConversationRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub creator_id: UserId, // 创建者（从连接身份获取），自动成为群主
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub member_ids: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct UpdateGroupInfoRequest {
    pub actor_id: UserId,
    pub group_id: ConversationId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct GroupServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub groups: Arc<BroadcastGroups>,
}

pub struct GroupService {
    deps: GroupServiceDependencies,
}

impl GroupService {
    pub fn new(deps: GroupServiceDependencies) -> Self {
        Self { deps }
    }

    async fn group_by_id(&self, id: ConversationId) -> Result<Conversation, ApplicationError> {
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::group_not_found(id.to_string()))?;
        if !conversation.is_group() {
            return Err(DomainError::operation_not_allowed("not a group conversation").into());
        }
        Ok(conversation)
    }

    /// 群主权限检查
    async fn check_admin(
        &self,
        group_id: ConversationId,
        user_id: UserId,
    ) -> Result<Conversation, ApplicationError> {
        let conversation = self.group_by_id(group_id).await?;
        if !conversation.is_member(user_id) {
            return Err(DomainError::NotConversationMember.into());
        }
        if !conversation.is_admin(user_id) {
            return Err(DomainError::AdminRequired.into());
        }
        Ok(conversation)
    }

    async fn ensure_user_exists(&self, user_id: UserId) -> Result<(), ApplicationError> {
        self.deps
            .user_repository
            .find_summary(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id.to_string()))?;
        Ok(())
    }

    fn broadcast_to_members(&self, conversation: &Conversation, event: &ServerEvent) {
        for member_id in &conversation.member_ids {
            self.deps.groups.send_to_user(*member_id, event);
        }
    }

    pub async fn create(
        &self,
        request: CreateGroupRequest,
    ) -> Result<Conversation, ApplicationError> {
        let name = GroupName::parse(request.name)?;

        // 去重，创建者始终是第一个成员
        let mut member_ids = vec![request.creator_id];
        for member_id in request.member_ids {
            if !member_ids.contains(&member_id) {
                member_ids.push(member_id);
            }
        }
        for member_id in &member_ids {
            self.ensure_user_exists(*member_id).await?;
        }

        let conversation = self
            .deps
            .conversation_repository
            .create_group(NewGroup {
                name,
                description: request.description,
                avatar_url: request.avatar_url,
                admin_id: request.creator_id,
                member_ids,
            })
            .await?;

        let event = ServerEvent::GroupCreated {
            group: GroupPayload::from(&conversation),
        };
        self.broadcast_to_members(&conversation, &event);

        tracing::info!(
            group_id = %conversation.id,
            admin_id = %request.creator_id,
            members = conversation.member_ids.len(),
            "群组已创建"
        );
        Ok(conversation)
    }

    /// 拉人入群，任何成员都可以操作
    pub async fn add_member(
        &self,
        actor_id: UserId,
        group_id: ConversationId,
        member_id: UserId,
    ) -> Result<(), ApplicationError> {
        let conversation = self.group_by_id(group_id).await?;
        if !conversation.is_member(actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }
        if conversation.is_member(member_id) {
            return Err(DomainError::operation_not_allowed("user is already a member").into());
        }
        self.ensure_user_exists(member_id).await?;

        self.deps
            .conversation_repository
            .add_member(group_id, member_id)
            .await?;
        let updated = self.group_by_id(group_id).await?;

        let event = ServerEvent::GroupMemberAdded {
            group: GroupPayload::from(&updated),
            member_id,
        };
        self.broadcast_to_members(&updated, &event);
        Ok(())
    }

    /// 踢出成员，只限群主，群主自己不能被踢
    pub async fn remove_member(
        &self,
        actor_id: UserId,
        group_id: ConversationId,
        member_id: UserId,
    ) -> Result<(), ApplicationError> {
        let conversation = self.check_admin(group_id, actor_id).await?;
        if !conversation.is_member(member_id) {
            return Err(DomainError::operation_not_allowed("user is not a member").into());
        }
        if conversation.is_admin(member_id) {
            return Err(DomainError::operation_not_allowed("cannot remove the group admin").into());
        }

        self.deps
            .conversation_repository
            .remove_member(group_id, member_id)
            .await?;
        let updated = self.group_by_id(group_id).await?;

        let event = ServerEvent::GroupMemberRemoved {
            group: GroupPayload::from(&updated),
            member_id,
        };
        self.broadcast_to_members(&updated, &event);

        // 被移出者收到单独通知，告知是哪个群
        self.deps.groups.send_to_user(
            member_id,
            &ServerEvent::RemovedFromGroup {
                group_id: updated.id,
                group_name: updated.name.clone().unwrap_or_default(),
            },
        );
        Ok(())
    }

    /// 主动退群；群主必须先转让才能退
    pub async fn leave(
        &self,
        actor_id: UserId,
        group_id: ConversationId,
    ) -> Result<(), ApplicationError> {
        let conversation = self.group_by_id(group_id).await?;
        if !conversation.is_member(actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }
        if conversation.is_admin(actor_id) {
            return Err(DomainError::AdminCannotLeave.into());
        }

        self.deps
            .conversation_repository
            .remove_member(group_id, actor_id)
            .await?;
        let updated = self.group_by_id(group_id).await?;

        let event = ServerEvent::GroupLeft {
            group: GroupPayload::from(&updated),
            user_id: actor_id,
        };
        self.broadcast_to_members(&updated, &event);
        // 退群者本人的其他设备也要同步
        self.deps.groups.send_to_user(actor_id, &event);
        Ok(())
    }

    pub async fn update_info(
        &self,
        request: UpdateGroupInfoRequest,
    ) -> Result<(), ApplicationError> {
        self.check_admin(request.group_id, request.actor_id).await?;

        let name = match request.name {
            Some(raw) => Some(GroupName::parse(raw)?.into_inner()),
            None => None,
        };
        self.deps
            .conversation_repository
            .update_info(
                request.group_id,
                name,
                request.description,
                request.avatar_url,
            )
            .await?;
        let updated = self.group_by_id(request.group_id).await?;

        let event = ServerEvent::GroupInfoUpdated {
            group: GroupPayload::from(&updated),
        };
        self.broadcast_to_members(&updated, &event);
        Ok(())
    }

    pub async fn transfer_admin(
        &self,
        actor_id: UserId,
        group_id: ConversationId,
        new_admin_id: UserId,
    ) -> Result<(), ApplicationError> {
        let conversation = self.check_admin(group_id, actor_id).await?;
        if new_admin_id == actor_id {
            return Err(DomainError::operation_not_allowed("already the admin").into());
        }
        if !conversation.is_member(new_admin_id) {
            return Err(DomainError::operation_not_allowed("user is not a member").into());
        }

        self.deps
            .conversation_repository
            .set_admin(group_id, new_admin_id)
            .await?;
        let updated = self.group_by_id(group_id).await?;

        let event = ServerEvent::AdminTransferred {
            group: GroupPayload::from(&updated),
            new_admin_id,
        };
        self.broadcast_to_members(&updated, &event);

        tracing::info!(group_id = %group_id, new_admin_id = %new_admin_id, "群主已转让");
        Ok(())
    }

    pub async fn delete(
        &self,
        actor_id: UserId,
        group_id: ConversationId,
    ) -> Result<(), ApplicationError> {
        // 先留住成员名单，删完还要通知他们
        let conversation = self.check_admin(group_id, actor_id).await?;
        let member_ids = conversation.member_ids.clone();

        self.deps.conversation_repository.delete(group_id).await?;

        let event = ServerEvent::GroupDeleted { group_id };
        for member_id in member_ids {
            self.deps.groups.send_to_user(member_id, &event);
        }

        tracing::info!(group_id = %group_id, admin_id = %actor_id, "群组已解散");
        Ok(())
    }
}

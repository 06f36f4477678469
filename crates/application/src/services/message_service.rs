//! 消息扇出服务
//!
//! 私聊、群聊、状态回执、编辑删除转发都走同一条流水线：
//! 校验 -> 持久化 -> 计算接收者 -> 经广播组递送。
//! 持久化失败直接返回错误，零广播。

use std::sync::Arc;

use domain::{
    ContentKind, Conversation, ConversationId, DomainError, Message, MessageContent, MessageDraft,
    MessageId, MessagePayload, MessageStatus, ServerEvent, UserId, UserSummary,
};

use crate::{
    error::ApplicationError,
    groups::BroadcastGroups,
    presence::PresenceRegistry,
    repository::{
        ConversationRepository, FriendshipRepository, MessageRepository, UserRepository,
    },
};

#[derive(Debug, Clone)]
pub struct SendDirectRequest {
    pub sender_id: UserId, // 发送者（从连接身份获取）
    pub recipient_id: UserId,
    pub body: String,
    pub content_type: ContentKind,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendGroupMessageRequest {
    pub sender_id: UserId,
    pub group_id: ConversationId,
    pub body: String,
    pub content_type: ContentKind,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EditMessageRequest {
    pub actor_id: UserId,
    pub message_id: MessageId,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub actor_id: UserId,
    pub message_id: MessageId,
    pub for_everyone: bool,
}

#[derive(Debug, Clone)]
pub struct ForwardMessageRequest {
    pub actor_id: UserId,
    pub message_id: MessageId,
    pub target_conversation_id: ConversationId,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub friendship_repository: Arc<dyn FriendshipRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub presence: Arc<PresenceRegistry>,
    pub groups: Arc<BroadcastGroups>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    async fn sender_summary(&self, user_id: UserId) -> Result<UserSummary, ApplicationError> {
        self.deps
            .user_repository
            .find_summary(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id.to_string()).into())
    }

    async fn conversation_of(&self, message: &Message) -> Result<Conversation, ApplicationError> {
        self.deps
            .conversation_repository
            .find_by_id(message.conversation_id)
            .await?
            .ok_or_else(|| {
                DomainError::conversation_not_found(message.conversation_id.to_string()).into()
            })
    }

    async fn message_by_id(&self, id: MessageId) -> Result<Message, ApplicationError> {
        self.deps
            .message_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::message_not_found(id.to_string()).into())
    }

    /// 接收者在线时乐观推进到已送达，确有推进才通知发送方
    async fn escalate_delivered(
        &self,
        message: &Message,
        recipient_id: UserId,
    ) -> Result<bool, ApplicationError> {
        if !self.deps.presence.is_online(recipient_id) {
            return Ok(false);
        }
        let applied = self
            .deps
            .message_repository
            .update_status(message.id, recipient_id, MessageStatus::Delivered)
            .await?;
        if applied {
            self.deps.groups.send_to_user(
                message.sender_id,
                &ServerEvent::MessageStatusUpdated {
                    message_id: message.id,
                    conversation_id: message.conversation_id,
                    recipient_id,
                    status: MessageStatus::Delivered,
                },
            );
        }
        Ok(applied)
    }

    pub async fn send_direct(
        &self,
        request: SendDirectRequest,
    ) -> Result<Message, ApplicationError> {
        if request.sender_id == request.recipient_id {
            return Err(
                DomainError::invalid_argument("recipientId", "cannot message yourself").into(),
            );
        }
        let draft = MessageDraft::new(
            MessageContent::new(request.body)?,
            request.content_type,
            request.media_url,
        )?;

        if !self
            .deps
            .friendship_repository
            .are_friends(request.sender_id, request.recipient_id)
            .await?
        {
            return Err(DomainError::NotFriends.into());
        }

        let sender = self.sender_summary(request.sender_id).await?;
        let message = self
            .deps
            .message_repository
            .create_direct(request.sender_id, request.recipient_id, draft)
            .await?;

        let mut payload = MessagePayload::new(&message, &sender);
        self.deps.groups.send_to_user(
            request.recipient_id,
            &ServerEvent::MessageReceived {
                message: payload.clone(),
            },
        );

        if self
            .escalate_delivered(&message, request.recipient_id)
            .await?
        {
            payload.status = MessageStatus::Delivered;
        }
        self.deps.groups.send_to_user(
            request.sender_id,
            &ServerEvent::MessageSent { message: payload },
        );

        tracing::debug!(
            message_id = %message.id,
            sender_id = %request.sender_id,
            recipient_id = %request.recipient_id,
            "私聊消息已递送"
        );
        Ok(message)
    }

    pub async fn send_group(
        &self,
        request: SendGroupMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let draft = MessageDraft::new(
            MessageContent::new(request.body)?,
            request.content_type,
            request.media_url,
        )?;

        // 成员列表每次现查，不信任连接建立时的快照
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(request.group_id)
            .await?
            .ok_or_else(|| DomainError::group_not_found(request.group_id.to_string()))?;
        if !conversation.is_group() {
            return Err(DomainError::operation_not_allowed("not a group conversation").into());
        }
        if !conversation.is_member(request.sender_id) {
            return Err(DomainError::NotConversationMember.into());
        }

        let sender = self.sender_summary(request.sender_id).await?;
        let message = self
            .deps
            .message_repository
            .create_in_conversation(conversation.id, request.sender_id, draft)
            .await?;

        let payload = MessagePayload::new(&message, &sender);
        let received = ServerEvent::MessageReceived {
            message: payload.clone(),
        };
        for recipient_id in conversation.recipients_excluding(request.sender_id) {
            self.deps.groups.send_to_user(recipient_id, &received);
            self.escalate_delivered(&message, recipient_id).await?;
        }

        self.deps.groups.send_to_user(
            request.sender_id,
            &ServerEvent::MessageSent { message: payload },
        );

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            members = conversation.member_ids.len(),
            "群聊消息已递送"
        );
        Ok(message)
    }

    pub async fn mark_delivered(
        &self,
        actor_id: UserId,
        message_id: MessageId,
    ) -> Result<(), ApplicationError> {
        let message = self.message_by_id(message_id).await?;
        if message.is_sender(actor_id) {
            return Err(
                DomainError::operation_not_allowed("cannot acknowledge your own message").into(),
            );
        }
        let conversation = self.conversation_of(&message).await?;
        if !conversation.is_member(actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }

        let applied = self
            .deps
            .message_repository
            .update_status(message.id, actor_id, MessageStatus::Delivered)
            .await?;
        if applied {
            self.deps.groups.send_to_user(
                message.sender_id,
                &ServerEvent::MessageStatusUpdated {
                    message_id: message.id,
                    conversation_id: message.conversation_id,
                    recipient_id: actor_id,
                    status: MessageStatus::Delivered,
                },
            );
        }
        Ok(())
    }

    pub async fn mark_read(
        &self,
        actor_id: UserId,
        message_id: MessageId,
    ) -> Result<(), ApplicationError> {
        let message = self.message_by_id(message_id).await?;
        if message.is_sender(actor_id) {
            return Err(
                DomainError::operation_not_allowed("cannot acknowledge your own message").into(),
            );
        }
        let conversation = self.conversation_of(&message).await?;
        if !conversation.is_member(actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }

        let applied = self
            .deps
            .message_repository
            .update_status(message.id, actor_id, MessageStatus::Read)
            .await?;
        if applied {
            let event = ServerEvent::MessageStatusUpdated {
                message_id: message.id,
                conversation_id: message.conversation_id,
                recipient_id: actor_id,
                status: MessageStatus::Read,
            };
            self.deps.groups.send_to_user(message.sender_id, &event);
            // 读者自己的其他设备同步已读状态
            self.deps.groups.send_to_user(actor_id, &event);
        }
        Ok(())
    }

    pub async fn mark_conversation_read(
        &self,
        actor_id: UserId,
        conversation_id: ConversationId,
        up_to_message_id: MessageId,
    ) -> Result<(), ApplicationError> {
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| DomainError::conversation_not_found(conversation_id.to_string()))?;
        if !conversation.is_member(actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }

        let advanced_senders = self
            .deps
            .message_repository
            .mark_conversation_read(conversation_id, actor_id, up_to_message_id)
            .await?;

        // 每个发送者收到一次读水位，而不是每条消息一个事件
        for sender_id in advanced_senders {
            self.deps.groups.send_to_user(
                sender_id,
                &ServerEvent::ConversationReadUpdated {
                    conversation_id,
                    reader_id: actor_id,
                    up_to_message_id,
                },
            );
        }

        self.deps.groups.send_to_user(
            actor_id,
            &ServerEvent::ConversationMarkedAsRead {
                conversation_id,
                up_to_message_id,
            },
        );
        Ok(())
    }

    pub async fn edit_message(
        &self,
        request: EditMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let message = self.message_by_id(request.message_id).await?;
        if !message.is_sender(request.actor_id) {
            return Err(DomainError::NotMessageSender.into());
        }
        if message.deleted {
            return Err(DomainError::operation_not_allowed("message was deleted").into());
        }
        let content = MessageContent::new(request.body)?;
        let conversation = self.conversation_of(&message).await?;

        let updated = self
            .deps
            .message_repository
            .update_body(message.id, content.into_inner())
            .await?;
        let sender = self.sender_summary(updated.sender_id).await?;

        let event = ServerEvent::MessageEdited {
            message: MessagePayload::new(&updated, &sender),
        };
        for member_id in &conversation.member_ids {
            self.deps.groups.send_to_user(*member_id, &event);
        }
        Ok(updated)
    }

    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        let message = self.message_by_id(request.message_id).await?;
        let conversation = self.conversation_of(&message).await?;

        if request.for_everyone {
            // 对所有人删除只限发送者本人
            if !message.is_sender(request.actor_id) {
                return Err(DomainError::NotMessageSender.into());
            }
            self.deps
                .message_repository
                .delete_for_everyone(message.id)
                .await?;

            let event = ServerEvent::MessageDeleted {
                message_id: message.id,
                conversation_id: message.conversation_id,
                for_everyone: true,
            };
            for member_id in &conversation.member_ids {
                self.deps.groups.send_to_user(*member_id, &event);
            }
        } else {
            // 对自己删除：任何成员都可以，只影响自己的视图
            if !conversation.is_member(request.actor_id) {
                return Err(DomainError::NotConversationMember.into());
            }
            self.deps
                .message_repository
                .hide_for_user(message.id, request.actor_id)
                .await?;

            self.deps.groups.send_to_user(
                request.actor_id,
                &ServerEvent::MessageDeleted {
                    message_id: message.id,
                    conversation_id: message.conversation_id,
                    for_everyone: false,
                },
            );
        }
        Ok(())
    }

    pub async fn forward_message(
        &self,
        request: ForwardMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let message = self.message_by_id(request.message_id).await?;
        if message.deleted {
            return Err(DomainError::operation_not_allowed("message was deleted").into());
        }

        // 操作者必须同时在源会话和目标会话里
        let source = self.conversation_of(&message).await?;
        if !source.is_member(request.actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }
        let target = self
            .deps
            .conversation_repository
            .find_by_id(request.target_conversation_id)
            .await?
            .ok_or_else(|| {
                DomainError::conversation_not_found(request.target_conversation_id.to_string())
            })?;
        if !target.is_member(request.actor_id) {
            return Err(DomainError::NotConversationMember.into());
        }

        let draft = MessageDraft::new(
            MessageContent::new(message.body.clone())?,
            message.content_type,
            message.media_url.clone(),
        )?;
        let forwarded = self
            .deps
            .message_repository
            .create_in_conversation(target.id, request.actor_id, draft)
            .await?;
        let sender = self.sender_summary(request.actor_id).await?;

        // 转发对所有目标成员（含操作者）统一显示为新消息
        let event = ServerEvent::MessageReceived {
            message: MessagePayload::new(&forwarded, &sender),
        };
        for member_id in &target.member_ids {
            self.deps.groups.send_to_user(*member_id, &event);
        }
        Ok(forwarded)
    }
}

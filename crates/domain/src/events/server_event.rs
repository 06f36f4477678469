//! 下行事件定义
//!
//! 服务端推送给客户端的全部事件。采用内部标签序列化，
//! 标签字段为 `type`，取值为 camelCase 事件名（通话类
//! 事件沿用历史的全小写名称）。客户端依赖 `type` 分发，
//! 新增事件必须保持已有名称不变。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::conversation::Conversation;
use crate::entities::friendship::FriendRequestView;
use crate::entities::message::{ContentKind, Message, MessageStatus};
use crate::entities::user::UserSummary;
use crate::value_objects::{CallId, ConversationId, FriendRequestId, MessageId, Timestamp, UserId};

/// 消息的下行载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    /// 发送者展示名，免去客户端反查
    pub sender_name: String,
    pub body: String,
    pub content_type: ContentKind,
    pub media_url: Option<String>,
    pub status: MessageStatus,
    pub edited: bool,
    pub created_at: Timestamp,
}

impl MessagePayload {
    /// 由消息实体和发送者摘要组装下行载荷
    pub fn new(message: &Message, sender: &UserSummary) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender_name: sender.display_label().to_string(),
            body: message.body.clone(),
            content_type: message.content_type,
            media_url: message.media_url.clone(),
            status: message.status,
            edited: message.edited,
            created_at: message.created_at,
        }
    }
}

/// 群组的下行载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub id: ConversationId,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub admin_id: Option<UserId>,
    pub member_ids: Vec<UserId>,
    pub created_at: Timestamp,
}

impl From<&Conversation> for GroupPayload {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            name: conversation.name.clone().unwrap_or_default(),
            description: conversation.description.clone(),
            avatar_url: conversation.avatar_url.clone(),
            admin_id: conversation.admin_id,
            member_ids: conversation.member_ids.clone(),
            created_at: conversation.created_at,
        }
    }
}

/// 服务端下行事件
///
/// 除错误事件只发给当事连接外，其余事件都经由广播组
/// 送达目标用户的全部在线连接。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 新消息抵达（发给接收方）
    #[serde(rename_all = "camelCase")]
    MessageReceived { message: MessagePayload },

    /// 消息已持久化的回执（发给发送方的全部连接）
    #[serde(rename_all = "camelCase")]
    MessageSent { message: MessagePayload },

    /// 某接收者维度的递送状态推进（发给消息发送方）
    #[serde(rename_all = "camelCase")]
    MessageStatusUpdated {
        message_id: MessageId,
        conversation_id: ConversationId,
        recipient_id: UserId,
        status: MessageStatus,
    },

    /// 某读者把会话读到了某条消息（发给相关消息的发送方）
    #[serde(rename_all = "camelCase")]
    ConversationReadUpdated {
        conversation_id: ConversationId,
        reader_id: UserId,
        up_to_message_id: MessageId,
    },

    /// 批量已读完成的回执（发给读者自己的全部连接）
    #[serde(rename_all = "camelCase")]
    ConversationMarkedAsRead {
        conversation_id: ConversationId,
        up_to_message_id: MessageId,
    },

    /// 用户上线/离线（发给其好友）
    #[serde(rename_all = "camelCase")]
    UserStatusChanged {
        user_id: UserId,
        online: bool,
        last_seen: Option<Timestamp>,
    },

    /// 群组已创建（发给全部初始成员，包括创建者）
    GroupCreated { group: GroupPayload },

    /// 新成员入群（发给入群后的全部成员）
    #[serde(rename_all = "camelCase")]
    GroupMemberAdded {
        group: GroupPayload,
        member_id: UserId,
    },

    /// 成员被移出（发给剩余成员）
    #[serde(rename_all = "camelCase")]
    GroupMemberRemoved {
        group: GroupPayload,
        member_id: UserId,
    },

    /// 成员主动退群（发给剩余成员和退群者本人）
    #[serde(rename_all = "camelCase")]
    GroupLeft { group: GroupPayload, user_id: UserId },

    /// 被移出群组的单独通知（只发给被移出者）
    #[serde(rename_all = "camelCase")]
    RemovedFromGroup {
        group_id: ConversationId,
        group_name: String,
    },

    /// 群资料更新（发给全部成员）
    GroupInfoUpdated { group: GroupPayload },

    /// 群主转让（发给全部成员）
    #[serde(rename_all = "camelCase")]
    AdminTransferred {
        group: GroupPayload,
        new_admin_id: UserId,
    },

    /// 群组解散（发给解散前的全部成员）
    #[serde(rename_all = "camelCase")]
    GroupDeleted { group_id: ConversationId },

    /// 消息被删除
    ///
    /// forEveryone 为 true 时发给全部成员，否则只发给操作者。
    #[serde(rename_all = "camelCase")]
    MessageDeleted {
        message_id: MessageId,
        conversation_id: ConversationId,
        for_everyone: bool,
    },

    /// 消息被编辑（发给会话全部成员）
    MessageEdited { message: MessagePayload },

    /// 收到好友请求（发给接收方）
    FriendRequestReceived { request: FriendRequestView },

    /// 好友请求已发出的回执（发给发起方）
    FriendRequestSent { request: FriendRequestView },

    /// 好友请求被接受（发给原发起方，friend 为新好友摘要）
    FriendRequestAccepted { friend: UserSummary },

    /// 接受操作的回执（发给接受方，friend 为新好友摘要）
    FriendRequestAcceptedConfirm { friend: UserSummary },

    /// 好友请求被拒绝（发给原发起方）
    #[serde(rename_all = "camelCase")]
    FriendRequestRejected { request_id: FriendRequestId },

    /// 拒绝操作的回执（发给拒绝方）
    #[serde(rename_all = "camelCase")]
    FriendRequestRejectedConfirm { request_id: FriendRequestId },

    /// 好友列表全量刷新
    FriendsListUpdated { friends: Vec<UserSummary> },

    /// 已发送请求列表全量刷新
    SentRequestsUpdated { requests: Vec<FriendRequestView> },

    /// 已收到请求列表全量刷新
    ReceivedRequestsUpdated { requests: Vec<FriendRequestView> },

    /// 通用错误（消息发送、已读回执、通话及无法解析的动作）
    Error { message: String },

    /// 群组管理类错误
    GroupError { message: String },

    /// 消息操作类错误（删除、编辑、转发）
    MessageActionError { message: String },

    /// 建群错误
    GroupCreationError { message: String },

    /// 好友请求类错误
    FriendRequestError { message: String },

    /// 通话邀请（透传主叫方的 SDP）
    #[serde(rename = "calloffer", rename_all = "camelCase")]
    CallOffer {
        call_id: CallId,
        from: UserId,
        sdp: Value,
    },

    /// 通话应答（透传被叫方的 SDP）
    #[serde(rename = "callanswer", rename_all = "camelCase")]
    CallAnswer {
        call_id: CallId,
        from: UserId,
        sdp: Value,
    },

    /// ICE 候选透传
    #[serde(rename = "icecandidate", rename_all = "camelCase")]
    IceCandidate {
        call_id: CallId,
        from: UserId,
        candidate: Value,
    },

    /// 对方拒绝了通话
    #[serde(rename = "callrejected", rename_all = "camelCase")]
    CallRejected { call_id: CallId, from: UserId },

    /// 对方结束了通话
    #[serde(rename = "callended", rename_all = "camelCase")]
    CallEnded { call_id: CallId, from: UserId },

    /// 通话状态透传（静音、摄像头开关等）
    #[serde(rename = "callstateupdate", rename_all = "camelCase")]
    CallStateUpdate {
        call_id: CallId,
        from: UserId,
        state: Value,
    },

    /// 对方忙线
    #[serde(rename = "callbusy", rename_all = "camelCase")]
    CallBusy { call_id: CallId, from: UserId },

    /// 心跳应答
    Pong,
}

impl ServerEvent {
    /// 创建通用错误事件
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// 创建群组管理错误事件
    pub fn group_error(message: impl Into<String>) -> Self {
        Self::GroupError {
            message: message.into(),
        }
    }

    /// 创建消息操作错误事件
    pub fn message_action_error(message: impl Into<String>) -> Self {
        Self::MessageActionError {
            message: message.into(),
        }
    }

    /// 创建建群错误事件
    pub fn group_creation_error(message: impl Into<String>) -> Self {
        Self::GroupCreationError {
            message: message.into(),
        }
    }

    /// 创建好友请求错误事件
    pub fn friend_request_error(message: impl Into<String>) -> Self {
        Self::FriendRequestError {
            message: message.into(),
        }
    }

    /// 创建在线状态变更事件
    pub fn user_status_changed(user_id: UserId, online: bool, last_seen: Option<Timestamp>) -> Self {
        Self::UserStatusChanged {
            user_id,
            online,
            last_seen,
        }
    }

    /// 事件在线路上的 `type` 名称
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "messageReceived",
            Self::MessageSent { .. } => "messageSent",
            Self::MessageStatusUpdated { .. } => "messageStatusUpdated",
            Self::ConversationReadUpdated { .. } => "conversationReadUpdated",
            Self::ConversationMarkedAsRead { .. } => "conversationMarkedAsRead",
            Self::UserStatusChanged { .. } => "userStatusChanged",
            Self::GroupCreated { .. } => "groupCreated",
            Self::GroupMemberAdded { .. } => "groupMemberAdded",
            Self::GroupMemberRemoved { .. } => "groupMemberRemoved",
            Self::GroupLeft { .. } => "groupLeft",
            Self::RemovedFromGroup { .. } => "removedFromGroup",
            Self::GroupInfoUpdated { .. } => "groupInfoUpdated",
            Self::AdminTransferred { .. } => "adminTransferred",
            Self::GroupDeleted { .. } => "groupDeleted",
            Self::MessageDeleted { .. } => "messageDeleted",
            Self::MessageEdited { .. } => "messageEdited",
            Self::FriendRequestReceived { .. } => "friendRequestReceived",
            Self::FriendRequestSent { .. } => "friendRequestSent",
            Self::FriendRequestAccepted { .. } => "friendRequestAccepted",
            Self::FriendRequestAcceptedConfirm { .. } => "friendRequestAcceptedConfirm",
            Self::FriendRequestRejected { .. } => "friendRequestRejected",
            Self::FriendRequestRejectedConfirm { .. } => "friendRequestRejectedConfirm",
            Self::FriendsListUpdated { .. } => "friendsListUpdated",
            Self::SentRequestsUpdated { .. } => "sentRequestsUpdated",
            Self::ReceivedRequestsUpdated { .. } => "receivedRequestsUpdated",
            Self::Error { .. } => "error",
            Self::GroupError { .. } => "groupError",
            Self::MessageActionError { .. } => "messageActionError",
            Self::GroupCreationError { .. } => "groupCreationError",
            Self::FriendRequestError { .. } => "friendRequestError",
            Self::CallOffer { .. } => "calloffer",
            Self::CallAnswer { .. } => "callanswer",
            Self::IceCandidate { .. } => "icecandidate",
            Self::CallRejected { .. } => "callrejected",
            Self::CallEnded { .. } => "callended",
            Self::CallStateUpdate { .. } => "callstateupdate",
            Self::CallBusy { .. } => "callbusy",
            Self::Pong => "pong",
        }
    }

    /// 是否为只发给当事连接的错误事件
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Error { .. }
                | Self::GroupError { .. }
                | Self::MessageActionError { .. }
                | Self::GroupCreationError { .. }
                | Self::FriendRequestError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_user(name: &str) -> UserSummary {
        UserSummary {
            id: UserId::new(Uuid::new_v4()),
            username: name.to_string(),
            display_name: None,
            avatar_url: None,
            online: true,
            last_seen: None,
        }
    }

    fn sample_message(sender: &UserSummary) -> Message {
        Message {
            id: MessageId::new(10),
            conversation_id: ConversationId::new(3),
            sender_id: sender.id,
            body: "hello".to_string(),
            content_type: ContentKind::Text,
            media_url: None,
            status: MessageStatus::Sent,
            edited: false,
            deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_received_wire_shape() {
        let sender = sample_user("alice");
        let message = sample_message(&sender);
        let event = ServerEvent::MessageReceived {
            message: MessagePayload::new(&message, &sender),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messageReceived");
        assert_eq!(json["message"]["conversationId"], 3);
        assert_eq!(json["message"]["senderName"], "alice");
        assert_eq!(json["message"]["contentType"], "text");
        assert_eq!(json["message"]["status"], "sent");
    }

    #[test]
    fn status_update_wire_shape() {
        let recipient = UserId::new(Uuid::new_v4());
        let event = ServerEvent::MessageStatusUpdated {
            message_id: MessageId::new(10),
            conversation_id: ConversationId::new(3),
            recipient_id: recipient,
            status: MessageStatus::Delivered,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messageStatusUpdated");
        assert_eq!(json["messageId"], 10);
        assert_eq!(json["recipientId"], serde_json::json!(recipient.0.to_string()));
        assert_eq!(json["status"], "delivered");
    }

    #[test]
    fn call_events_use_lowercase_names() {
        let call_id = CallId::new(Uuid::new_v4());
        let from = UserId::new(Uuid::new_v4());

        let offer = ServerEvent::CallOffer {
            call_id,
            from,
            sdp: serde_json::json!({"type": "offer"}),
        };
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["type"], "calloffer");
        assert_eq!(json["callId"], serde_json::json!(call_id.0.to_string()));

        let busy = ServerEvent::CallBusy { call_id, from };
        let json = serde_json::to_value(&busy).unwrap();
        assert_eq!(json["type"], "callbusy");

        let state = ServerEvent::CallStateUpdate {
            call_id,
            from,
            state: serde_json::json!({"muted": true}),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "callstateupdate");
        assert_eq!(json["state"]["muted"], true);
    }

    #[test]
    fn error_family_is_classified() {
        assert!(ServerEvent::error("x").is_error());
        assert!(ServerEvent::group_error("x").is_error());
        assert!(ServerEvent::message_action_error("x").is_error());
        assert!(ServerEvent::group_creation_error("x").is_error());
        assert!(ServerEvent::friend_request_error("x").is_error());
        assert!(!ServerEvent::Pong.is_error());
    }

    #[test]
    fn event_name_matches_serialized_tag() {
        let sender = sample_user("bob");
        let message = sample_message(&sender);
        let events = vec![
            ServerEvent::MessageSent {
                message: MessagePayload::new(&message, &sender),
            },
            ServerEvent::user_status_changed(sender.id, false, Some(Utc::now())),
            ServerEvent::GroupDeleted {
                group_id: ConversationId::new(9),
            },
            ServerEvent::error("boom"),
            ServerEvent::CallEnded {
                call_id: CallId::new(Uuid::new_v4()),
                from: sender.id,
            },
            ServerEvent::Pong,
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_name(), "{:?}", event);
        }
    }

    #[test]
    fn events_round_trip() {
        let event = ServerEvent::ConversationReadUpdated {
            conversation_id: ConversationId::new(5),
            reader_id: UserId::new(Uuid::new_v4()),
            up_to_message_id: MessageId::new(42),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

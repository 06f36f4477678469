//! 上行动作定义
//!
//! 客户端经 WebSocket 发来的全部动作。与下行事件同构：
//! 内部标签 `type` + camelCase 动作名。解析失败或处理失败
//! 都映射为对应动词族的错误事件，只发给当事连接。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::message::ContentKind;
use crate::events::server_event::ServerEvent;
use crate::value_objects::{CallId, ConversationId, FriendRequestId, MessageId, UserId};

/// 客户端上行动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientAction {
    /// 发送私聊消息
    #[serde(rename_all = "camelCase")]
    SendDirect {
        recipient_id: UserId,
        body: String,
        #[serde(default)]
        content_type: ContentKind,
        #[serde(default)]
        media_url: Option<String>,
    },

    /// 发送群聊消息
    #[serde(rename_all = "camelCase")]
    SendGroupMessage {
        group_id: ConversationId,
        body: String,
        #[serde(default)]
        content_type: ContentKind,
        #[serde(default)]
        media_url: Option<String>,
    },

    /// 上报某条消息已送达本端
    #[serde(rename_all = "camelCase")]
    MarkMessageDelivered { message_id: MessageId },

    /// 上报某条消息已读
    #[serde(rename_all = "camelCase")]
    MarkMessageRead { message_id: MessageId },

    /// 把会话读到某条消息为止
    #[serde(rename_all = "camelCase")]
    MarkConversationRead {
        conversation_id: ConversationId,
        up_to_message_id: MessageId,
    },

    /// 创建群组
    #[serde(rename_all = "camelCase")]
    CreateGroup {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        avatar_url: Option<String>,
        member_ids: Vec<UserId>,
    },

    /// 拉人入群
    #[serde(rename_all = "camelCase")]
    AddMemberToGroup {
        group_id: ConversationId,
        member_id: UserId,
    },

    /// 移出群成员（仅群主）
    #[serde(rename_all = "camelCase")]
    RemoveMemberFromGroup {
        group_id: ConversationId,
        member_id: UserId,
    },

    /// 退出群组
    #[serde(rename_all = "camelCase")]
    LeaveGroup { group_id: ConversationId },

    /// 更新群资料（仅群主，字段缺省表示不修改）
    #[serde(rename_all = "camelCase")]
    UpdateGroupInfo {
        group_id: ConversationId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        avatar_url: Option<String>,
    },

    /// 转让群主（仅群主）
    #[serde(rename_all = "camelCase")]
    TransferAdmin {
        group_id: ConversationId,
        new_admin_id: UserId,
    },

    /// 解散群组（仅群主）
    #[serde(rename_all = "camelCase")]
    DeleteGroup { group_id: ConversationId },

    /// 删除消息
    #[serde(rename_all = "camelCase")]
    DeleteMessage {
        message_id: MessageId,
        #[serde(default)]
        delete_for_everyone: bool,
    },

    /// 编辑消息（仅发送者）
    #[serde(rename_all = "camelCase")]
    EditMessage { message_id: MessageId, body: String },

    /// 转发消息到另一会话
    #[serde(rename_all = "camelCase")]
    ForwardMessage {
        message_id: MessageId,
        target_conversation_id: ConversationId,
    },

    /// 发送好友请求
    #[serde(rename_all = "camelCase")]
    SendFriendRequest { recipient_id: UserId },

    /// 接受好友请求
    #[serde(rename_all = "camelCase")]
    AcceptFriendRequest { request_id: FriendRequestId },

    /// 拒绝好友请求
    #[serde(rename_all = "camelCase")]
    RejectFriendRequest { request_id: FriendRequestId },

    /// 发起通话
    #[serde(rename_all = "camelCase")]
    SendCallOffer {
        call_id: CallId,
        recipient_id: UserId,
        sdp: Value,
    },

    /// 应答通话
    #[serde(rename_all = "camelCase")]
    SendCallAnswer { call_id: CallId, sdp: Value },

    /// 透传 ICE 候选
    #[serde(rename_all = "camelCase")]
    SendIceCandidate { call_id: CallId, candidate: Value },

    /// 拒接通话
    #[serde(rename_all = "camelCase")]
    RejectCall { call_id: CallId },

    /// 挂断通话
    #[serde(rename_all = "camelCase")]
    EndCall { call_id: CallId },

    /// 透传通话状态（静音等）
    #[serde(rename_all = "camelCase")]
    SendCallStateUpdate { call_id: CallId, state: Value },

    /// 告知对方忙线
    #[serde(rename_all = "camelCase")]
    SendBusySignal {
        call_id: CallId,
        recipient_id: UserId,
    },

    /// 应用层心跳
    Ping,
}

impl ClientAction {
    /// 动作在线路上的 `type` 名称
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::SendDirect { .. } => "sendDirect",
            Self::SendGroupMessage { .. } => "sendGroupMessage",
            Self::MarkMessageDelivered { .. } => "markMessageDelivered",
            Self::MarkMessageRead { .. } => "markMessageRead",
            Self::MarkConversationRead { .. } => "markConversationRead",
            Self::CreateGroup { .. } => "createGroup",
            Self::AddMemberToGroup { .. } => "addMemberToGroup",
            Self::RemoveMemberFromGroup { .. } => "removeMemberFromGroup",
            Self::LeaveGroup { .. } => "leaveGroup",
            Self::UpdateGroupInfo { .. } => "updateGroupInfo",
            Self::TransferAdmin { .. } => "transferAdmin",
            Self::DeleteGroup { .. } => "deleteGroup",
            Self::DeleteMessage { .. } => "deleteMessage",
            Self::EditMessage { .. } => "editMessage",
            Self::ForwardMessage { .. } => "forwardMessage",
            Self::SendFriendRequest { .. } => "sendFriendRequest",
            Self::AcceptFriendRequest { .. } => "acceptFriendRequest",
            Self::RejectFriendRequest { .. } => "rejectFriendRequest",
            Self::SendCallOffer { .. } => "sendCallOffer",
            Self::SendCallAnswer { .. } => "sendCallAnswer",
            Self::SendIceCandidate { .. } => "sendIceCandidate",
            Self::RejectCall { .. } => "rejectCall",
            Self::EndCall { .. } => "endCall",
            Self::SendCallStateUpdate { .. } => "sendCallStateUpdate",
            Self::SendBusySignal { .. } => "sendBusySignal",
            Self::Ping => "ping",
        }
    }

    /// 按动词族把失败原因包装成对应的错误事件
    ///
    /// 建群失败用 groupCreationError，群管理用 groupError，
    /// 消息操作用 messageActionError，好友请求用
    /// friendRequestError，其余一律用通用 error。
    pub fn error_event(&self, message: impl Into<String>) -> ServerEvent {
        match self {
            Self::CreateGroup { .. } => ServerEvent::group_creation_error(message),

            Self::AddMemberToGroup { .. }
            | Self::RemoveMemberFromGroup { .. }
            | Self::LeaveGroup { .. }
            | Self::UpdateGroupInfo { .. }
            | Self::TransferAdmin { .. }
            | Self::DeleteGroup { .. } => ServerEvent::group_error(message),

            Self::DeleteMessage { .. } | Self::EditMessage { .. } | Self::ForwardMessage { .. } => {
                ServerEvent::message_action_error(message)
            }

            Self::SendFriendRequest { .. }
            | Self::AcceptFriendRequest { .. }
            | Self::RejectFriendRequest { .. } => ServerEvent::friend_request_error(message),

            _ => ServerEvent::error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn parses_send_direct_from_client_json() {
        let recipient = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"sendDirect","recipientId":"{recipient}","body":"hi there"}}"#
        );
        let action: ClientAction = serde_json::from_str(&json).unwrap();

        match action {
            ClientAction::SendDirect {
                recipient_id,
                body,
                content_type,
                media_url,
            } => {
                assert_eq!(recipient_id, UserId::new(recipient));
                assert_eq!(body, "hi there");
                assert_eq!(content_type, ContentKind::Text);
                assert_eq!(media_url, None);
            }
            other => panic!("Expected SendDirect, got {other:?}"),
        }
    }

    #[test]
    fn parses_media_message_with_explicit_kind() {
        let json = serde_json::json!({
            "type": "sendGroupMessage",
            "groupId": 12,
            "body": "photo",
            "contentType": "image",
            "mediaUrl": "https://cdn.example.com/p.png",
        });
        let action: ClientAction = serde_json::from_value(json).unwrap();

        match action {
            ClientAction::SendGroupMessage {
                group_id,
                content_type,
                media_url,
                ..
            } => {
                assert_eq!(group_id, ConversationId::new(12));
                assert_eq!(content_type, ContentKind::Image);
                assert_eq!(media_url.as_deref(), Some("https://cdn.example.com/p.png"));
            }
            other => panic!("Expected SendGroupMessage, got {other:?}"),
        }
    }

    #[test]
    fn parses_delete_message_defaults() {
        let json = serde_json::json!({"type": "deleteMessage", "messageId": 7});
        let action: ClientAction = serde_json::from_value(json).unwrap();
        assert_eq!(
            action,
            ClientAction::DeleteMessage {
                message_id: MessageId::new(7),
                delete_for_everyone: false,
            }
        );
    }

    #[test]
    fn parses_ping_without_payload() {
        let action: ClientAction = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(action, ClientAction::Ping);
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let result = serde_json::from_str::<ClientAction>(r#"{"type":"selfDestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn action_name_matches_wire_tag() {
        let actions = vec![
            ClientAction::MarkMessageRead {
                message_id: MessageId::new(1),
            },
            ClientAction::LeaveGroup {
                group_id: ConversationId::new(2),
            },
            ClientAction::SendBusySignal {
                call_id: CallId::new(Uuid::new_v4()),
                recipient_id: UserId::new(Uuid::new_v4()),
            },
            ClientAction::Ping,
        ];
        for action in actions {
            let json = serde_json::to_value(&action).unwrap();
            assert_eq!(json["type"], action.action_name(), "{:?}", action);
        }
    }

    #[test]
    fn errors_map_to_verb_family() {
        let group_id = ConversationId::new(1);
        let message_id = MessageId::new(1);

        let event = ClientAction::CreateGroup {
            name: "x".into(),
            description: None,
            avatar_url: None,
            member_ids: vec![],
        }
        .error_event("boom");
        assert_eq!(event.event_name(), "groupCreationError");

        let event = ClientAction::LeaveGroup { group_id }.error_event("boom");
        assert_eq!(event.event_name(), "groupError");

        let event = ClientAction::EditMessage {
            message_id,
            body: "x".into(),
        }
        .error_event("boom");
        assert_eq!(event.event_name(), "messageActionError");

        let event = ClientAction::SendFriendRequest {
            recipient_id: UserId::new(Uuid::new_v4()),
        }
        .error_event("boom");
        assert_eq!(event.event_name(), "friendRequestError");

        let event = ClientAction::SendDirect {
            recipient_id: UserId::new(Uuid::new_v4()),
            body: "hi".into(),
            content_type: ContentKind::Text,
            media_url: None,
        }
        .error_event("boom");
        assert_eq!(event.event_name(), "error");

        let event = ClientAction::MarkMessageDelivered { message_id }.error_event("boom");
        assert_eq!(event.event_name(), "error");
    }
}

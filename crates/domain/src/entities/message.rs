//! 消息实体定义
//!
//! 消息状态机是单调的：sent -> delivered -> read，
//! 每个 (消息, 接收者) 维度单独推进，只进不退。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, MessageContent, MessageId, Timestamp, UserId};

/// 消息内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// 文本消息
    Text,
    /// 图片消息
    Image,
    /// 视频消息
    Video,
    /// 文件消息
    File,
}

impl Default for ContentKind {
    fn default() -> Self {
        Self::Text
    }
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            other => Err(DomainError::invalid_argument(
                "content_type",
                format!("unknown content type: {other}"),
            )),
        }
    }
}

/// 消息递送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// 已发送（已持久化，尚未确认送达）
    Sent,
    /// 已送达接收端
    Delivered,
    /// 已读
    Read,
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Sent
    }
}

impl MessageStatus {
    /// 状态在单调链上的序号
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }

    /// 是否允许推进到目标状态
    ///
    /// 只允许严格前进，重复或回退的更新应被忽略。
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            other => Err(DomainError::invalid_argument(
                "status",
                format!("unknown message status: {other}"),
            )),
        }
    }
}

/// 待持久化的消息草稿
///
/// 正文已经过 [`MessageContent`] 验证，媒体类消息必须携带 URL。
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub body: MessageContent,
    pub content_type: ContentKind,
    pub media_url: Option<String>,
}

impl MessageDraft {
    pub fn new(
        body: MessageContent,
        content_type: ContentKind,
        media_url: Option<String>,
    ) -> DomainResult<Self> {
        if content_type != ContentKind::Text && media_url.is_none() {
            return Err(DomainError::invalid_argument(
                "media_url",
                "required for non-text messages",
            ));
        }
        Ok(Self {
            body,
            content_type,
            media_url,
        })
    }

    /// 纯文本草稿的便捷构造
    pub fn text(body: MessageContent) -> Self {
        Self {
            body,
            content_type: ContentKind::Text,
            media_url: None,
        }
    }
}

/// 消息实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 消息唯一ID
    pub id: MessageId,
    /// 所属会话ID
    pub conversation_id: ConversationId,
    /// 发送者ID
    pub sender_id: UserId,
    /// 消息正文
    pub body: String,
    /// 内容类型
    pub content_type: ContentKind,
    /// 媒体文件URL（非文本消息）
    pub media_url: Option<String>,
    /// 递送状态（私聊时与接收者状态同步）
    pub status: MessageStatus,
    /// 是否被编辑过
    pub edited: bool,
    /// 是否被对所有人删除
    pub deleted: bool,
    /// 创建时间
    pub created_at: Timestamp,
}

impl Message {
    /// 发送者判定
    pub fn is_sender(&self, user_id: UserId) -> bool {
        self.sender_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_moves_forward() {
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Delivered));
        assert!(MessageStatus::Sent.can_transition_to(MessageStatus::Read));
        assert!(MessageStatus::Delivered.can_transition_to(MessageStatus::Read));

        assert!(!MessageStatus::Sent.can_transition_to(MessageStatus::Sent));
        assert!(!MessageStatus::Delivered.can_transition_to(MessageStatus::Sent));
        assert!(!MessageStatus::Delivered.can_transition_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Read.can_transition_to(MessageStatus::Read));
        assert!(!MessageStatus::Read.can_transition_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Read.can_transition_to(MessageStatus::Sent));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(MessageStatus::Delivered).unwrap(),
            serde_json::json!("delivered")
        );
        assert_eq!(
            serde_json::to_value(ContentKind::Image).unwrap(),
            serde_json::json!("image")
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
        ] {
            assert_eq!(status.as_str().parse::<MessageStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn draft_requires_media_url_for_media_kinds() {
        let body = MessageContent::new("see attachment").unwrap();
        assert!(MessageDraft::new(body.clone(), ContentKind::Image, None).is_err());
        assert!(MessageDraft::new(
            body.clone(),
            ContentKind::Image,
            Some("https://cdn.example.com/a.png".into())
        )
        .is_ok());
        assert!(MessageDraft::new(body, ContentKind::Text, None).is_ok());
    }
}

//! 会话实体定义
//!
//! 私聊和群聊统一为会话：direct 会话恰好两名成员且无群主，
//! group 会话有名称和群主。所有成员资格检查都以仓储返回的
//! 最新成员列表为准。

use serde::{Deserialize, Serialize};

use crate::value_objects::{ConversationId, GroupName, Timestamp, UserId};

/// 会话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// 一对一私聊
    Direct,
    /// 多人群聊
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

impl std::str::FromStr for ConversationKind {
    type Err = crate::errors::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "group" => Ok(Self::Group),
            other => Err(crate::errors::DomainError::invalid_argument(
                "kind",
                format!("unknown conversation kind: {other}"),
            )),
        }
    }
}

/// 会话实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// 会话唯一ID
    pub id: ConversationId,
    /// 会话类型
    pub kind: ConversationKind,
    /// 群组名称（direct 会话为 None）
    pub name: Option<String>,
    /// 群组描述
    pub description: Option<String>,
    /// 群头像URL
    pub avatar_url: Option<String>,
    /// 群主（direct 会话为 None）
    pub admin_id: Option<UserId>,
    /// 当前成员列表
    pub member_ids: Vec<UserId>,
    /// 创建时间
    pub created_at: Timestamp,
}

impl Conversation {
    /// 成员资格检查
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// 群主检查
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_id == Some(user_id)
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    /// 除指定用户外的全部成员，用于计算广播接收者
    pub fn recipients_excluding(&self, user_id: UserId) -> Vec<UserId> {
        self.member_ids
            .iter()
            .copied()
            .filter(|id| *id != user_id)
            .collect()
    }
}

/// 待创建的群组
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: GroupName,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    /// 创建者即初始群主
    pub admin_id: UserId,
    /// 去重后的成员列表，必须包含群主
    pub member_ids: Vec<UserId>,
}

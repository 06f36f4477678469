//! 好友关系实体定义

use serde::{Deserialize, Serialize};

use crate::entities::user::UserSummary;
use crate::value_objects::{FriendRequestId, Timestamp, UserId};

/// 好友请求状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    /// 待处理
    Pending,
    /// 已接受
    Accepted,
    /// 已拒绝
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for FriendRequestStatus {
    type Err = crate::errors::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(crate::errors::DomainError::invalid_argument(
                "status",
                format!("unknown request status: {other}"),
            )),
        }
    }
}

/// 好友请求实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// 请求唯一ID
    pub id: FriendRequestId,
    /// 发起者
    pub sender_id: UserId,
    /// 接收者
    pub recipient_id: UserId,
    /// 当前状态
    pub status: FriendRequestStatus,
    /// 创建时间
    pub created_at: Timestamp,
}

impl FriendRequest {
    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }
}

/// 好友请求的下行视图
///
/// 把双方用户摘要一并带给客户端，免去额外查询。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: FriendRequestId,
    pub sender: UserSummary,
    pub recipient: UserSummary,
    pub created_at: Timestamp,
}

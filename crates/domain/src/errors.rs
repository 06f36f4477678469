//! 领域模型错误定义
//!
//! 领域错误按动词族映射为下行错误事件，仓储错误由
//! 应用层统一包装，两者都在这里定义。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 输入参数验证失败
    #[error("参数无效: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 用户不存在
    #[error("用户不存在: {user_id}")]
    UserNotFound { user_id: String },

    /// 消息不存在
    #[error("消息不存在: {message_id}")]
    MessageNotFound { message_id: String },

    /// 会话不存在
    #[error("会话不存在: {conversation_id}")]
    ConversationNotFound { conversation_id: String },

    /// 群组不存在
    #[error("群组不存在: {group_id}")]
    GroupNotFound { group_id: String },

    /// 好友请求不存在
    #[error("好友请求不存在: {request_id}")]
    FriendRequestNotFound { request_id: String },

    /// 通话会话不存在
    #[error("通话会话不存在: {call_id}")]
    CallSessionNotFound { call_id: String },

    /// 双方不是好友
    #[error("只能给好友发送私聊消息")]
    NotFriends,

    /// 不是会话成员
    #[error("不是该会话的成员")]
    NotConversationMember,

    /// 需要群主权限
    #[error("需要群主权限")]
    AdminRequired,

    /// 只能操作自己发送的消息
    #[error("只能操作自己发送的消息")]
    NotMessageSender,

    /// 群主必须先转让群主身份才能退群
    #[error("群主不能退出群组，请先转让群主")]
    AdminCannotLeave,

    /// 已经是好友
    #[error("已经是好友")]
    AlreadyFriends,

    /// 两人之间已有待处理的好友请求
    #[error("好友请求已存在")]
    DuplicateFriendRequest,

    /// 只有请求接收者可以处理该请求
    #[error("只有请求接收者可以处理该请求")]
    NotRequestRecipient,

    /// 其他被业务规则拒绝的操作
    #[error("操作不允许: {reason}")]
    OperationNotAllowed { reason: String },
}

impl DomainError {
    /// 创建参数验证错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 创建用户不存在错误
    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound {
            user_id: user_id.into(),
        }
    }

    /// 创建消息不存在错误
    pub fn message_not_found(message_id: impl Into<String>) -> Self {
        Self::MessageNotFound {
            message_id: message_id.into(),
        }
    }

    /// 创建会话不存在错误
    pub fn conversation_not_found(conversation_id: impl Into<String>) -> Self {
        Self::ConversationNotFound {
            conversation_id: conversation_id.into(),
        }
    }

    /// 创建群组不存在错误
    pub fn group_not_found(group_id: impl Into<String>) -> Self {
        Self::GroupNotFound {
            group_id: group_id.into(),
        }
    }

    /// 创建好友请求不存在错误
    pub fn friend_request_not_found(request_id: impl Into<String>) -> Self {
        Self::FriendRequestNotFound {
            request_id: request_id.into(),
        }
    }

    /// 创建通话会话不存在错误
    pub fn call_session_not_found(call_id: impl Into<String>) -> Self {
        Self::CallSessionNotFound {
            call_id: call_id.into(),
        }
    }

    /// 创建操作不允许错误
    pub fn operation_not_allowed(reason: impl Into<String>) -> Self {
        Self::OperationNotAllowed {
            reason: reason.into(),
        }
    }
}

/// 仓储层错误类型
///
/// 持久化协作者的失败统一收敛到这三类，应用层据此
/// 决定是否照常广播（写入失败时一律零广播）。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("记录不存在")]
    NotFound,

    /// 与现有记录冲突
    #[error("记录冲突")]
    Conflict,

    /// 底层存储错误
    #[error("存储错误: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

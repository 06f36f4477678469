//! 领域实体定义
//!
//! 包含系统的核心实体：用户摘要、会话、消息、好友关系。

pub mod conversation;
pub mod friendship;
pub mod message;
pub mod user;

// 重新导出核心实体
pub use conversation::{Conversation, ConversationKind, NewGroup};
pub use friendship::{FriendRequest, FriendRequestStatus, FriendRequestView};
pub use message::{ContentKind, Message, MessageDraft, MessageStatus};
pub use user::UserSummary;

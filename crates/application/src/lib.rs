//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：连接生命周期、消息扇出、
//! 群组与好友管理、通话信令，以及在线状态与广播组两个
//! 进程内注册表。持久化通过仓储接口抽象，服务不感知存储细节。

pub mod calls;
pub mod clock;
pub mod error;
pub mod groups;
pub mod presence;
pub mod repository;
pub mod services;

pub use calls::{CallSession, CallSessionRegistry};
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use groups::{user_group, BroadcastGroups};
pub use presence::PresenceRegistry;
pub use repository::{
    ConversationRepository, FriendshipRepository, MessageRepository, UserRepository,
};
pub use services::{
    CallService, CallServiceDependencies, FriendService, FriendServiceDependencies, GroupService,
    GroupServiceDependencies, MessageService, MessageServiceDependencies, SessionService,
    SessionServiceDependencies,
};

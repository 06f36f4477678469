mod call_service;
mod friend_service;
mod group_service;
mod message_service;
mod session_service;

pub use call_service::{CallService, CallServiceDependencies};
pub use friend_service::{FriendService, FriendServiceDependencies};
pub use group_service::{
    CreateGroupRequest, GroupService, GroupServiceDependencies, UpdateGroupInfoRequest,
};
pub use message_service::{
    DeleteMessageRequest, EditMessageRequest, ForwardMessageRequest, MessageService,
    MessageServiceDependencies, SendDirectRequest, SendGroupMessageRequest,
};
pub use session_service::{SessionService, SessionServiceDependencies};


#[cfg(test)]
mod session_service_tests;

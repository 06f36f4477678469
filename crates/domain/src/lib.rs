//! 聊天后端核心领域模型
//!
//! 包含用户摘要、会话、消息、好友关系等核心实体，
//! 线路协议（上行动作/下行事件）以及错误类型。

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use value_objects::*;

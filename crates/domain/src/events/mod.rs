//! 线路协议定义
//!
//! 上行动作与下行事件共用 `type` 内部标签，两边的名称
//! 都是对外契约的一部分。

pub mod client_action;
pub mod server_event;

// 重新导出协议类型
pub use client_action::ClientAction;
pub use server_event::{GroupPayload, MessagePayload, ServerEvent};

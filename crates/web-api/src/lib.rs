//! Web API 层。
//!
//! 提供 Axum 路由：健康检查、在线状态查询，以及承载全部
//! 聊天协议的 WebSocket 端点。业务逻辑全部委托给应用层服务。

mod auth;
mod dispatch;
mod error;
mod routes;
mod state;
mod websocket;

pub use auth::JwtService;
pub use config::JwtConfig;
pub use routes::router;
pub use state::AppState;

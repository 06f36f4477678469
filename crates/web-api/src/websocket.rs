//! WebSocket 接入
//!
//! 升级前完成鉴权，升级后每条连接拆成收发两个循环：
//! 发送循环独占 sink，业务事件和控制帧都经它写出；
//! 接收循环解析客户端帧并交给分发器。任一循环退出都会
//! 触发下线清理。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use domain::events::ServerEvent;
use domain::value_objects::{ConnectionId, UserId};

use crate::{dispatch, error::ApiError, state::AppState};

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket 升级端点
///
/// 鉴权失败直接以 HTTP 错误响应拒绝升级。
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let claims = state
        .jwt_service
        .authenticate(&headers, query.token.as_deref())?;
    let user_id = UserId::from(claims.user_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// WebSocket 写操作命令
///
/// 所有对 sender 的写操作统一经过命令通道，避免多处持有 sink。
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let connection_id = ConnectionId::generate();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(err) = state
        .session_service
        .connect(user_id, connection_id, event_tx)
        .await
    {
        tracing::error!(%user_id, error = %err, "连接注册失败，放弃该 WebSocket");
        return;
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

    // 发送任务：统一处理所有对 WebSocket sender 的写操作
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => {
                    let message = match cmd {
                        WsCommand::SendText(text) => WsMessage::Text(text.into()),
                        WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                    };
                    if ws_sender.send(message).await.is_err() {
                        break;
                    }
                }
                Some(event) = event_rx.recv() => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::warn!(error = %err, "下行事件序列化失败");
                            continue;
                        }
                    };
                    if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    // 接收任务：解析客户端帧并分发到用例服务
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                WsMessage::Text(text) => {
                    dispatch::handle_text(&recv_state, user_id, connection_id, &text).await;
                }
                WsMessage::Ping(data) => {
                    if cmd_tx
                        .send(WsCommand::SendPong(data.to_vec()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                WsMessage::Pong(_) => {}
                WsMessage::Binary(_) => {
                    // 协议只有文本帧，二进制按无法解析处理
                    recv_state.groups.send_to_connection(
                        connection_id,
                        ServerEvent::error("invalid message format"),
                    );
                }
                WsMessage::Close(_) => break,
            }
        }
    });

    tokio::select! {
        _ = send_task => {
            tracing::debug!(%connection_id, "发送循环结束");
        }
        _ = recv_task => {
            tracing::debug!(%connection_id, "接收循环结束");
        }
    }

    // 无论哪条循环先退出，下线清理都要执行，在线计数依赖它
    state.session_service.disconnect(user_id, connection_id).await;
}

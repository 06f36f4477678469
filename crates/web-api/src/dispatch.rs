//! 客户端动作分发
//!
//! 文本帧解析为动作后路由到对应的用例服务。业务失败不会中断连接，
//! 错误按动作家族映射为下行错误事件，只发给当事连接。

use application::ApplicationError;
use domain::events::{ClientAction, ServerEvent};
use domain::value_objects::{ConnectionId, UserId};

use application::services::{
    CreateGroupRequest, DeleteMessageRequest, EditMessageRequest, ForwardMessageRequest,
    SendDirectRequest, SendGroupMessageRequest, UpdateGroupInfoRequest,
};

use crate::state::AppState;

/// 处理一帧客户端文本
///
/// 无法解析的帧回发一条通用错误事件，连接保持不动。
pub async fn handle_text(
    state: &AppState,
    user_id: UserId,
    connection_id: ConnectionId,
    text: &str,
) {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(err) => {
            tracing::debug!(%connection_id, error = %err, "无法解析的客户端帧");
            state
                .groups
                .send_to_connection(connection_id, ServerEvent::error("invalid message format"));
            return;
        }
    };

    if let Err(err) = dispatch(state, user_id, connection_id, &action).await {
        tracing::debug!(
            action = action.action_name(),
            %user_id,
            error = %err,
            "客户端动作执行失败"
        );
        state
            .groups
            .send_to_connection(connection_id, action.error_event(err.client_message()));
    }
}

async fn dispatch(
    state: &AppState,
    user_id: UserId,
    connection_id: ConnectionId,
    action: &ClientAction,
) -> Result<(), ApplicationError> {
    match action {
        ClientAction::SendDirect {
            recipient_id,
            body,
            content_type,
            media_url,
        } => {
            state
                .message_service
                .send_direct(SendDirectRequest {
                    sender_id: user_id,
                    recipient_id: *recipient_id,
                    body: body.clone(),
                    content_type: *content_type,
                    media_url: media_url.clone(),
                })
                .await?;
        }
        ClientAction::SendGroupMessage {
            group_id,
            body,
            content_type,
            media_url,
        } => {
            state
                .message_service
                .send_group(SendGroupMessageRequest {
                    sender_id: user_id,
                    group_id: *group_id,
                    body: body.clone(),
                    content_type: *content_type,
                    media_url: media_url.clone(),
                })
                .await?;
        }
        ClientAction::MarkMessageDelivered { message_id } => {
            state
                .message_service
                .mark_delivered(user_id, *message_id)
                .await?;
        }
        ClientAction::MarkMessageRead { message_id } => {
            state.message_service.mark_read(user_id, *message_id).await?;
        }
        ClientAction::MarkConversationRead {
            conversation_id,
            up_to_message_id,
        } => {
            state
                .message_service
                .mark_conversation_read(user_id, *conversation_id, *up_to_message_id)
                .await?;
        }
        ClientAction::CreateGroup {
            name,
            description,
            avatar_url,
            member_ids,
        } => {
            state
                .group_service
                .create(CreateGroupRequest {
                    creator_id: user_id,
                    name: name.clone(),
                    description: description.clone(),
                    avatar_url: avatar_url.clone(),
                    member_ids: member_ids.clone(),
                })
                .await?;
        }
        ClientAction::AddMemberToGroup {
            group_id,
            member_id,
        } => {
            state
                .group_service
                .add_member(user_id, *group_id, *member_id)
                .await?;
        }
        ClientAction::RemoveMemberFromGroup {
            group_id,
            member_id,
        } => {
            state
                .group_service
                .remove_member(user_id, *group_id, *member_id)
                .await?;
        }
        ClientAction::LeaveGroup { group_id } => {
            state.group_service.leave(user_id, *group_id).await?;
        }
        ClientAction::DeleteGroup { group_id } => {
            state.group_service.delete(user_id, *group_id).await?;
        }
        ClientAction::UpdateGroupInfo {
            group_id,
            name,
            description,
            avatar_url,
        } => {
            state
                .group_service
                .update_info(UpdateGroupInfoRequest {
                    actor_id: user_id,
                    group_id: *group_id,
                    name: name.clone(),
                    description: description.clone(),
                    avatar_url: avatar_url.clone(),
                })
                .await?;
        }
        ClientAction::TransferAdmin {
            group_id,
            new_admin_id,
        } => {
            state
                .group_service
                .transfer_admin(user_id, *group_id, *new_admin_id)
                .await?;
        }
        ClientAction::DeleteMessage {
            message_id,
            delete_for_everyone,
        } => {
            state
                .message_service
                .delete_message(DeleteMessageRequest {
                    actor_id: user_id,
                    message_id: *message_id,
                    for_everyone: *delete_for_everyone,
                })
                .await?;
        }
        ClientAction::EditMessage { message_id, body } => {
            state
                .message_service
                .edit_message(EditMessageRequest {
                    actor_id: user_id,
                    message_id: *message_id,
                    body: body.clone(),
                })
                .await?;
        }
        ClientAction::ForwardMessage {
            message_id,
            target_conversation_id,
        } => {
            state
                .message_service
                .forward_message(ForwardMessageRequest {
                    actor_id: user_id,
                    message_id: *message_id,
                    target_conversation_id: *target_conversation_id,
                })
                .await?;
        }
        ClientAction::SendFriendRequest { recipient_id } => {
            state.friend_service.send(user_id, *recipient_id).await?;
        }
        ClientAction::AcceptFriendRequest { request_id } => {
            state.friend_service.accept(user_id, *request_id).await?;
        }
        ClientAction::RejectFriendRequest { request_id } => {
            state.friend_service.reject(user_id, *request_id).await?;
        }
        ClientAction::SendCallOffer {
            call_id,
            recipient_id,
            sdp,
        } => {
            state
                .call_service
                .offer(user_id, *call_id, *recipient_id, sdp.clone())
                .await?;
        }
        ClientAction::SendCallAnswer { call_id, sdp } => {
            state
                .call_service
                .answer(user_id, *call_id, sdp.clone())
                .await?;
        }
        ClientAction::SendIceCandidate { call_id, candidate } => {
            state
                .call_service
                .ice_candidate(user_id, *call_id, candidate.clone())
                .await?;
        }
        ClientAction::RejectCall { call_id } => {
            state.call_service.reject(user_id, *call_id).await?;
        }
        ClientAction::EndCall { call_id } => {
            state.call_service.end(user_id, *call_id).await?;
        }
        ClientAction::SendCallStateUpdate { call_id, state: call_state } => {
            state
                .call_service
                .state_update(user_id, *call_id, call_state.clone())
                .await?;
        }
        ClientAction::SendBusySignal {
            call_id,
            recipient_id,
        } => {
            state
                .call_service
                .busy(user_id, *call_id, *recipient_id)
                .await?;
        }
        ClientAction::Ping => {
            state
                .groups
                .send_to_connection(connection_id, ServerEvent::Pong);
        }
    }

    Ok(())
}

//! 通话信令服务
//!
//! 服务端只做 SDP/ICE 转发，不解析信令内容。会话注册表
//! 记录 call_id 对应的双方，后续信令按对端路由，不再需要
//! 客户端在每条消息里带接收者。

use std::sync::Arc;

use domain::{CallId, DomainError, ServerEvent, UserId};

use crate::{
    calls::CallSessionRegistry, error::ApplicationError, groups::BroadcastGroups,
    presence::PresenceRegistry,
};

pub struct CallServiceDependencies {
    pub calls: Arc<CallSessionRegistry>,
    pub presence: Arc<PresenceRegistry>,
    pub groups: Arc<BroadcastGroups>,
}

pub struct CallService {
    deps: CallServiceDependencies,
}

impl CallService {
    pub fn new(deps: CallServiceDependencies) -> Self {
        Self { deps }
    }

    fn peer_of(&self, call_id: CallId, user_id: UserId) -> Result<UserId, ApplicationError> {
        self.deps
            .calls
            .peer_of(call_id, user_id)
            .ok_or_else(|| DomainError::call_session_not_found(call_id.to_string()).into())
    }

    /// 发起通话。不要求对方在线，离线时信令自然落空，
    /// 由呼叫方超时处理。
    pub async fn offer(
        &self,
        actor_id: UserId,
        call_id: CallId,
        recipient_id: UserId,
        sdp: serde_json::Value,
    ) -> Result<(), ApplicationError> {
        if actor_id == recipient_id {
            return Err(
                DomainError::invalid_argument("recipientId", "cannot call yourself").into(),
            );
        }
        self.deps.calls.begin(call_id, actor_id, recipient_id);
        self.deps.groups.send_to_user(
            recipient_id,
            &ServerEvent::CallOffer {
                call_id,
                from: actor_id,
                sdp,
            },
        );
        tracing::info!(call_id = %call_id, caller = %actor_id, callee = %recipient_id, "通话邀请已转发");
        Ok(())
    }

    pub async fn answer(
        &self,
        actor_id: UserId,
        call_id: CallId,
        sdp: serde_json::Value,
    ) -> Result<(), ApplicationError> {
        let peer = self.peer_of(call_id, actor_id)?;
        self.deps.groups.send_to_user(
            peer,
            &ServerEvent::CallAnswer {
                call_id,
                from: actor_id,
                sdp,
            },
        );
        Ok(())
    }

    pub async fn ice_candidate(
        &self,
        actor_id: UserId,
        call_id: CallId,
        candidate: serde_json::Value,
    ) -> Result<(), ApplicationError> {
        let peer = self.peer_of(call_id, actor_id)?;
        self.deps.groups.send_to_user(
            peer,
            &ServerEvent::IceCandidate {
                call_id,
                from: actor_id,
                candidate,
            },
        );
        Ok(())
    }

    pub async fn state_update(
        &self,
        actor_id: UserId,
        call_id: CallId,
        state: serde_json::Value,
    ) -> Result<(), ApplicationError> {
        let peer = self.peer_of(call_id, actor_id)?;
        self.deps.groups.send_to_user(
            peer,
            &ServerEvent::CallStateUpdate {
                call_id,
                from: actor_id,
                state,
            },
        );
        Ok(())
    }

    pub async fn reject(&self, actor_id: UserId, call_id: CallId) -> Result<(), ApplicationError> {
        let peer = self.peer_of(call_id, actor_id)?;
        self.deps.groups.send_to_user(
            peer,
            &ServerEvent::CallRejected {
                call_id,
                from: actor_id,
            },
        );
        self.deps.calls.end(call_id);
        Ok(())
    }

    pub async fn end(&self, actor_id: UserId, call_id: CallId) -> Result<(), ApplicationError> {
        let peer = self.peer_of(call_id, actor_id)?;
        self.deps.groups.send_to_user(
            peer,
            &ServerEvent::CallEnded {
                call_id,
                from: actor_id,
            },
        );
        self.deps.calls.end(call_id);
        tracing::info!(call_id = %call_id, "通话已结束");
        Ok(())
    }

    /// 占线信令。对方不在线就静默丢弃，没有会话校验，
    /// 因为占线方从未进入过这次通话。
    pub async fn busy(
        &self,
        actor_id: UserId,
        call_id: CallId,
        recipient_id: UserId,
    ) -> Result<(), ApplicationError> {
        if self.deps.presence.is_online(recipient_id) {
            self.deps.groups.send_to_user(
                recipient_id,
                &ServerEvent::CallBusy {
                    call_id,
                    from: actor_id,
                },
            );
        }
        // 占线即终止，避免会话表里留下永远不会结束的记录
        self.deps.calls.end(call_id);
        Ok(())
    }
}

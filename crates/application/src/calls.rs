//! 通话会话登记表
//!
//! 服务端不理解 SDP，只记住 callId 对应的两端，
//! 以便把应答、ICE 候选和挂断透传给正确的对端。

use dashmap::DashMap;

use domain::{CallId, UserId};

/// 一次一对一通话的两端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSession {
    pub call_id: CallId,
    pub caller: UserId,
    pub callee: UserId,
}

#[derive(Debug, Default)]
pub struct CallSessionRegistry {
    sessions: DashMap<CallId, CallSession>,
}

impl CallSessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// 登记新的通话会话，重复的 callId 覆盖旧记录
    pub fn begin(&self, call_id: CallId, caller: UserId, callee: UserId) {
        self.sessions.insert(
            call_id,
            CallSession {
                call_id,
                caller,
                callee,
            },
        );
    }

    /// 返回会话中给定用户的对端
    ///
    /// 用户不是会话参与者、或会话不存在时返回 None。
    pub fn peer_of(&self, call_id: CallId, user_id: UserId) -> Option<UserId> {
        let session = self.sessions.get(&call_id)?;
        if session.caller == user_id {
            Some(session.callee)
        } else if session.callee == user_id {
            Some(session.caller)
        } else {
            None
        }
    }

    /// 结束会话并返回其记录
    pub fn end(&self, call_id: CallId) -> Option<CallSession> {
        self.sessions.remove(&call_id).map(|(_, session)| session)
    }

    pub fn contains(&self, call_id: CallId) -> bool {
        self.sessions.contains_key(&call_id)
    }
}

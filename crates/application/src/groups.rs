//! 广播组
//!
//! 组是连接的命名集合，所有推送都经由组完成。每个用户有一个
//! 个人组 `user:{id}`，向它发送即覆盖该用户的全部在线设备。
//! 向组发送时，组内每个连接恰好收到一次事件；发送端已关闭的
//! 连接会被顺手清理，发送方永远不会因此报错。

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use domain::{ConnectionId, ServerEvent, UserId};

/// 用户个人组的组名
pub fn user_group(user_id: UserId) -> String {
    format!("user:{user_id}")
}

#[derive(Debug, Default)]
pub struct BroadcastGroups {
    groups: DashMap<String, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>,
    senders: DashMap<ConnectionId, UnboundedSender<ServerEvent>>,
}

impl BroadcastGroups {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// 记录连接的事件发送端，此后该连接才能加入组
    pub fn register_connection(&self, connection_id: ConnectionId, sender: UnboundedSender<ServerEvent>) {
        self.senders.insert(connection_id, sender);
    }

    /// 连接关闭时移除发送端并把它从所有组里清掉
    pub fn drop_connection(&self, connection_id: ConnectionId) {
        self.senders.remove(&connection_id);
        for mut entry in self.groups.iter_mut() {
            entry.value_mut().remove(&connection_id);
        }
        self.groups.retain(|_, members| !members.is_empty());
    }

    /// 把连接加入组，连接未登记时返回 false
    pub fn subscribe(&self, group: impl Into<String>, connection_id: ConnectionId) -> bool {
        let Some(sender) = self.senders.get(&connection_id).map(|s| s.clone()) else {
            return false;
        };
        self.groups
            .entry(group.into())
            .or_default()
            .insert(connection_id, sender);
        true
    }

    /// 把连接从组里移除，组空了就删除组
    pub fn unsubscribe(&self, group: &str, connection_id: ConnectionId) {
        if let Some(mut members) = self.groups.get_mut(group) {
            members.remove(&connection_id);
        }
        self.groups.remove_if(group, |_, members| members.is_empty());
    }

    /// 向组内每个连接各发送一次事件，返回实际送达的连接数
    pub fn send_to_group(&self, group: &str, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        if let Some(mut members) = self.groups.get_mut(group) {
            members.retain(|connection_id, sender| {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                    true
                } else {
                    dead.push(*connection_id);
                    false
                }
            });
        }

        for connection_id in dead {
            self.senders.remove(&connection_id);
        }
        delivered
    }

    /// 向某用户的全部在线连接发送事件
    pub fn send_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        self.send_to_group(&user_group(user_id), event)
    }

    /// 只发给单个连接（错误事件等定向回执）
    pub fn send_to_connection(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        let Some(sender) = self.senders.get(&connection_id).map(|s| s.clone()) else {
            return false;
        };
        if sender.send(event).is_ok() {
            true
        } else {
            self.senders.remove(&connection_id);
            false
        }
    }

    /// 组内连接数，组不存在时为 0
    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).map(|members| members.len()).unwrap_or(0)
    }
}

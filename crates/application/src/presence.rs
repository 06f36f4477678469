//! 连接登记表
//!
//! 维护 userId 到在线连接集合的映射。register 返回登记后的
//! 连接数，unregister 返回该用户是否就此完全离线。上线与
//! 离线广播只以这两个返回值为准，保证离线信号恰好一次。

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use domain::{ConnectionId, UserId};

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// 登记连接，返回该用户登记后的连接数
    ///
    /// 返回 1 表示这是该用户的第一个在线连接。重复登记同一
    /// 连接是幂等的。
    pub fn register(&self, user_id: UserId, connection_id: ConnectionId) -> usize {
        let mut entry = self.connections.entry(user_id).or_default();
        entry.insert(connection_id);
        entry.len()
    }

    /// 注销连接，返回该用户是否因本次注销而完全离线
    ///
    /// 同一连接注销两次、或用户还有其他连接时返回 false。
    /// 无论并发顺序如何，每个"完全离线"只会出现一次 true。
    pub fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        match self.connections.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                let removed = occupied.get_mut().remove(&connection_id);
                if occupied.get().is_empty() {
                    occupied.remove();
                    removed
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections
            .get(&user_id)
            .map(|set| !set.is_empty())
            .unwrap_or(false)
    }

    /// 某用户当前的在线连接数
    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.connections
            .get(&user_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    /// 登记表里的在线用户数
    pub fn online_user_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    #[test]
    fn register_counts_connections() {
        let registry = PresenceRegistry::new();
        let alice = user();
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();

        assert_eq!(registry.register(alice, first), 1);
        assert_eq!(registry.register(alice, second), 2);
        // 同一连接重复登记不增加计数
        assert_eq!(registry.register(alice, second), 2);

        assert!(registry.is_online(alice));
        assert_eq!(registry.connection_count(alice), 2);
    }

    #[test]
    fn user_stays_online_until_last_connection_goes() {
        let registry = PresenceRegistry::new();
        let alice = user();
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();
        registry.register(alice, first);
        registry.register(alice, second);

        assert!(!registry.unregister(alice, first));
        assert!(registry.is_online(alice));

        assert!(registry.unregister(alice, second));
        assert!(!registry.is_online(alice));
        assert_eq!(registry.online_user_count(), 0);
    }

    #[test]
    fn offline_signal_fires_exactly_once() {
        let registry = PresenceRegistry::new();
        let alice = user();
        let connection = ConnectionId::generate();
        registry.register(alice, connection);

        assert!(registry.unregister(alice, connection));
        assert!(!registry.unregister(alice, connection));
        assert!(!registry.unregister(alice, ConnectionId::generate()));
    }

    #[test]
    fn unknown_user_is_offline() {
        let registry = PresenceRegistry::new();
        assert!(!registry.is_online(user()));
        assert_eq!(registry.connection_count(user()), 0);
        assert!(!registry.unregister(user(), ConnectionId::generate()));
    }
}

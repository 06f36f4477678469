//! 连接生命周期测试
//!
//! 上线广播每次连接都发（自愈信号），下线广播只在最后
//! 一条连接断开时发一次，并带上离线时刻。

use domain::ServerEvent;

use crate::repository::UserRepository;
use crate::services::tests::{drain_events, fixed_now, TestHub};

#[tokio::test]
async fn test_connect_broadcasts_online_to_friends() {
    let hub = TestHub::new();
    let (alice, bob) = hub.seed_friends("alice", "bob").await;
    let (_, mut bob_rx) = hub.attach_quiet(bob);

    let (_, mut alice_rx) = hub.connect(alice).await;

    assert!(hub.presence.is_online(alice));
    let stored = hub.users.find_summary(alice).await.unwrap().unwrap();
    assert!(stored.online);

    // 好友收到上线通知，本人不给自己发
    let bob_events = drain_events(&mut bob_rx);
    assert_eq!(bob_events.len(), 1);
    match &bob_events[0] {
        ServerEvent::UserStatusChanged {
            user_id,
            online,
            last_seen,
        } => {
            assert_eq!(*user_id, alice);
            assert!(*online);
            assert!(last_seen.is_none());
        }
        other => panic!("Expected userStatusChanged, got {}", other.event_name()),
    }
    assert!(drain_events(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn test_online_broadcast_repeats_on_every_connect() {
    let hub = TestHub::new();
    let (alice, bob) = hub.seed_friends("alice", "bob").await;
    let (_, mut bob_rx) = hub.attach_quiet(bob);

    // 第二台设备接入也要重发，客户端以此自愈陈旧的离线状态
    hub.connect(alice).await;
    hub.connect(alice).await;

    let online_signals = drain_events(&mut bob_rx)
        .iter()
        .filter(|e| matches!(e, ServerEvent::UserStatusChanged { online: true, .. }))
        .count();
    assert_eq!(online_signals, 2);
    assert_eq!(hub.presence.connection_count(alice), 2);
}

#[tokio::test]
async fn test_offline_broadcast_only_after_last_disconnect() {
    let hub = TestHub::new();
    let (alice, bob) = hub.seed_friends("alice", "bob").await;
    let (_, mut bob_rx) = hub.attach_quiet(bob);

    let (phone, _phone_rx) = hub.connect(alice).await;
    let (laptop, _laptop_rx) = hub.connect(alice).await;
    drain_events(&mut bob_rx);

    // 还剩一台设备在线，不广播下线
    hub.session_service.disconnect(alice, phone).await;
    assert!(hub.presence.is_online(alice));
    assert!(drain_events(&mut bob_rx).is_empty());

    // 最后一条连接断开才算真正离线
    hub.session_service.disconnect(alice, laptop).await;
    assert!(!hub.presence.is_online(alice));

    let bob_events = drain_events(&mut bob_rx);
    assert_eq!(bob_events.len(), 1);
    match &bob_events[0] {
        ServerEvent::UserStatusChanged {
            user_id,
            online,
            last_seen,
        } => {
            assert_eq!(*user_id, alice);
            assert!(!*online);
            assert_eq!(*last_seen, Some(fixed_now()));
        }
        other => panic!("Expected userStatusChanged, got {}", other.event_name()),
    }

    // 离线时刻同步落到了用户仓储
    let stored = hub.users.find_summary(alice).await.unwrap().unwrap();
    assert!(!stored.online);
    assert_eq!(stored.last_seen, Some(fixed_now()));
}

#[tokio::test]
async fn test_disconnect_unknown_connection_is_noop() {
    let hub = TestHub::new();
    let (alice, bob) = hub.seed_friends("alice", "bob").await;
    let (_, mut bob_rx) = hub.attach_quiet(bob);

    let stray = domain::ConnectionId::generate();
    hub.session_service.disconnect(alice, stray).await;

    assert!(drain_events(&mut bob_rx).is_empty());
}

#[tokio::test]
async fn test_disconnect_stops_event_delivery() {
    let hub = TestHub::new();
    let (alice, bob) = hub.seed_friends("alice", "bob").await;

    let (conn, mut alice_rx) = hub.connect(alice).await;
    hub.session_service.disconnect(alice, conn).await;
    drain_events(&mut alice_rx);

    // 断开后个人组里不再有这条连接
    hub.connect(bob).await;
    assert!(drain_events(&mut alice_rx).is_empty());
}

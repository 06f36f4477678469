//! 并发数据一致性测试
//!
//! 验证连接注册表和广播组在高并发连接/断开场景下的一致性，
//! 重点是"完全离线恰好上报一次"这条约束。

use std::sync::Arc;
use std::time::Duration;

use application::{user_group, BroadcastGroups, PresenceRegistry};
use domain::{ConnectionId, ServerEvent, UserId};
use tokio::sync::mpsc;
use tokio::time::sleep;
use uuid::Uuid;

/// 测试并发连接/断开后注册表的最终状态
#[tokio::test]
async fn test_concurrent_connection_consistency() {
    let presence = Arc::new(PresenceRegistry::new());
    let user_ids: Vec<UserId> = (0..5).map(|_| UserId::new(Uuid::new_v4())).collect();

    // 每个用户并发接入 4 条连接
    let connect_tasks: Vec<_> = user_ids
        .iter()
        .enumerate()
        .flat_map(|(i, &user_id)| {
            (0..4).map(move |j| (i, j, user_id)).collect::<Vec<_>>()
        })
        .map(|(i, j, user_id)| {
            let presence = presence.clone();
            tokio::spawn(async move {
                // 模拟连接到达的时间差
                sleep(Duration::from_millis((i * 4 + j) as u64 * 3)).await;
                let connection_id = ConnectionId::generate();
                presence.register(user_id, connection_id);
                (user_id, connection_id)
            })
        })
        .collect();

    let connections: Vec<(UserId, ConnectionId)> = futures::future::join_all(connect_tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(presence.online_user_count(), user_ids.len());
    for &user_id in &user_ids {
        assert_eq!(presence.connection_count(user_id), 4);
        assert!(presence.is_online(user_id));
    }

    // 并发断开全部连接，统计每个用户观察到几次"完全离线"
    let disconnect_tasks: Vec<_> = connections
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, connection_id))| {
            let presence = presence.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(i as u64 * 3)).await;
                (user_id, presence.unregister(user_id, connection_id))
            })
        })
        .collect();

    let results: Vec<(UserId, bool)> = futures::future::join_all(disconnect_tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    for &user_id in &user_ids {
        let offline_signals = results
            .iter()
            .filter(|(id, became_offline)| *id == user_id && *became_offline)
            .count();
        assert_eq!(offline_signals, 1, "每个用户恰好一次完全离线");
        assert!(!presence.is_online(user_id));
    }
    assert_eq!(presence.online_user_count(), 0);

    println!("✅ 并发连接/断开一致性测试通过");
}

/// 测试同一用户上的注册/注销竞态
#[tokio::test]
async fn test_race_condition_consistency() {
    let presence = Arc::new(PresenceRegistry::new());
    let user_id = UserId::new(Uuid::new_v4());

    // 一半连接闪断，一半保持在线
    let mut race_tasks = Vec::new();
    for i in 0..10 {
        let presence = presence.clone();
        race_tasks.push(tokio::spawn(async move {
            sleep(Duration::from_millis(i as u64 * 5)).await;
            let connection_id = ConnectionId::generate();
            presence.register(user_id, connection_id);
            if i % 2 == 0 {
                sleep(Duration::from_millis(2)).await;
                presence.unregister(user_id, connection_id);
                None
            } else {
                Some(connection_id)
            }
        }));
    }

    let kept: Vec<ConnectionId> = futures::future::join_all(race_tasks)
        .await
        .into_iter()
        .filter_map(|r| r.unwrap())
        .collect();

    // 两种查询口径必须一致
    assert_eq!(presence.connection_count(user_id), kept.len());
    assert_eq!(presence.is_online(user_id), !kept.is_empty());

    // 剩余连接全部断开后，离线信号恰好一次
    let offline_signals = kept
        .into_iter()
        .filter(|&connection_id| presence.unregister(user_id, connection_id))
        .count();
    assert_eq!(offline_signals, 1);
    assert!(!presence.is_online(user_id));

    println!("✅ 注册/注销竞态一致性测试通过");
}

/// 测试并发扇出下广播组的不重不漏
#[tokio::test]
async fn test_concurrent_fanout_delivery() {
    let groups = Arc::new(BroadcastGroups::new());
    let members: Vec<UserId> = (0..3).map(|_| UserId::new(Uuid::new_v4())).collect();

    let mut receivers = Vec::new();
    for &user_id in &members {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        groups.register_connection(connection_id, tx);
        assert!(groups.subscribe("conversation:42", connection_id));
        let _ = groups.subscribe(user_group(user_id), connection_id);
        receivers.push(rx);
    }

    // 10 个发送方并发向同一组扇出
    let send_tasks: Vec<_> = (0..10)
        .map(|i| {
            let groups = groups.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(i as u64 * 2)).await;
                groups.send_to_group("conversation:42", &ServerEvent::Pong)
            })
        })
        .collect();

    let delivered: Vec<usize> = futures::future::join_all(send_tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    // 每次扇出都覆盖全部三个成员
    assert!(delivered.iter().all(|&count| count == 3));

    // 每个成员收到的事件数与扇出次数一致，没有重复也没有丢失
    for mut rx in receivers {
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 10);
    }

    println!("✅ 并发扇出一致性测试通过");
}

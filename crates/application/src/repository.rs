//! 仓储接口定义
//!
//! 持久化协作者是递送状态的唯一权威：update_status 返回
//! 本次更新是否真的被应用，广播只在返回 true 时发生。
//! `memory` 模块提供全套内存实现，供测试和集成演练使用。

use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, FriendRequest, FriendRequestId, FriendRequestView, Message,
    MessageDraft, MessageId, MessageStatus, NewGroup, RepositoryError, Timestamp, UserId,
    UserSummary,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError>;
    async fn set_online(&self, id: UserId) -> Result<(), RepositoryError>;
    async fn set_offline(&self, id: UserId, last_seen: Timestamp) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, RepositoryError>;
    async fn list_friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, RepositoryError>;
    async fn list_friends(&self, user_id: UserId) -> Result<Vec<UserSummary>, RepositoryError>;

    async fn create_request(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<FriendRequest, RepositoryError>;
    async fn find_request(
        &self,
        id: FriendRequestId,
    ) -> Result<Option<FriendRequest>, RepositoryError>;
    // 两人之间任一方向是否已有待处理请求
    async fn pending_request_between(&self, a: UserId, b: UserId)
        -> Result<bool, RepositoryError>;
    // 接受请求并建立好友关系
    async fn accept_request(&self, id: FriendRequestId) -> Result<(), RepositoryError>;
    async fn reject_request(&self, id: FriendRequestId) -> Result<(), RepositoryError>;

    async fn view(
        &self,
        id: FriendRequestId,
    ) -> Result<Option<FriendRequestView>, RepositoryError>;
    // 待处理的已发送/已收到请求，附双方摘要
    async fn list_sent(&self, user_id: UserId) -> Result<Vec<FriendRequestView>, RepositoryError>;
    async fn list_received(
        &self,
        user_id: UserId,
    ) -> Result<Vec<FriendRequestView>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: ConversationId)
        -> Result<Option<Conversation>, RepositoryError>;
    async fn create_group(&self, group: NewGroup) -> Result<Conversation, RepositoryError>;
    async fn add_member(&self, id: ConversationId, user_id: UserId)
        -> Result<(), RepositoryError>;
    async fn remove_member(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<(), RepositoryError>;
    // None 字段表示不修改
    async fn update_info(
        &self,
        id: ConversationId,
        name: Option<String>,
        description: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), RepositoryError>;
    async fn set_admin(&self, id: ConversationId, new_admin: UserId)
        -> Result<(), RepositoryError>;
    async fn delete(&self, id: ConversationId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 创建私聊消息，两人的 direct 会话不存在时顺带创建
    async fn create_direct(
        &self,
        sender: UserId,
        recipient: UserId,
        draft: MessageDraft,
    ) -> Result<Message, RepositoryError>;

    async fn create_in_conversation(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        draft: MessageDraft,
    ) -> Result<Message, RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// 推进 (消息, 接收者) 维度的递送状态
    ///
    /// 只有严格前进的更新才被应用并返回 true；重复或回退的
    /// 更新返回 false，调用方以此决定是否广播。
    async fn update_status(
        &self,
        id: MessageId,
        recipient: UserId,
        status: MessageStatus,
    ) -> Result<bool, RepositoryError>;

    /// 把会话读到 up_to 为止
    ///
    /// 推进 reader 为接收者、id 不超过 up_to 的全部消息到已读，
    /// 返回状态确有推进的消息的去重后发送者列表。
    async fn mark_conversation_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        up_to: MessageId,
    ) -> Result<Vec<UserId>, RepositoryError>;

    async fn update_body(&self, id: MessageId, body: String) -> Result<Message, RepositoryError>;
    async fn delete_for_everyone(&self, id: MessageId) -> Result<(), RepositoryError>;
    // "仅对自己删除"：只打隐藏标记，消息本体不动
    async fn hide_for_user(&self, id: MessageId, user_id: UserId) -> Result<(), RepositoryError>;
}

/// 内存实现的全套仓储（用于测试）
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use domain::{ConversationKind, FriendRequestStatus};

    fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    #[derive(Default)]
    pub struct MemoryUserRepository {
        users: RwLock<HashMap<UserId, UserSummary>>,
    }

    impl MemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// 预置一个用户（测试播种用）
        pub async fn insert(&self, summary: UserSummary) {
            self.users.write().await.insert(summary.id, summary);
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn find_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
            Ok(self.users.read().await.get(&id).cloned())
        }

        async fn set_online(&self, id: UserId) -> Result<(), RepositoryError> {
            if let Some(user) = self.users.write().await.get_mut(&id) {
                user.online = true;
            }
            Ok(())
        }

        async fn set_offline(
            &self,
            id: UserId,
            last_seen: Timestamp,
        ) -> Result<(), RepositoryError> {
            if let Some(user) = self.users.write().await.get_mut(&id) {
                user.online = false;
                user.last_seen = Some(last_seen);
            }
            Ok(())
        }
    }

    pub struct MemoryFriendshipRepository {
        users: Arc<MemoryUserRepository>,
        friends: RwLock<HashSet<(UserId, UserId)>>,
        requests: RwLock<HashMap<FriendRequestId, FriendRequest>>,
        next_id: AtomicI64,
    }

    impl MemoryFriendshipRepository {
        pub fn new(users: Arc<MemoryUserRepository>) -> Self {
            Self {
                users,
                friends: RwLock::new(HashSet::new()),
                requests: RwLock::new(HashMap::new()),
                next_id: AtomicI64::new(1),
            }
        }

        /// 直接建立好友关系（测试播种用）
        pub async fn insert_friendship(&self, a: UserId, b: UserId) {
            self.friends.write().await.insert(pair_key(a, b));
        }

        async fn build_view(
            &self,
            request: &FriendRequest,
        ) -> Result<FriendRequestView, RepositoryError> {
            let sender = self
                .users
                .find_summary(request.sender_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let recipient = self
                .users
                .find_summary(request.recipient_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            Ok(FriendRequestView {
                id: request.id,
                sender,
                recipient,
                created_at: request.created_at,
            })
        }
    }

    #[async_trait]
    impl FriendshipRepository for MemoryFriendshipRepository {
        async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, RepositoryError> {
            Ok(self.friends.read().await.contains(&pair_key(a, b)))
        }

        async fn list_friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, RepositoryError> {
            let friends = self.friends.read().await;
            let mut ids: Vec<UserId> = friends
                .iter()
                .filter_map(|(a, b)| {
                    if *a == user_id {
                        Some(*b)
                    } else if *b == user_id {
                        Some(*a)
                    } else {
                        None
                    }
                })
                .collect();
            ids.sort();
            Ok(ids)
        }

        async fn list_friends(
            &self,
            user_id: UserId,
        ) -> Result<Vec<UserSummary>, RepositoryError> {
            let mut summaries = Vec::new();
            for id in self.list_friend_ids(user_id).await? {
                if let Some(summary) = self.users.find_summary(id).await? {
                    summaries.push(summary);
                }
            }
            Ok(summaries)
        }

        async fn create_request(
            &self,
            sender: UserId,
            recipient: UserId,
        ) -> Result<FriendRequest, RepositoryError> {
            let id = FriendRequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let request = FriendRequest {
                id,
                sender_id: sender,
                recipient_id: recipient,
                status: FriendRequestStatus::Pending,
                created_at: chrono::Utc::now(),
            };
            self.requests.write().await.insert(id, request.clone());
            Ok(request)
        }

        async fn find_request(
            &self,
            id: FriendRequestId,
        ) -> Result<Option<FriendRequest>, RepositoryError> {
            Ok(self.requests.read().await.get(&id).cloned())
        }

        async fn pending_request_between(
            &self,
            a: UserId,
            b: UserId,
        ) -> Result<bool, RepositoryError> {
            let requests = self.requests.read().await;
            Ok(requests.values().any(|request| {
                request.status == FriendRequestStatus::Pending
                    && pair_key(request.sender_id, request.recipient_id) == pair_key(a, b)
            }))
        }

        async fn accept_request(&self, id: FriendRequestId) -> Result<(), RepositoryError> {
            let mut requests = self.requests.write().await;
            let request = requests.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            request.status = FriendRequestStatus::Accepted;
            let key = pair_key(request.sender_id, request.recipient_id);
            drop(requests);
            self.friends.write().await.insert(key);
            Ok(())
        }

        async fn reject_request(&self, id: FriendRequestId) -> Result<(), RepositoryError> {
            let mut requests = self.requests.write().await;
            let request = requests.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            request.status = FriendRequestStatus::Rejected;
            Ok(())
        }

        async fn view(
            &self,
            id: FriendRequestId,
        ) -> Result<Option<FriendRequestView>, RepositoryError> {
            let request = match self.find_request(id).await? {
                Some(request) => request,
                None => return Ok(None),
            };
            Ok(Some(self.build_view(&request).await?))
        }

        async fn list_sent(
            &self,
            user_id: UserId,
        ) -> Result<Vec<FriendRequestView>, RepositoryError> {
            let mut pending: Vec<FriendRequest> = {
                let requests = self.requests.read().await;
                requests
                    .values()
                    .filter(|r| r.sender_id == user_id && r.is_pending())
                    .cloned()
                    .collect()
            };
            pending.sort_by_key(|r| r.id.0);
            let mut views = Vec::with_capacity(pending.len());
            for request in &pending {
                views.push(self.build_view(request).await?);
            }
            Ok(views)
        }

        async fn list_received(
            &self,
            user_id: UserId,
        ) -> Result<Vec<FriendRequestView>, RepositoryError> {
            let mut pending: Vec<FriendRequest> = {
                let requests = self.requests.read().await;
                requests
                    .values()
                    .filter(|r| r.recipient_id == user_id && r.is_pending())
                    .cloned()
                    .collect()
            };
            pending.sort_by_key(|r| r.id.0);
            let mut views = Vec::with_capacity(pending.len());
            for request in &pending {
                views.push(self.build_view(request).await?);
            }
            Ok(views)
        }
    }

    #[derive(Default)]
    pub struct MemoryConversationRepository {
        conversations: RwLock<HashMap<ConversationId, Conversation>>,
        direct_index: RwLock<HashMap<(UserId, UserId), ConversationId>>,
        next_id: AtomicI64,
    }

    impl MemoryConversationRepository {
        pub fn new() -> Self {
            Self {
                conversations: RwLock::new(HashMap::new()),
                direct_index: RwLock::new(HashMap::new()),
                next_id: AtomicI64::new(1),
            }
        }

        /// 找到或创建两人的 direct 会话
        pub async fn resolve_direct(
            &self,
            a: UserId,
            b: UserId,
        ) -> Result<ConversationId, RepositoryError> {
            let key = pair_key(a, b);
            let mut index = self.direct_index.write().await;
            if let Some(id) = index.get(&key) {
                return Ok(*id);
            }
            let id = ConversationId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let conversation = Conversation {
                id,
                kind: ConversationKind::Direct,
                name: None,
                description: None,
                avatar_url: None,
                admin_id: None,
                member_ids: vec![a, b],
                created_at: chrono::Utc::now(),
            };
            self.conversations.write().await.insert(id, conversation);
            index.insert(key, id);
            Ok(id)
        }
    }

    #[async_trait]
    impl ConversationRepository for MemoryConversationRepository {
        async fn find_by_id(
            &self,
            id: ConversationId,
        ) -> Result<Option<Conversation>, RepositoryError> {
            Ok(self.conversations.read().await.get(&id).cloned())
        }

        async fn create_group(&self, group: NewGroup) -> Result<Conversation, RepositoryError> {
            let id = ConversationId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let conversation = Conversation {
                id,
                kind: ConversationKind::Group,
                name: Some(group.name.into_inner()),
                description: group.description,
                avatar_url: group.avatar_url,
                admin_id: Some(group.admin_id),
                member_ids: group.member_ids,
                created_at: chrono::Utc::now(),
            };
            self.conversations
                .write()
                .await
                .insert(id, conversation.clone());
            Ok(conversation)
        }

        async fn add_member(
            &self,
            id: ConversationId,
            user_id: UserId,
        ) -> Result<(), RepositoryError> {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            if !conversation.member_ids.contains(&user_id) {
                conversation.member_ids.push(user_id);
            }
            Ok(())
        }

        async fn remove_member(
            &self,
            id: ConversationId,
            user_id: UserId,
        ) -> Result<(), RepositoryError> {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            conversation.member_ids.retain(|member| *member != user_id);
            Ok(())
        }

        async fn update_info(
            &self,
            id: ConversationId,
            name: Option<String>,
            description: Option<String>,
            avatar_url: Option<String>,
        ) -> Result<(), RepositoryError> {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            if let Some(name) = name {
                conversation.name = Some(name);
            }
            if let Some(description) = description {
                conversation.description = Some(description);
            }
            if let Some(avatar_url) = avatar_url {
                conversation.avatar_url = Some(avatar_url);
            }
            Ok(())
        }

        async fn set_admin(
            &self,
            id: ConversationId,
            new_admin: UserId,
        ) -> Result<(), RepositoryError> {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            conversation.admin_id = Some(new_admin);
            Ok(())
        }

        async fn delete(&self, id: ConversationId) -> Result<(), RepositoryError> {
            self.conversations
                .write()
                .await
                .remove(&id)
                .ok_or(RepositoryError::NotFound)?;
            Ok(())
        }
    }

    pub struct MemoryMessageRepository {
        conversations: Arc<MemoryConversationRepository>,
        messages: RwLock<HashMap<MessageId, Message>>,
        statuses: RwLock<HashMap<(MessageId, UserId), MessageStatus>>,
        hidden: RwLock<HashSet<(MessageId, UserId)>>,
        next_id: AtomicI64,
    }

    impl MemoryMessageRepository {
        pub fn new(conversations: Arc<MemoryConversationRepository>) -> Self {
            Self {
                conversations,
                messages: RwLock::new(HashMap::new()),
                statuses: RwLock::new(HashMap::new()),
                hidden: RwLock::new(HashSet::new()),
                next_id: AtomicI64::new(1),
            }
        }

        pub async fn is_hidden_for(&self, id: MessageId, user_id: UserId) -> bool {
            self.hidden.read().await.contains(&(id, user_id))
        }

        async fn conversation_kind(
            &self,
            id: ConversationId,
        ) -> Result<Option<ConversationKind>, RepositoryError> {
            Ok(self
                .conversations
                .find_by_id(id)
                .await?
                .map(|conversation| conversation.kind))
        }
    }

    #[async_trait]
    impl MessageRepository for MemoryMessageRepository {
        async fn create_direct(
            &self,
            sender: UserId,
            recipient: UserId,
            draft: MessageDraft,
        ) -> Result<Message, RepositoryError> {
            let conversation_id = self.conversations.resolve_direct(sender, recipient).await?;
            self.create_in_conversation(conversation_id, sender, draft)
                .await
        }

        async fn create_in_conversation(
            &self,
            conversation_id: ConversationId,
            sender: UserId,
            draft: MessageDraft,
        ) -> Result<Message, RepositoryError> {
            let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let message = Message {
                id,
                conversation_id,
                sender_id: sender,
                body: draft.body.into_inner(),
                content_type: draft.content_type,
                media_url: draft.media_url,
                status: MessageStatus::Sent,
                edited: false,
                deleted: false,
                created_at: chrono::Utc::now(),
            };
            self.messages.write().await.insert(id, message.clone());
            Ok(message)
        }

        async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
            Ok(self.messages.read().await.get(&id).cloned())
        }

        async fn update_status(
            &self,
            id: MessageId,
            recipient: UserId,
            status: MessageStatus,
        ) -> Result<bool, RepositoryError> {
            let conversation_id = {
                let messages = self.messages.read().await;
                messages
                    .get(&id)
                    .map(|message| message.conversation_id)
                    .ok_or(RepositoryError::NotFound)?
            };

            let mut statuses = self.statuses.write().await;
            let current = statuses
                .get(&(id, recipient))
                .copied()
                .unwrap_or(MessageStatus::Sent);
            if !current.can_transition_to(status) {
                return Ok(false);
            }
            statuses.insert((id, recipient), status);
            drop(statuses);

            // 私聊只有一个接收者，消息本体的状态与其保持同步
            if self.conversation_kind(conversation_id).await? == Some(ConversationKind::Direct) {
                if let Some(message) = self.messages.write().await.get_mut(&id) {
                    message.status = status;
                }
            }
            Ok(true)
        }

        async fn mark_conversation_read(
            &self,
            conversation_id: ConversationId,
            reader: UserId,
            up_to: MessageId,
        ) -> Result<Vec<UserId>, RepositoryError> {
            let targets: Vec<(MessageId, UserId)> = {
                let messages = self.messages.read().await;
                messages
                    .values()
                    .filter(|message| {
                        message.conversation_id == conversation_id
                            && message.id <= up_to
                            && message.sender_id != reader
                            && !message.deleted
                    })
                    .map(|message| (message.id, message.sender_id))
                    .collect()
            };

            let mut advanced_senders = Vec::new();
            for (message_id, sender_id) in targets {
                if self
                    .update_status(message_id, reader, MessageStatus::Read)
                    .await?
                    && !advanced_senders.contains(&sender_id)
                {
                    advanced_senders.push(sender_id);
                }
            }
            advanced_senders.sort();
            Ok(advanced_senders)
        }

        async fn update_body(
            &self,
            id: MessageId,
            body: String,
        ) -> Result<Message, RepositoryError> {
            let mut messages = self.messages.write().await;
            let message = messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            message.body = body;
            message.edited = true;
            Ok(message.clone())
        }

        async fn delete_for_everyone(&self, id: MessageId) -> Result<(), RepositoryError> {
            let mut messages = self.messages.write().await;
            let message = messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            message.deleted = true;
            Ok(())
        }

        async fn hide_for_user(
            &self,
            id: MessageId,
            user_id: UserId,
        ) -> Result<(), RepositoryError> {
            if !self.messages.read().await.contains_key(&id) {
                return Err(RepositoryError::NotFound);
            }
            self.hidden.write().await.insert((id, user_id));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::*;
    use super::*;
    use domain::MessageContent;
    use std::sync::Arc;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    fn draft(text: &str) -> MessageDraft {
        MessageDraft::text(MessageContent::new(text).unwrap())
    }

    fn message_repo() -> (Arc<MemoryConversationRepository>, MemoryMessageRepository) {
        let conversations = Arc::new(MemoryConversationRepository::new());
        let messages = MemoryMessageRepository::new(conversations.clone());
        (conversations, messages)
    }

    #[tokio::test]
    async fn direct_conversation_is_reused() {
        let (_, repo) = message_repo();
        let alice = user();
        let bob = user();

        let first = repo.create_direct(alice, bob, draft("hi")).await.unwrap();
        let second = repo.create_direct(bob, alice, draft("hey")).await.unwrap();
        assert_eq!(first.conversation_id, second.conversation_id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn status_updates_are_monotonic_per_recipient() {
        let (_, repo) = message_repo();
        let alice = user();
        let bob = user();
        let message = repo.create_direct(alice, bob, draft("hi")).await.unwrap();

        assert!(repo
            .update_status(message.id, bob, MessageStatus::Delivered)
            .await
            .unwrap());
        // 重复送达不再应用
        assert!(!repo
            .update_status(message.id, bob, MessageStatus::Delivered)
            .await
            .unwrap());
        assert!(repo
            .update_status(message.id, bob, MessageStatus::Read)
            .await
            .unwrap());
        // 已读之后回退到已送达被忽略
        assert!(!repo
            .update_status(message.id, bob, MessageStatus::Delivered)
            .await
            .unwrap());

        let stored = repo.find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn read_can_skip_delivered() {
        let (_, repo) = message_repo();
        let alice = user();
        let bob = user();
        let message = repo.create_direct(alice, bob, draft("hi")).await.unwrap();

        assert!(repo
            .update_status(message.id, bob, MessageStatus::Read)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn group_status_is_tracked_per_recipient() {
        let (conversations, repo) = message_repo();
        let alice = user();
        let bob = user();
        let carol = user();
        let group = conversations
            .create_group(domain::NewGroup {
                name: domain::GroupName::parse("team").unwrap(),
                description: None,
                avatar_url: None,
                admin_id: alice,
                member_ids: vec![alice, bob, carol],
            })
            .await
            .unwrap();
        let message = repo
            .create_in_conversation(group.id, alice, draft("hello all"))
            .await
            .unwrap();

        assert!(repo
            .update_status(message.id, bob, MessageStatus::Read)
            .await
            .unwrap());
        // carol 的维度不受 bob 影响
        assert!(repo
            .update_status(message.id, carol, MessageStatus::Delivered)
            .await
            .unwrap());
        // 群聊不改消息本体的聚合状态
        let stored = repo.find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn mark_conversation_read_returns_distinct_senders() {
        let (_, repo) = message_repo();
        let alice = user();
        let bob = user();

        let first = repo.create_direct(alice, bob, draft("one")).await.unwrap();
        let second = repo.create_direct(alice, bob, draft("two")).await.unwrap();
        let later = repo.create_direct(alice, bob, draft("three")).await.unwrap();

        let senders = repo
            .mark_conversation_read(first.conversation_id, bob, second.id)
            .await
            .unwrap();
        assert_eq!(senders, vec![alice]);

        // 水位线之后的消息未被推进
        assert!(repo
            .update_status(later.id, bob, MessageStatus::Read)
            .await
            .unwrap());

        // 再读一遍没有任何推进，发送者列表为空
        let senders = repo
            .mark_conversation_read(first.conversation_id, bob, second.id)
            .await
            .unwrap();
        assert!(senders.is_empty());
    }

    #[tokio::test]
    async fn hide_and_delete_flags() {
        let (_, repo) = message_repo();
        let alice = user();
        let bob = user();
        let message = repo.create_direct(alice, bob, draft("secret")).await.unwrap();

        repo.hide_for_user(message.id, bob).await.unwrap();
        assert!(repo.is_hidden_for(message.id, bob).await);
        assert!(!repo.is_hidden_for(message.id, alice).await);

        repo.delete_for_everyone(message.id).await.unwrap();
        let stored = repo.find_by_id(message.id).await.unwrap().unwrap();
        assert!(stored.deleted);
    }

    #[tokio::test]
    async fn friendship_round_trip() {
        let users = Arc::new(MemoryUserRepository::new());
        let alice = user();
        let bob = user();
        users
            .insert(UserSummary {
                id: alice,
                username: "alice".into(),
                display_name: None,
                avatar_url: None,
                online: false,
                last_seen: None,
            })
            .await;
        users
            .insert(UserSummary {
                id: bob,
                username: "bob".into(),
                display_name: None,
                avatar_url: None,
                online: false,
                last_seen: None,
            })
            .await;
        let repo = MemoryFriendshipRepository::new(users);

        assert!(!repo.are_friends(alice, bob).await.unwrap());
        let request = repo.create_request(alice, bob).await.unwrap();
        assert!(repo.pending_request_between(bob, alice).await.unwrap());

        let sent = repo.list_sent(alice).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender.username, "alice");

        repo.accept_request(request.id).await.unwrap();
        assert!(repo.are_friends(alice, bob).await.unwrap());
        assert!(!repo.pending_request_between(alice, bob).await.unwrap());
        assert!(repo.list_sent(alice).await.unwrap().is_empty());
        assert_eq!(repo.list_friend_ids(bob).await.unwrap(), vec![alice]);
    }
}

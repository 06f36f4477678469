//! 用户摘要定义
//!
//! 下行事件里出现的用户信息只有这份摘要，
//! 注册、资料管理等归属独立的账号系统。

use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

/// 用户摘要
///
/// 随好友列表、好友请求、消息事件一起下发，
/// 字段按 camelCase 序列化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// 用户唯一ID
    pub id: UserId,
    /// 用户名（唯一）
    pub username: String,
    /// 显示名称（可选）
    pub display_name: Option<String>,
    /// 头像URL（可选）
    pub avatar_url: Option<String>,
    /// 是否在线
    pub online: bool,
    /// 最后一次完全离线的时间
    pub last_seen: Option<Timestamp>,
}

impl UserSummary {
    /// 下行事件展示用的名称，显示名优先
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn serializes_camel_case() {
        let summary = UserSummary {
            id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
            display_name: Some("Alice".to_string()),
            avatar_url: None,
            online: true,
            last_seen: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("displayName").is_some());
        assert!(json.get("avatarUrl").is_some());
        assert!(json.get("lastSeen").is_some());
        assert_eq!(json["online"], serde_json::json!(true));
    }

    #[test]
    fn display_label_prefers_display_name() {
        let mut summary = UserSummary {
            id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
            display_name: Some("Alice W".to_string()),
            avatar_url: None,
            online: false,
            last_seen: None,
        };
        assert_eq!(summary.display_label(), "Alice W");
        summary.display_name = None;
        assert_eq!(summary.display_label(), "alice");
    }
}

//! JWT 鉴权
//!
//! WebSocket 升级前完成身份校验。令牌放在 `Authorization: Bearer`
//! 请求头里；浏览器原生 WebSocket 无法携带自定义请求头，
//! 所以同时接受 `?token=` 查询参数。

use axum::http::HeaderMap;
use config::JwtConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT 编解码服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户签发访问令牌
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            user_id,
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|err| {
            tracing::error!(error = %err, "JWT 签发失败");
            ApiError::internal_server_error("failed to issue token")
        })
    }

    /// 校验并解析令牌
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|_| ApiError::unauthorized("invalid or expired token"))
    }

    /// 从请求头或查询参数中取出令牌并校验
    ///
    /// 请求头优先，二者都缺时视为未认证。
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<Claims, ApiError> {
        let header_token = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let token = header_token
            .or(query_token)
            .ok_or_else(|| ApiError::unauthorized("missing access token"))?;

        self.verify_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-of-sufficient-length".to_string(),
            expiration_hours: 24,
        })
    }

    #[test]
    fn token_round_trip() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.generate_token(user_id).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service().generate_token(Uuid::new_v4()).unwrap();

        let other = JwtService::new(JwtConfig {
            secret: "a-completely-different-secret-string".to_string(),
            expiration_hours: 24,
        });
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn authenticate_prefers_header_over_query() {
        let service = service();
        let header_user = Uuid::new_v4();
        let query_user = Uuid::new_v4();

        let header_token = service.generate_token(header_user).unwrap();
        let query_token = service.generate_token(query_user).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {header_token}").parse().unwrap(),
        );

        let claims = service
            .authenticate(&headers, Some(query_token.as_str()))
            .unwrap();
        assert_eq!(claims.user_id, header_user);
    }

    #[test]
    fn authenticate_falls_back_to_query_param() {
        let service = service();
        let user_id = Uuid::new_v4();
        let token = service.generate_token(user_id).unwrap();

        let claims = service
            .authenticate(&HeaderMap::new(), Some(token.as_str()))
            .unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn authenticate_without_token_is_unauthorized() {
        assert!(service().authenticate(&HeaderMap::new(), None).is_err());
    }
}

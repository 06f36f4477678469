//! HTTP 层统一错误响应
//!
//! WebSocket 升级之前的失败（鉴权、参数）走这里返回 JSON 错误体，
//! 升级之后的业务错误改由下行错误事件承载，不再经过本模块。

use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::DomainError;

        match error {
            ApplicationError::Domain(domain_err) => match domain_err {
                DomainError::InvalidArgument { field, reason } => ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "INVALID_ARGUMENT",
                    format!("{}: {}", field, reason),
                ),
                DomainError::UserNotFound { .. } => {
                    ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
                }
                DomainError::MessageNotFound { .. } => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "MESSAGE_NOT_FOUND",
                    "message not found",
                ),
                DomainError::ConversationNotFound { .. } => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "CONVERSATION_NOT_FOUND",
                    "conversation not found",
                ),
                DomainError::GroupNotFound { .. } => {
                    ApiError::new(StatusCode::NOT_FOUND, "GROUP_NOT_FOUND", "group not found")
                }
                DomainError::FriendRequestNotFound { .. } => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "FRIEND_REQUEST_NOT_FOUND",
                    "friend request not found",
                ),
                DomainError::CallSessionNotFound { .. } => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "CALL_NOT_FOUND",
                    "call session not found",
                ),
                DomainError::NotFriends => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "NOT_FRIENDS",
                    "users are not friends",
                ),
                DomainError::NotConversationMember => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "NOT_CONVERSATION_MEMBER",
                    "not a member of the conversation",
                ),
                DomainError::AdminRequired => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "ADMIN_REQUIRED",
                    "group admin required",
                ),
                DomainError::NotMessageSender => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "NOT_MESSAGE_SENDER",
                    "only the sender may do this",
                ),
                DomainError::AdminCannotLeave => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "ADMIN_CANNOT_LEAVE",
                    "admin must transfer ownership before leaving",
                ),
                DomainError::AlreadyFriends => {
                    ApiError::new(StatusCode::CONFLICT, "ALREADY_FRIENDS", "already friends")
                }
                DomainError::DuplicateFriendRequest => ApiError::new(
                    StatusCode::CONFLICT,
                    "DUPLICATE_FRIEND_REQUEST",
                    "a pending friend request already exists",
                ),
                DomainError::NotRequestRecipient => ApiError::new(
                    StatusCode::FORBIDDEN,
                    "NOT_REQUEST_RECIPIENT",
                    "only the recipient may resolve the request",
                ),
                DomainError::OperationNotAllowed { reason } => {
                    ApiError::new(StatusCode::FORBIDDEN, "OPERATION_NOT_ALLOWED", reason)
                }
            },
            ApplicationError::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { .. } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "storage error",
                ),
            },
            ApplicationError::Infrastructure(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFRASTRUCTURE_ERROR",
                message,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

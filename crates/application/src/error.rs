use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl ApplicationError {
    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }

    /// 下发给客户端的错误文案
    ///
    /// 领域错误原样透出，其余统一为内部错误，避免泄露细节。
    pub fn client_message(&self) -> String {
        match self {
            ApplicationError::Domain(e) => e.to_string(),
            ApplicationError::Repository(_) | ApplicationError::Infrastructure(_) => {
                "internal error".to_string()
            }
        }
    }
}

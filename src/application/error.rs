//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{JobError, RepositoryError, StoreError, TtsError};
use crate::domain::reading_rule::RuleError;
use crate::domain::task::TaskError;
use crate::domain::SegmentError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 与当前状态冲突
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 规则不适用于目标任务
    #[error("Scope error: {0}")]
    ScopeError(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 合成服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建冲突错误
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(msg) => Self::Conflict(msg),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<SegmentError> for ApplicationError {
    fn from(err: SegmentError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<TaskError> for ApplicationError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::SentenceNotFound(id) => Self::not_found("Sentence", *id.as_uuid()),
            TaskError::InvalidContent(_)
            | TaskError::InvalidVoiceParams(_)
            | TaskError::InvalidPause(_)
            | TaskError::Segment(_) => Self::ValidationError(err.to_string()),
            TaskError::InvalidTransition { .. }
            | TaskError::NotEditable(_)
            | TaskError::StaleRebreakTarget(_)
            | TaskError::OverlappingTargets(_) => Self::Conflict(err.to_string()),
        }
    }
}

impl From<RuleError> for ApplicationError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::OutOfScope { .. } => Self::ScopeError(err.to_string()),
            _ => Self::ValidationError(err.to_string()),
        }
    }
}

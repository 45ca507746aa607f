// ==========================================
// 血库记录系统 - API层错误类型
// ==========================================
// 职责: 统一对外错误,把引擎/仓储/导入错误转换为用户可读的消息
// ==========================================

use crate::engine::error::LedgerError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效血型: '{0}'")]
    InvalidBloodType(String),

    #[error("无效数量: '{0}' (必须为正整数)")]
    InvalidUnits(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("库存不足: {blood_type} 现有 {available} 单位, 需要 {requested} 单位")]
    InsufficientStock {
        blood_type: String,
        available: u32,
        requested: u32,
    },

    // ==========================================
    // 存储/导入错误
    // ==========================================
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 LedgerError 转换
// ==========================================
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidBloodType(v) => ApiError::InvalidBloodType(v),
            LedgerError::InvalidUnits(v) => ApiError::InvalidUnits(v),
            LedgerError::InsufficientStock {
                blood_type,
                available,
                requested,
            } => ApiError::InsufficientStock {
                blood_type,
                available,
                requested,
            },
            LedgerError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            LedgerError::LockError(msg) => ApiError::InternalError(format!("锁获取失败: {}", msg)),
            LedgerError::MalformedHistoryEvent { row, reason } => {
                ApiError::InternalError(format!("历史记录损坏 (row={}): {}", row, reason))
            }
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => ApiError::InternalError(format!("存储锁获取失败: {}", msg)),
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::StorageUnavailable(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::StorageError(msg) => ApiError::StorageUnavailable(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

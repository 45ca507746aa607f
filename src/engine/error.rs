// ==========================================
// 血库记录系统 - 引擎层错误类型
// ==========================================
// 职责: 库存/历史对账的错误分类
// 传播: 校验错误直接返回调用方,不修改任何状态
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum LedgerError {
    // ===== 校验错误 =====
    #[error("无效血型: '{0}'")]
    InvalidBloodType(String),

    #[error("无效数量: '{0}' (必须为正整数)")]
    InvalidUnits(String),

    #[error("库存不足: blood_type={blood_type}, available={available}, requested={requested}")]
    InsufficientStock {
        blood_type: String,
        available: u32,
        requested: u32,
    },

    // ===== 聚合错误 (只计数,不中断) =====
    #[error("历史记录损坏: row={row}, reason={reason}")]
    MalformedHistoryEvent { row: usize, reason: String },

    // ===== 存储错误 =====
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

// 存储层的所有失败统一视为 StorageUnavailable
impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => LedgerError::LockError(msg),
            other => LedgerError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type LedgerResult<T> = Result<T, LedgerError>;

// ==========================================
// 血库记录系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 存储不可用 =====
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("数据表不存在: {0}")]
    TableNotFound(String),

    #[error("表头不匹配 (table={table}): 期望 {expected:?}, 实际 {actual:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    // ===== 并发 =====
    #[error("存储锁获取失败: {0}")]
    LockError(String),

    // ===== 后端错误 =====
    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("CSV 读写失败: {0}")]
    CsvError(String),

    #[error("序列化失败: {0}")]
    SerializationError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::CannotOpen
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                RepositoryError::StorageUnavailable(msg.unwrap_or_else(|| e.to_string()))
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for RepositoryError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            RepositoryError::StorageUnavailable(err.to_string())
        } else {
            RepositoryError::CsvError(err.to_string())
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::StorageUnavailable(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

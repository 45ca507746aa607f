// ==========================================
// 血库记录系统 - SQLite 连接初始化
// ==========================================
// 用途: SqliteRecordStore 的连接统一从这里打开
// - 外键/busy_timeout 每个连接单独设置
// - 用 PRAGMA user_version 标记存储布局版本
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 写锁等待上限（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// record_table / record_row 布局版本
pub const STORE_FORMAT_VERSION: i64 = 1;

/// 应用连接级 PRAGMA
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开数据库文件
///
/// 文件库额外切换到 WAL,菜单写入时驾驶舱刷新可并发读
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    tracing::debug!(db_path, journal_mode = %mode, "SQLite 连接已打开");
    Ok(conn)
}

/// 打开内存库（测试用）
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取存储布局版本（新库为 0）
pub fn read_store_format(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// 检查并标记存储布局版本
///
/// - 新库: 写入当前版本
/// - 版本不一致: 只告警,不做迁移
pub fn ensure_store_format(conn: &Connection) -> rusqlite::Result<i64> {
    let found = read_store_format(conn)?;
    if found == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {};", STORE_FORMAT_VERSION))?;
        return Ok(STORE_FORMAT_VERSION);
    }
    if found != STORE_FORMAT_VERSION {
        tracing::warn!(
            found,
            expected = STORE_FORMAT_VERSION,
            "SQLite 存储布局版本不一致，继续运行但可能读取失败"
        );
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_db_gets_current_format() {
        let conn = open_in_memory_connection().unwrap();
        assert_eq!(read_store_format(&conn).unwrap(), 0);
        assert_eq!(ensure_store_format(&conn).unwrap(), STORE_FORMAT_VERSION);
        assert_eq!(read_store_format(&conn).unwrap(), STORE_FORMAT_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory_connection().unwrap();
        let on: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_future_format_is_reported_not_rewritten() {
        let conn = open_in_memory_connection().unwrap();
        conn.execute_batch("PRAGMA user_version = 7;").unwrap();
        assert_eq!(ensure_store_format(&conn).unwrap(), 7);
    }
}

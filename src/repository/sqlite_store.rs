// ==========================================
// 血库记录系统 - SQLite 表格存储
// ==========================================
// 布局:
// - record_table(name, header_json)     表头
// - record_row(table_name, seq, cells_json)  数据行, seq 为追加顺序
// ==========================================

use crate::db::{ensure_store_format, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{check_header, RecordStore, Row, TableData};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 打开数据库文件并建立存储表
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::StorageUnavailable(format!("{}: {}", db_path, e)))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn init_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS record_table (
                name TEXT PRIMARY KEY,
                header_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS record_row (
                table_name TEXT NOT NULL REFERENCES record_table(name) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                cells_json TEXT NOT NULL,
                PRIMARY KEY (table_name, seq)
            );
            "#,
        )?;
        ensure_store_format(&conn)?;
        Ok(())
    }

    fn read_header(conn: &Connection, table: &str) -> RepositoryResult<Option<Vec<String>>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT header_json FROM record_table WHERE name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn ensure_table(&self, table: &str, header: &[&str]) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        match Self::read_header(&conn, table)? {
            Some(existing) => check_header(table, header, &existing),
            None => {
                conn.execute(
                    "INSERT INTO record_table (name, header_json) VALUES (?1, ?2)",
                    params![table, serde_json::to_string(header)?],
                )?;
                Ok(())
            }
        }
    }

    fn load_all(&self, table: &str) -> RepositoryResult<TableData> {
        let conn = self.get_conn()?;
        let header = Self::read_header(&conn, table)?
            .ok_or_else(|| RepositoryError::TableNotFound(table.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT cells_json FROM record_row WHERE table_name = ?1 ORDER BY seq ASC")?;
        let raw_rows = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for raw in raw_rows {
            rows.push(serde_json::from_str::<Row>(&raw)?);
        }

        Ok(TableData { header, rows })
    }

    fn append(&self, table: &str, row: Row) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        if Self::read_header(&conn, table)?.is_none() {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }

        conn.execute(
            r#"
            INSERT INTO record_row (table_name, seq, cells_json)
            VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM record_row WHERE table_name = ?1), ?2)
            "#,
            params![table, serde_json::to_string(&row)?],
        )?;
        Ok(())
    }

    fn replace_all(&self, table: &str, rows: Vec<Row>) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        if Self::read_header(&conn, table)?.is_none() {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM record_row WHERE table_name = ?1", params![table])?;
        for (idx, row) in rows.iter().enumerate() {
            tx.execute(
                "INSERT INTO record_row (table_name, seq, cells_json) VALUES (?1, ?2, ?3)",
                params![table, (idx + 1) as i64, serde_json::to_string(row)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

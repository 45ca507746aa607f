// ==========================================
// 血库记录系统 - 内存表格存储
// ==========================================
// 用途: 测试 / 临时会话,进程退出即丢失
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{check_header, RecordStore, Row, TableData};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<BTreeMap<String, TableData>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn ensure_table(&self, table: &str, header: &[&str]) -> RepositoryResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        match tables.get(table) {
            Some(existing) => check_header(table, header, &existing.header),
            None => {
                tables.insert(table.to_string(), TableData::new(header));
                Ok(())
            }
        }
    }

    fn load_all(&self, table: &str) -> RepositoryResult<TableData> {
        let tables = self
            .tables
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        tables
            .get(table)
            .cloned()
            .ok_or_else(|| RepositoryError::TableNotFound(table.to_string()))
    }

    fn append(&self, table: &str, row: Row) -> RepositoryResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| RepositoryError::TableNotFound(table.to_string()))?;
        data.rows.push(row);
        Ok(())
    }

    fn replace_all(&self, table: &str, rows: Vec<Row>) -> RepositoryResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| RepositoryError::TableNotFound(table.to_string()))?;
        data.rows = rows;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

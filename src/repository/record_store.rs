// ==========================================
// 血库记录系统 - 表格存储抽象
// ==========================================
// 职责: 带表头的行存储 (追加 / 全表扫描 / 整表替换)
// 实现者: MemoryRecordStore, CsvRecordStore, SqliteRecordStore
// 约束: 单写者; 持久化语义为"最后写入生效"
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};

/// 一行数据 (按表头列序)
pub type Row = Vec<String>;

// ==========================================
// TableData - 表头 + 有序数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl TableData {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名 → 列序号
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }
}

// ==========================================
// RecordStore Trait
// ==========================================
pub trait RecordStore: Send + Sync {
    /// 建表（已存在则不做任何事）
    fn ensure_table(&self, table: &str, header: &[&str]) -> RepositoryResult<()>;

    /// 全表扫描,按追加顺序返回
    fn load_all(&self, table: &str) -> RepositoryResult<TableData>;

    /// 追加一行
    fn append(&self, table: &str, row: Row) -> RepositoryResult<()>;

    /// 整表替换数据行（表头保持不变）
    fn replace_all(&self, table: &str, rows: Vec<Row>) -> RepositoryResult<()>;

    /// 后端名称（日志用）
    fn backend_name(&self) -> &'static str;

    /// 原地更新满足条件的行
    ///
    /// # 返回
    /// 被更新的行数
    fn update_where(
        &self,
        table: &str,
        predicate: &dyn Fn(&Row) -> bool,
        update: &dyn Fn(&mut Row),
    ) -> RepositoryResult<usize> {
        let mut data = self.load_all(table)?;
        let mut count = 0;
        for row in data.rows.iter_mut().filter(|r| predicate(r)) {
            update(row);
            count += 1;
        }
        if count > 0 {
            self.replace_all(table, data.rows)?;
        }
        Ok(count)
    }

    /// 删除满足条件的行
    ///
    /// # 返回
    /// 被删除的行数
    fn delete_where(&self, table: &str, predicate: &dyn Fn(&Row) -> bool) -> RepositoryResult<usize> {
        let data = self.load_all(table)?;
        let before = data.rows.len();
        let kept: Vec<Row> = data.rows.into_iter().filter(|r| !predicate(r)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.replace_all(table, kept)?;
        }
        Ok(removed)
    }
}

/// 校验已存在表的表头
pub(crate) fn check_header(table: &str, expected: &[&str], actual: &[String]) -> RepositoryResult<()> {
    let matches = expected.len() == actual.len()
        && expected.iter().zip(actual).all(|(e, a)| e.trim() == a.trim());
    if matches {
        Ok(())
    } else {
        Err(RepositoryError::SchemaMismatch {
            table: table.to_string(),
            expected: expected.iter().map(|h| h.to_string()).collect(),
            actual: actual.to_vec(),
        })
    }
}

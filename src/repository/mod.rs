// ==========================================
// 血库记录系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供表格存储抽象与实体映射,屏蔽存储细节
// ==========================================

pub mod csv_store;
pub mod donor_repo;
pub mod error;
pub mod history_repo;
pub mod memory_store;
pub mod patient_repo;
pub mod record_store;
pub mod schema;
pub mod sqlite_store;
pub mod stock_repo;

// 重导出核心仓储
pub use csv_store::CsvRecordStore;
pub use donor_repo::DonorRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::HistoryRepository;
pub use memory_store::MemoryRecordStore;
pub use patient_repo::PatientRepository;
pub use record_store::{RecordStore, Row, TableData};
pub use sqlite_store::SqliteRecordStore;
pub use stock_repo::StockRepository;

use crate::domain::history::parse_unit_cell;

// ==========================================
// 行级辅助函数
// ==========================================

/// 首列编号是否等于 id（兼容 Excel 读出的 "3.0"）
pub(crate) fn id_matches(row: &Row, id: &str) -> bool {
    match row.first() {
        Some(cell) => {
            cell.trim() == id
                || matches!((parse_unit_cell(cell), id.parse::<u32>()), (Some(a), Ok(b)) if a == b)
        }
        None => false,
    }
}

/// 任一列包含关键字（不区分大小写）
pub(crate) fn row_matches(row: &Row, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    row.iter().any(|cell| cell.to_lowercase().contains(&needle))
}

/// 首列的最大数字编号（无数字编号时为 0）
pub(crate) fn max_numeric_id(rows: &[Row]) -> u32 {
    rows.iter()
        .filter_map(|row| row.first().and_then(|cell| parse_unit_cell(cell)))
        .max()
        .unwrap_or(0)
}

/// 写入单元格（行长度不足时补齐）
pub(crate) fn set_cell(row: &mut Row, idx: usize, value: &str) {
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value.to_string();
}

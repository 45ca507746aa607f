// ==========================================
// 血库记录系统 - 历史数据仓储
// ==========================================
// 对齐: History 表 (ID, Type, Name, Blood Type, Units, Action, Date)
// 红线: 只追加,不提供修改/删除
// ==========================================

use crate::domain::history::{HistoryEvent, HistoryRecord};
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::RecordStore;
use crate::repository::schema::{HISTORY_HEADER, HISTORY_TABLE};
use std::sync::Arc;

pub struct HistoryRepository {
    store: Arc<dyn RecordStore>,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// 加载全部历史行（不做校验,按追加顺序）
    pub fn load_records(&self) -> RepositoryResult<Vec<HistoryRecord>> {
        self.store.ensure_table(HISTORY_TABLE, &HISTORY_HEADER)?;
        let data = self.store.load_all(HISTORY_TABLE)?;
        Ok(data.rows.iter().map(|row| HistoryRecord::from_row(row)).collect())
    }

    /// 追加一条历史事件
    pub fn append(&self, event: &HistoryEvent) -> RepositoryResult<HistoryRecord> {
        let record = HistoryRecord::from(event);
        self.store.append(HISTORY_TABLE, record.to_row())?;
        Ok(record)
    }
}

// ==========================================
// 血库记录系统 - 历史日志
// ==========================================
// 红线: 只追加; 无删除/修改接口
// 说明: 持久化加载的行可能损坏,原样保留,聚合时再校验
// ==========================================

use crate::domain::history::{HistoryEvent, HistoryRecord};
use std::sync::Arc;

// ==========================================
// HistoryLog - 只追加的历史记录
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从存储加载的原始行构造
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }

    /// 追加事件
    pub fn append(&mut self, event: &HistoryEvent) -> &HistoryRecord {
        self.push_record(HistoryRecord::from(event))
    }

    /// 追加已转换好的行
    pub(crate) fn push_record(&mut self, record: HistoryRecord) -> &HistoryRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// 按追加顺序遍历（每次调用都从头开始）
    pub fn scan(&self) -> impl Iterator<Item = &HistoryRecord> + '_ {
        self.records.iter()
    }

    /// 仅遍历可解析的事件
    pub fn events(&self) -> impl Iterator<Item = HistoryEvent> + '_ {
        self.records.iter().filter_map(|r| r.parse().ok())
    }

    /// 记录数（含损坏行）
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 不可变快照
    pub fn to_shared(&self) -> Arc<[HistoryRecord]> {
        Arc::from(self.records.as_slice())
    }
}

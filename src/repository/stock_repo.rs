// ==========================================
// 血库记录系统 - 库存数据仓储
// ==========================================
// 对齐: BloodStock 表 (Blood Type, Units)
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::history::parse_unit_cell;
use crate::domain::stock::StockEntry;
use crate::domain::types::BloodType;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{STOCK_HEADER, STOCK_TABLE};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct StockRepository {
    store: Arc<dyn RecordStore>,
}

impl StockRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// 加载全部血型库存
    ///
    /// - 表为空时按 8 个血型写入 0 库存
    /// - 数量无法解析的行按 0 处理
    /// - 未知血型的行忽略
    pub fn load(&self) -> RepositoryResult<BTreeMap<BloodType, u32>> {
        self.store.ensure_table(STOCK_TABLE, &STOCK_HEADER)?;
        let data = self.store.load_all(STOCK_TABLE)?;

        let mut levels: BTreeMap<BloodType, u32> = BloodType::ALL.iter().map(|bt| (*bt, 0)).collect();

        if data.is_empty() {
            tracing::info!("库存表为空，初始化 {} 个血型", BloodType::ALL.len());
            let seeded: Vec<StockEntry> = BloodType::ALL.iter().map(|bt| StockEntry::new(*bt, 0)).collect();
            self.save(&seeded)?;
            return Ok(levels);
        }

        for (idx, row) in data.rows.iter().enumerate() {
            let raw_bt = row.first().map(String::as_str).unwrap_or("");
            let Some(blood_type) = BloodType::parse(raw_bt) else {
                tracing::warn!("库存表第 {} 行血型无效，已忽略: '{}'", idx + 2, raw_bt);
                continue;
            };
            let raw_units = row.get(1).map(String::as_str).unwrap_or("");
            let units = parse_unit_cell(raw_units).unwrap_or_else(|| {
                tracing::warn!("库存表 {} 数量无法解析，按 0 处理: '{}'", blood_type, raw_units);
                0
            });
            levels.insert(blood_type, units);
        }

        Ok(levels)
    }

    /// 整表写回库存
    pub fn save(&self, entries: &[StockEntry]) -> RepositoryResult<()> {
        let rows: Vec<Row> = entries.iter().map(StockEntry::to_row).collect();
        self.store.replace_all(STOCK_TABLE, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_store::MemoryRecordStore;

    #[test]
    fn test_load_seeds_empty_table() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let repo = StockRepository::new(store.clone());

        let levels = repo.load().unwrap();
        assert_eq!(levels.len(), 8);
        assert!(levels.values().all(|u| *u == 0));
        assert_eq!(store.load_all(STOCK_TABLE).unwrap().len(), 8);
    }

    #[test]
    fn test_load_tolerates_bad_cells() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        store.ensure_table(STOCK_TABLE, &STOCK_HEADER).unwrap();
        for (bt, units) in [("A+", "4"), ("B+", "oops"), ("Z+", "9"), ("O-", "2.0")] {
            store.append(STOCK_TABLE, vec![bt.to_string(), units.to_string()]).unwrap();
        }

        let levels = StockRepository::new(store).load().unwrap();
        assert_eq!(levels[&BloodType::APos], 4);
        assert_eq!(levels[&BloodType::BPos], 0);
        assert_eq!(levels[&BloodType::ONeg], 2);
        assert_eq!(levels.len(), 8);
    }
}

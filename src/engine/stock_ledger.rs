// ==========================================
// 血库记录系统 - 库存账本
// ==========================================
// 职责: 8 个血型的当前库存数量与分级
// 红线: 库存永远 >= 0; 账本不感知历史
// ==========================================

use crate::config::stock_settings::ThresholdConfig;
use crate::domain::stock::{StockAlert, StockEntry};
use crate::domain::types::{BloodType, StockStatus};
use std::collections::BTreeMap;

// ==========================================
// StockLedger - 库存账本
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLedger {
    levels: BTreeMap<BloodType, u32>,
    thresholds: ThresholdConfig,
}

impl StockLedger {
    /// 空账本（全部血型为 0）
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self {
            levels: BloodType::ALL.iter().map(|bt| (*bt, 0)).collect(),
            thresholds,
        }
    }

    /// 从已加载的库存构造（缺失的血型补 0）
    pub fn from_levels(levels: BTreeMap<BloodType, u32>, thresholds: ThresholdConfig) -> Self {
        let mut ledger = Self::new(thresholds);
        ledger.levels.extend(levels);
        ledger
    }

    /// 入库
    ///
    /// # 返回
    /// 入库后的库存数量
    pub fn credit(&mut self, blood_type: BloodType, units: u32) -> u32 {
        let level = self.levels.entry(blood_type).or_insert(0);
        *level = level.saturating_add(units);
        *level
    }

    /// 出库（扣减到 0 为止）
    ///
    /// # 返回
    /// 实际扣减的数量
    pub fn debit(&mut self, blood_type: BloodType, units: u32) -> u32 {
        let level = self.levels.entry(blood_type).or_insert(0);
        let applied = units.min(*level);
        *level -= applied;
        applied
    }

    pub fn level(&self, blood_type: BloodType) -> u32 {
        self.levels.get(&blood_type).copied().unwrap_or(0)
    }

    pub fn threshold(&self, blood_type: BloodType) -> u32 {
        self.thresholds.threshold_for(blood_type)
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// 库存分级
    ///
    /// - level <= T: Critical
    /// - T < level <= 2T: Low
    /// - level > 2T: Healthy
    pub fn classify(&self, blood_type: BloodType) -> StockStatus {
        classify_level(self.level(blood_type), self.threshold(blood_type))
    }

    /// 全部血型库存（按标准顺序）
    pub fn entries(&self) -> Vec<StockEntry> {
        BloodType::ALL
            .iter()
            .map(|bt| StockEntry::new(*bt, self.level(*bt)))
            .collect()
    }

    pub fn levels(&self) -> &BTreeMap<BloodType, u32> {
        &self.levels
    }

    /// 非 Healthy 的血型列表
    pub fn low_stock_alerts(&self) -> Vec<StockAlert> {
        BloodType::ALL
            .iter()
            .filter_map(|bt| {
                let status = self.classify(*bt);
                (status != StockStatus::Healthy).then(|| StockAlert {
                    blood_type: *bt,
                    units: self.level(*bt),
                    threshold: self.threshold(*bt),
                    status,
                })
            })
            .collect()
    }
}

/// 按阈值 T 对库存数量分级
pub fn classify_level(level: u32, threshold: u32) -> StockStatus {
    if level <= threshold {
        StockStatus::Critical
    } else if u64::from(level) <= 2 * u64::from(threshold) {
        StockStatus::Low
    } else {
        StockStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_floors_at_zero() {
        let mut ledger = StockLedger::new(ThresholdConfig::default());
        ledger.credit(BloodType::APos, 2);

        let applied = ledger.debit(BloodType::APos, 5);
        assert_eq!(applied, 2);
        assert_eq!(ledger.level(BloodType::APos), 0);
    }

    #[test]
    fn test_classify_boundaries() {
        // T = 5: 0..=5 Critical, 6..=10 Low, 11.. Healthy
        for level in 0..=30u32 {
            let expected = if level <= 5 {
                StockStatus::Critical
            } else if level <= 10 {
                StockStatus::Low
            } else {
                StockStatus::Healthy
            };
            assert_eq!(classify_level(level, 5), expected, "level={}", level);
        }
    }

    #[test]
    fn test_classify_zero_threshold() {
        assert_eq!(classify_level(0, 0), StockStatus::Critical);
        assert_eq!(classify_level(1, 0), StockStatus::Healthy);
    }

    #[test]
    fn test_classify_uses_per_type_threshold() {
        let mut levels = BTreeMap::new();
        levels.insert(BloodType::OPos, 12);
        levels.insert(BloodType::AbPos, 4);
        let ledger = StockLedger::from_levels(levels, ThresholdConfig::per_type_defaults());

        // O 型 T=10 → 12 属于 Low; AB 型 T=3 → 4 属于 Low
        assert_eq!(ledger.classify(BloodType::OPos), StockStatus::Low);
        assert_eq!(ledger.classify(BloodType::AbPos), StockStatus::Low);
        assert_eq!(ledger.classify(BloodType::BPos), StockStatus::Critical);
    }

    #[test]
    fn test_low_stock_alerts() {
        let mut ledger = StockLedger::new(ThresholdConfig::global(5));
        for bt in BloodType::ALL {
            ledger.credit(bt, 20);
        }
        ledger.debit(BloodType::ONeg, 17);

        let alerts = ledger.low_stock_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].blood_type, BloodType::ONeg);
        assert_eq!(alerts[0].units, 3);
        assert_eq!(alerts[0].status, StockStatus::Critical);
    }

    #[test]
    fn test_entries_in_canonical_order() {
        let ledger = StockLedger::new(ThresholdConfig::default());
        let order: Vec<BloodType> = ledger.entries().iter().map(|e| e.blood_type).collect();
        assert_eq!(order, BloodType::ALL.to_vec());
    }
}

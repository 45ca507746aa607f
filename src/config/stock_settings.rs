// ==========================================
// 血库记录系统 - 库存/驾驶舱配置视图
// ==========================================
// 职责: 定义引擎与驾驶舱使用的强类型配置,以及读取接口
// 实现者: ConfigManager
// ==========================================

use crate::domain::types::{BloodType, DebitPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;

/// 默认全局低库存阈值 T
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

// ==========================================
// ThresholdConfig - 低库存阈值
// ==========================================
// 全局阈值 + 按血型覆写
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub default: u32,
    pub per_type: BTreeMap<BloodType, u32>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::global(DEFAULT_LOW_STOCK_THRESHOLD)
    }
}

impl ThresholdConfig {
    /// 统一阈值
    pub fn global(threshold: u32) -> Self {
        Self {
            default: threshold,
            per_type: BTreeMap::new(),
        }
    }

    /// 按血型阈值（A/B 型 5, AB 型 3, O 型 10）
    pub fn per_type_defaults() -> Self {
        let per_type = BloodType::ALL
            .iter()
            .map(|bt| {
                let t = match bt {
                    BloodType::AbPos | BloodType::AbNeg => 3,
                    BloodType::OPos | BloodType::ONeg => 10,
                    _ => 5,
                };
                (*bt, t)
            })
            .collect();
        Self {
            default: DEFAULT_LOW_STOCK_THRESHOLD,
            per_type,
        }
    }

    pub fn with_override(mut self, blood_type: BloodType, threshold: u32) -> Self {
        self.per_type.insert(blood_type, threshold);
        self
    }

    /// 指定血型的阈值 T
    pub fn threshold_for(&self, blood_type: BloodType) -> u32 {
        self.per_type.get(&blood_type).copied().unwrap_or(self.default)
    }
}

// ==========================================
// DashboardSettings - 驾驶舱显示参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// 刷新周期（秒）
    pub refresh_interval_secs: u64,
    /// 趋势环形缓冲长度
    pub trend_buffer_len: usize,
    /// 趋势窗口天数（0 = 全部日期）
    pub trend_window_days: u32,
    /// 库存条最大长度
    pub bar_max_length: u32,
    /// 满格对应的库存数量
    pub bar_scale_units: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 2,
            trend_buffer_len: 20,
            trend_window_days: 0,
            bar_max_length: 30,
            bar_scale_units: 50,
        }
    }
}

// ==========================================
// StockConfigReader Trait
// ==========================================
// 用途: 引擎/API 通过该接口读取配置,不依赖具体存储
pub trait StockConfigReader: Send + Sync {
    /// 低库存阈值（全局 + 按血型覆写）
    fn get_thresholds(&self) -> Result<ThresholdConfig, Box<dyn Error>>;

    /// 出库策略
    fn get_debit_policy(&self) -> Result<DebitPolicy, Box<dyn Error>>;

    /// 驾驶舱参数
    fn get_dashboard_settings(&self) -> Result<DashboardSettings, Box<dyn Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_type_defaults() {
        let cfg = ThresholdConfig::per_type_defaults();
        assert_eq!(cfg.threshold_for(BloodType::AbNeg), 3);
        assert_eq!(cfg.threshold_for(BloodType::OPos), 10);
        assert_eq!(cfg.threshold_for(BloodType::BNeg), 5);
    }

    #[test]
    fn test_override_falls_back_to_global() {
        let cfg = ThresholdConfig::global(4).with_override(BloodType::ONeg, 8);
        assert_eq!(cfg.threshold_for(BloodType::ONeg), 8);
        assert_eq!(cfg.threshold_for(BloodType::APos), 4);
    }
}

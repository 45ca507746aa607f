// ==========================================
// 血库记录系统 - 库存领域模型
// ==========================================
// 对齐: BloodStock 表 (Blood Type, Units)
// 红线: units 永远 >= 0, 血型集合初始化后固定
// ==========================================

use crate::domain::types::{BloodType, StockStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// StockEntry - 单一血型库存
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub blood_type: BloodType,
    pub units: u32,
}

impl StockEntry {
    pub fn new(blood_type: BloodType, units: u32) -> Self {
        Self { blood_type, units }
    }

    /// 转换为表格行
    pub fn to_row(&self) -> Vec<String> {
        vec![self.blood_type.as_str().to_string(), self.units.to_string()]
    }
}

// ==========================================
// StockAlert - 低库存提醒
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub blood_type: BloodType,
    pub units: u32,
    pub threshold: u32,
    pub status: StockStatus,
}

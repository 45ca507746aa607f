// ==========================================
// 血库记录系统 - 领域类型定义
// ==========================================
// 红线: 血型是封闭枚举,不接受自由文本
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 血型 (Blood Type)
// ==========================================
// 8 个标准 ABO/Rh 血型,初始化后集合固定不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodType {
    /// 全部血型（与库存表初始化顺序一致）
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::AbPos,
        BloodType::AbNeg,
        BloodType::OPos,
        BloodType::ONeg,
    ];

    /// 转换为字符串 (用于表格存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
        }
    }

    /// 从字符串解析
    ///
    /// 输入会先 TRIM + 转大写,与控制台录入口径一致（"ab+" → AB+）
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        BloodType::ALL
            .iter()
            .copied()
            .find(|bt| bt.as_str() == normalized)
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 库存状态 (Stock Status)
// ==========================================
// 顺序: Critical < Low < Healthy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Critical, // 危急 (<= T)
    Low,      // 偏低 (<= 2T)
    Healthy,  // 充足
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::Critical => write!(f, "CRITICAL"),
            StockStatus::Low => write!(f, "LOW"),
            StockStatus::Healthy => write!(f, "HEALTHY"),
        }
    }
}

// ==========================================
// 操作主体类型 (Actor Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Donor,   // 献血者
    Patient, // 患者
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Donor => "Donor",
            ActorKind::Patient => "Patient",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Donor" | "donor" | "DONOR" => Some(ActorKind::Donor),
            "Patient" | "patient" | "PATIENT" => Some(ActorKind::Patient),
            _ => None,
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 历史动作 (History Action)
// ==========================================
// Donated: 入库 (credit); Needed: 出库 (debit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    Donated,
    Needed,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Donated => "Donated",
            HistoryAction::Needed => "Needed",
        }
    }

    /// 从字符串解析
    ///
    /// 兼容图形界面版本的历史表写法: "Add Donor" / "Add Patient"
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Donated" | "Add Donor" => Some(HistoryAction::Donated),
            "Needed" | "Add Patient" => Some(HistoryAction::Needed),
            _ => None,
        }
    }

    /// 与操作主体对应的默认动作
    pub fn for_actor(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Donor => HistoryAction::Donated,
            ActorKind::Patient => HistoryAction::Needed,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 出库策略 (Debit Policy)
// ==========================================
// Strict: 库存不足直接拒绝 (InsufficientStock)
// Clamp: 扣减到 0 为止,历史记录请求数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebitPolicy {
    #[default]
    Strict,
    Clamp,
}

impl DebitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebitPolicy::Strict => "STRICT",
            DebitPolicy::Clamp => "CLAMP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STRICT" => Some(DebitPolicy::Strict),
            "CLAMP" => Some(DebitPolicy::Clamp),
            _ => None,
        }
    }
}

impl fmt::Display for DebitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 血库记录系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod history;
pub mod records;
pub mod stock;
pub mod trend;
pub mod types;

// 重导出核心类型
pub use history::{HistoryEvent, HistoryRecord, MalformedField, HISTORY_TS_FORMAT};
pub use records::{DonorRecord, PatientRecord, NO_BLOOD_TYPE};
pub use stock::{StockAlert, StockEntry};
pub use trend::{DailyTrendPoint, DateWindow, TodayTotals, TrendSeries};
pub use types::{ActorKind, BloodType, DebitPolicy, HistoryAction, StockStatus};

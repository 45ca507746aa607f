// ==========================================
// 血库记录系统 - 引擎层
// ==========================================
// 职责: 库存账本、历史日志、趋势聚合、对账
// 红线: 引擎不直接读写文件,存储经由 Repository
// ==========================================

pub mod error;
pub mod history_log;
pub mod reconciler;
pub mod stock_ledger;
pub mod trend;

// 重导出核心引擎
pub use error::{LedgerError, LedgerResult};
pub use history_log::HistoryLog;
pub use reconciler::{AuditDiscrepancy, AuditReport, LedgerSnapshot, Reconciler};
pub use stock_ledger::{classify_level, StockLedger};
pub use trend::TrendAggregator;

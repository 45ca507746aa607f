// ==========================================
// 血库记录系统 - 配置层
// ==========================================
// 职责: 系统配置管理（阈值、出库策略、驾驶舱参数）
// 存储: Config 表
// ==========================================

pub mod config_manager;
pub mod stock_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use stock_settings::{DashboardSettings, StockConfigReader, ThresholdConfig};

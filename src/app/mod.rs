// ==========================================
// 血库记录系统 - 应用层
// ==========================================
// 职责: 组装各层组件,供控制台入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_data_dir, AppState, StoreBackend};

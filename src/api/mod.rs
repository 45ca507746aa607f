// ==========================================
// 血库记录系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供控制台菜单调用
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod registry_api;

// 重导出核心类型
pub use dashboard_api::{
    bar_length, spawn_refresh_loop, DashboardApi, DashboardObserver, DashboardSnapshot, StockGauge,
    TrendBuffer,
};
pub use error::{ApiError, ApiResult};
pub use registry_api::{parse_age, parse_units, BloodNeed, NewDonor, NewPatient, Registration, RegistryApi};

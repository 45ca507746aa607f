// ==========================================
// 血库记录系统 - 核心库
// ==========================================
// 核心: 库存账本 + 只追加历史 + 趋势聚合 + 对账
// 技术栈: Rust + CSV/SQLite 表格存储
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 表格存储
pub mod repository;

// 引擎层 - 账本/历史/趋势/对账
pub mod engine;

// 导入层 - 旧版 Excel/CSV 数据
pub mod importer;

// 配置层 - 阈值/策略/驾驶舱参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ActorKind, BloodType, DebitPolicy, HistoryAction, StockStatus};

// 领域实体
pub use domain::{
    DailyTrendPoint, DateWindow, DonorRecord, HistoryEvent, HistoryRecord, PatientRecord,
    StockAlert, StockEntry, TodayTotals, TrendSeries,
};

// 引擎
pub use engine::{
    AuditReport, HistoryLog, LedgerError, LedgerResult, LedgerSnapshot, Reconciler, StockLedger,
    TrendAggregator,
};

// 存储
pub use repository::{
    CsvRecordStore, MemoryRecordStore, RecordStore, RepositoryError, SqliteRecordStore,
};

// API
pub use api::{ApiError, ApiResult, DashboardApi, RegistryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "血库记录系统";

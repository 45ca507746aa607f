// ==========================================
// 血库记录系统 - 应用状态
// ==========================================
// 职责: 组装存储、配置、对账器与各 API 实例
// ==========================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{DashboardApi, RegistryApi};
use crate::config::config_manager::ConfigManager;
use crate::config::stock_settings::StockConfigReader;
use crate::engine::reconciler::Reconciler;
use crate::importer::{ImportSummary, WorkbookImporter};
use crate::repository::schema::ensure_all_tables;
use crate::repository::{CsvRecordStore, MemoryRecordStore, RecordStore, SqliteRecordStore};

/// SQLite 后端的数据库文件名
pub const SQLITE_FILE_NAME: &str = "blood_bank.db";

// ==========================================
// StoreBackend - 存储后端
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// 数据目录下每表一个 CSV 文件
    #[default]
    Csv,
    /// 数据目录下单个 SQLite 文件
    Sqlite,
    /// 仅内存（测试/演示）
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(StoreBackend::Csv),
            "sqlite" | "db" => Some(StoreBackend::Sqlite),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Csv => write!(f, "csv"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据目录
    pub data_dir: PathBuf,

    /// 存储后端
    pub backend: StoreBackend,

    /// 表格存储
    pub store: Arc<dyn RecordStore>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 库存/历史对账器
    pub reconciler: Arc<Reconciler>,

    /// 登记API
    pub registry_api: Arc<RegistryApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 旧数据导入
    pub importer: Arc<WorkbookImporter>,
}

impl AppState {
    /// 打开数据目录并初始化全部组件
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开存储并确保业务表存在
    /// 2. 加载配置
    /// 3. 加载库存与历史
    /// 4. 创建所有API实例
    pub fn open<P: AsRef<Path>>(data_dir: P, backend: StoreBackend) -> Result<Self, String> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tracing::info!("初始化AppState，数据目录: {}，后端: {}", data_dir.display(), backend);

        let store: Arc<dyn RecordStore> = match backend {
            StoreBackend::Csv => Arc::new(
                CsvRecordStore::open(&data_dir).map_err(|e| format!("无法打开CSV存储: {}", e))?,
            ),
            StoreBackend::Sqlite => {
                std::fs::create_dir_all(&data_dir)
                    .map_err(|e| format!("无法创建数据目录: {}", e))?;
                let db_path = data_dir.join(SQLITE_FILE_NAME);
                Arc::new(
                    SqliteRecordStore::open(&db_path.to_string_lossy())
                        .map_err(|e| format!("无法打开SQLite存储: {}", e))?,
                )
            }
            StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
        };

        ensure_all_tables(store.as_ref()).map_err(|e| format!("无法初始化数据表: {}", e))?;

        let config = Arc::new(
            ConfigManager::new(store.clone()).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config_reader: Arc<dyn StockConfigReader> = config.clone();

        let reconciler = Arc::new(
            Reconciler::open(store.clone(), config_reader.clone())
                .map_err(|e| format!("无法加载库存与历史: {}", e))?,
        );

        let registry_api = Arc::new(
            RegistryApi::new(store.clone(), reconciler.clone())
                .map_err(|e| format!("无法创建RegistryApi: {}", e))?,
        );
        let dashboard_api = Arc::new(
            DashboardApi::new(store.clone(), reconciler.clone(), config_reader)
                .map_err(|e| format!("无法创建DashboardApi: {}", e))?,
        );
        let importer = Arc::new(WorkbookImporter::new(store.clone()));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            data_dir,
            backend,
            store,
            config,
            reconciler,
            registry_api,
            dashboard_api,
            importer,
        })
    }

    /// 导入旧版工作簿并刷新内存状态
    pub fn import_workbook<P: AsRef<Path>>(&self, path: P) -> Result<ImportSummary, String> {
        let summary = self
            .importer
            .import_workbook(path)
            .map_err(|e| format!("导入失败: {}", e))?;
        self.reconciler
            .reload_from_store()
            .map_err(|e| format!("导入后重新加载失败: {}", e))?;
        Ok(summary)
    }

    /// 更新配置并让对账器立即生效
    pub fn update_config(&self, key: &str, value: &str) -> Result<(), String> {
        self.config
            .update_config(key, value)
            .map_err(|e| format!("配置更新失败: {}", e))?;
        self.reconciler
            .reload_config()
            .map_err(|e| format!("配置重新加载失败: {}", e))
    }
}

/// 获取默认数据目录
///
/// 优先级: 环境变量 BLOOD_BANK_DATA_DIR → 用户本地数据目录/blood-bank → ./data
pub fn get_default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("BLOOD_BANK_DATA_DIR") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::data_local_dir() {
        Some(dir) => dir.join("blood-bank"),
        None => PathBuf::from("./data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_data_dir() {
        let path = get_default_data_dir();
        assert!(!path.as_os_str().is_empty());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(StoreBackend::from_str("SQLite"), Some(StoreBackend::Sqlite));
        assert_eq!(StoreBackend::from_str(" csv "), Some(StoreBackend::Csv));
        assert_eq!(StoreBackend::from_str("xml"), None);
    }

    #[test]
    fn test_open_memory_backend() {
        let state = AppState::open("unused", StoreBackend::Memory).unwrap();
        let reg = state
            .registry_api
            .register_donor(crate::api::NewDonor {
                name: "Alice".to_string(),
                contact: "555".to_string(),
                age: 30,
                blood_type: "O-".to_string(),
                units: 3,
            })
            .unwrap();
        assert_eq!(reg.stock_level, Some(3));
    }
}

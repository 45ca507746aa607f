// ==========================================
// 血库记录系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: Config 表 (Key, Value)
// ==========================================

use crate::config::stock_settings::{
    DashboardSettings, StockConfigReader, ThresholdConfig, DEFAULT_LOW_STOCK_THRESHOLD,
};
use crate::domain::types::{BloodType, DebitPolicy};
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{CONFIG_HEADER, CONFIG_TABLE};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    store: Arc<dyn RecordStore>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - store: 表格存储（Config 表不存在时自动创建）
    pub fn new(store: Arc<dyn RecordStore>) -> Result<Self, Box<dyn Error>> {
        store.ensure_table(CONFIG_TABLE, &CONFIG_HEADER)?;
        Ok(Self { store })
    }

    /// 读取全部配置为 key → value
    fn load_map(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let data = self.store.load_all(CONFIG_TABLE)?;
        let mut map = BTreeMap::new();
        for row in data.rows {
            if let (Some(key), Some(value)) = (row.first(), row.get(1)) {
                let key = key.trim();
                if !key.is_empty() {
                    // 同名键后写覆盖先写
                    map.insert(key.to_string(), value.trim().to_string());
                }
            }
        }
        Ok(map)
    }

    /// 从 Config 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self.load_map()?.remove(key))
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 解析数值配置，格式错误时告警并使用默认值
    fn get_parsed_or_default<T: std::str::FromStr + Copy + std::fmt::Display>(
        map: &BTreeMap<String, String>,
        key: &str,
        default: T,
    ) -> T {
        match map.get(key) {
            Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值 {}", default);
                default
            }),
            None => default,
        }
    }

    /// 写入配置（存在则覆盖）
    pub fn update_config(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let updated = self.store.update_where(
            CONFIG_TABLE,
            &|row: &Row| row.first().map(|k| k.trim() == key).unwrap_or(false),
            &|row: &mut Row| {
                row.truncate(1);
                row.push(value.to_string());
            },
        )?;
        if updated == 0 {
            self.store
                .append(CONFIG_TABLE, vec![key.to_string(), value.to_string()])?;
        }

        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let map = self.load_map()?;
        Ok(serde_json::to_string(&json!(map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会整体覆盖现有配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;
        let rows: Vec<Row> = map.iter().map(|(k, v)| vec![k.clone(), v.clone()]).collect();
        let count = rows.len();
        self.store.replace_all(CONFIG_TABLE, rows)?;
        Ok(count)
    }
}

// ==========================================
// StockConfigReader Trait 实现
// ==========================================
impl StockConfigReader for ConfigManager {
    fn get_thresholds(&self) -> Result<ThresholdConfig, Box<dyn Error>> {
        let map = self.load_map()?;
        let default = Self::get_parsed_or_default(
            &map,
            config_keys::LOW_STOCK_THRESHOLD,
            DEFAULT_LOW_STOCK_THRESHOLD,
        );

        let mut config = ThresholdConfig::global(default);
        for bt in BloodType::ALL {
            let key = config_keys::threshold_key(bt);
            if map.contains_key(&key) {
                let t = Self::get_parsed_or_default(&map, &key, default);
                config.per_type.insert(bt, t);
            }
        }
        Ok(config)
    }

    fn get_debit_policy(&self) -> Result<DebitPolicy, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEBIT_POLICY, "STRICT")?;
        Ok(DebitPolicy::from_str(&value).unwrap_or_else(|| {
            tracing::warn!(config_key = config_keys::DEBIT_POLICY, raw_value = %value, "出库策略未知，使用 STRICT");
            DebitPolicy::Strict
        }))
    }

    fn get_dashboard_settings(&self) -> Result<DashboardSettings, Box<dyn Error>> {
        let map = self.load_map()?;
        let d = DashboardSettings::default();
        Ok(DashboardSettings {
            refresh_interval_secs: Self::get_parsed_or_default(
                &map,
                config_keys::REFRESH_INTERVAL_SECS,
                d.refresh_interval_secs,
            )
            .max(1),
            trend_buffer_len: Self::get_parsed_or_default(&map, config_keys::TREND_BUFFER_LEN, d.trend_buffer_len)
                .max(1),
            trend_window_days: Self::get_parsed_or_default(&map, config_keys::TREND_WINDOW_DAYS, d.trend_window_days),
            bar_max_length: Self::get_parsed_or_default(&map, config_keys::BAR_MAX_LENGTH, d.bar_max_length),
            bar_scale_units: Self::get_parsed_or_default(&map, config_keys::BAR_SCALE_UNITS, d.bar_scale_units)
                .max(1),
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::types::BloodType;

    // 库存
    pub const LOW_STOCK_THRESHOLD: &str = "stock.low_threshold";
    pub const DEBIT_POLICY: &str = "stock.debit_policy";

    // 驾驶舱
    pub const REFRESH_INTERVAL_SECS: &str = "dashboard.refresh_interval_secs";
    pub const TREND_BUFFER_LEN: &str = "dashboard.trend_buffer_len";
    pub const TREND_WINDOW_DAYS: &str = "dashboard.trend_window_days";
    pub const BAR_MAX_LENGTH: &str = "dashboard.bar_max_length";
    pub const BAR_SCALE_UNITS: &str = "dashboard.bar_scale_units";

    /// 按血型阈值键: stock.low_threshold.<BT>
    pub fn threshold_key(blood_type: BloodType) -> String {
        format!("{}.{}", LOW_STOCK_THRESHOLD, blood_type.as_str())
    }
}

// ==========================================
// 血库记录系统 - 表结构定义
// ==========================================
// 每种实体一张表,首行固定为表头
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::record_store::RecordStore;

pub const DONORS_TABLE: &str = "Donors";
pub const PATIENTS_TABLE: &str = "Patients";
pub const STOCK_TABLE: &str = "BloodStock";
pub const HISTORY_TABLE: &str = "History";
pub const CONFIG_TABLE: &str = "Config";
pub const DASHBOARD_TABLE: &str = "Dashboard";

pub const DONORS_HEADER: [&str; 7] = [
    "Donor ID",
    "Name",
    "Contact",
    "Age",
    "Blood Type",
    "Blood Units Donated",
    "Date",
];

pub const PATIENTS_HEADER: [&str; 8] = [
    "Patient ID",
    "Name",
    "Contact",
    "Age",
    "Blood Type",
    "Blood Units Needed",
    "Date",
    "Disease",
];

pub const STOCK_HEADER: [&str; 2] = ["Blood Type", "Units"];

pub const HISTORY_HEADER: [&str; 7] = ["ID", "Type", "Name", "Blood Type", "Units", "Action", "Date"];

pub const CONFIG_HEADER: [&str; 2] = ["Key", "Value"];

pub const DASHBOARD_HEADER: [&str; 3] = ["Blood Type", "Units Available", "Status"];

/// 初始化全部业务表
pub fn ensure_all_tables(store: &dyn RecordStore) -> RepositoryResult<()> {
    store.ensure_table(DONORS_TABLE, &DONORS_HEADER)?;
    store.ensure_table(PATIENTS_TABLE, &PATIENTS_HEADER)?;
    store.ensure_table(STOCK_TABLE, &STOCK_HEADER)?;
    store.ensure_table(HISTORY_TABLE, &HISTORY_HEADER)?;
    store.ensure_table(CONFIG_TABLE, &CONFIG_HEADER)?;
    Ok(())
}

// ==========================================
// 血库记录系统 - 旧数据导入器
// ==========================================
// 来源:
// - 控制台版本: 单个 .xlsx,含 Donors / Patients / BloodStock / History 工作表
// - 图形界面版本: 每表一个文件,表头写法不同
// 流程: 解析 → 列映射到标准表头 → 整表写入 RecordStore
// 说明: 历史行原样导入,损坏行在聚合时跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_parser::{ExcelSheetParser, RawSheet, UniversalSheetParser};
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{
    DONORS_HEADER, DONORS_TABLE, HISTORY_HEADER, HISTORY_TABLE, PATIENTS_HEADER, PATIENTS_TABLE,
    STOCK_HEADER, STOCK_TABLE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// 工作簿导入的表（按导入顺序）
pub const IMPORT_TABLES: [&str; 4] = [DONORS_TABLE, PATIENTS_TABLE, STOCK_TABLE, HISTORY_TABLE];

// ==========================================
// ImportSummary - 导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    /// (表名, 导入行数)
    pub tables: Vec<(String, usize)>,
    /// 工作簿中缺失而跳过的表
    pub skipped_tables: Vec<String>,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(t, _)| t == table).map(|(_, n)| *n)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

// ==========================================
// 列映射
// ==========================================
// (标准列名, 别名列表, 缺列时的默认值)
struct ColumnSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    default: &'static str,
}

const fn col(name: &'static str, aliases: &'static [&'static str], default: &'static str) -> ColumnSpec {
    ColumnSpec { name, aliases, default }
}

// 图形界面版本每位献血者/患者固定 1 单位
const DONOR_COLUMNS: [ColumnSpec; 7] = [
    col("Donor ID", &["ID"], ""),
    col("Name", &[], ""),
    col("Contact", &[], ""),
    col("Age", &[], ""),
    col("Blood Type", &["BloodType"], ""),
    col("Blood Units Donated", &["Units", "Quantity"], "1"),
    col("Date", &["Last Donation Date"], ""),
];

const PATIENT_COLUMNS: [ColumnSpec; 8] = [
    col("Patient ID", &["ID"], ""),
    col("Name", &[], ""),
    col("Contact", &[], ""),
    col("Age", &[], ""),
    col("Blood Type", &["BloodType"], ""),
    col("Blood Units Needed", &["Units", "Quantity"], "1"),
    col("Date", &[], ""),
    col("Disease", &[], ""),
];

const STOCK_COLUMNS: [ColumnSpec; 2] = [
    col("Blood Type", &["BloodType"], ""),
    col("Units", &["Quantity"], "0"),
];

const HISTORY_COLUMNS: [ColumnSpec; 7] = [
    col("ID", &[], ""),
    col("Type", &[], ""),
    col("Name", &[], ""),
    col("Blood Type", &["BloodType"], ""),
    col("Units", &["Quantity"], ""),
    col("Action", &[], ""),
    col("Date", &["DateTime"], ""),
];

fn columns_for(table: &str) -> ImportResult<&'static [ColumnSpec]> {
    match table {
        DONORS_TABLE => Ok(&DONOR_COLUMNS),
        PATIENTS_TABLE => Ok(&PATIENT_COLUMNS),
        STOCK_TABLE => Ok(&STOCK_COLUMNS),
        HISTORY_TABLE => Ok(&HISTORY_COLUMNS),
        other => Err(ImportError::UnknownTable(other.to_string())),
    }
}

fn header_for(table: &str) -> &'static [&'static str] {
    match table {
        DONORS_TABLE => &DONORS_HEADER,
        PATIENTS_TABLE => &PATIENTS_HEADER,
        STOCK_TABLE => &STOCK_HEADER,
        _ => &HISTORY_HEADER,
    }
}

/// 把原始工作表映射为标准列序的行
fn normalize(table: &str, sheet: &RawSheet) -> ImportResult<Vec<Row>> {
    let specs = columns_for(table)?;

    let sources: Vec<Option<usize>> = specs
        .iter()
        .map(|spec| {
            sheet.column_index(spec.name).or_else(|| {
                spec.aliases
                    .iter()
                    .find_map(|alias| sheet.column_index(alias))
            })
        })
        .collect();

    for (spec, source) in specs.iter().zip(&sources) {
        if source.is_none() {
            tracing::debug!(table, column = spec.name, default = spec.default, "源表缺少列，使用默认值");
        }
    }

    Ok(sheet
        .rows
        .iter()
        .map(|raw| {
            specs
                .iter()
                .zip(&sources)
                .map(|(spec, source)| match source {
                    Some(idx) => raw.get(*idx).cloned().unwrap_or_default(),
                    None => spec.default.to_string(),
                })
                .collect()
        })
        .collect())
}

// ==========================================
// WorkbookImporter - 导入器
// ==========================================
pub struct WorkbookImporter {
    store: Arc<dyn RecordStore>,
}

impl WorkbookImporter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// 导入控制台版本的单个工作簿
    ///
    /// 缺失的工作表告警后跳过; 已存在的表整表覆盖
    pub fn import_workbook<P: AsRef<Path>>(&self, path: P) -> ImportResult<ImportSummary> {
        let path = path.as_ref();
        let start = Instant::now();
        tracing::info!(path = %path.display(), "开始导入工作簿");

        let sheets = ExcelSheetParser.parse_sheets(path, &IMPORT_TABLES)?;

        let mut summary = ImportSummary::default();
        for (table, sheet) in sheets {
            match sheet {
                Some(sheet) => {
                    let count = self.write_table(&table, &sheet)?;
                    summary.tables.push((table, count));
                }
                None => {
                    tracing::warn!(table = %table, "工作簿中缺少工作表，已跳过");
                    summary.skipped_tables.push(table);
                }
            }
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            rows = summary.total_rows(),
            skipped = summary.skipped_tables.len(),
            elapsed_ms = summary.elapsed_ms,
            "工作簿导入完成"
        );
        Ok(summary)
    }

    /// 导入单个文件到指定表（.csv 或 .xlsx 第一个工作表）
    pub fn import_sheet_file<P: AsRef<Path>>(&self, path: P, table: &str) -> ImportResult<ImportSummary> {
        let path = path.as_ref();
        let start = Instant::now();
        columns_for(table)?;

        let sheet = UniversalSheetParser.parse(path)?;
        let count = self.write_table(table, &sheet)?;

        let summary = ImportSummary {
            tables: vec![(table.to_string(), count)],
            skipped_tables: Vec::new(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(path = %path.display(), table, rows = count, "单表导入完成");
        Ok(summary)
    }

    fn write_table(&self, table: &str, sheet: &RawSheet) -> ImportResult<usize> {
        let rows = normalize(table, sheet)?;
        let count = rows.len();
        self.store.ensure_table(table, header_for(table))?;
        self.store.replace_all(table, rows)?;
        Ok(count)
    }
}

// ==========================================
// 血库记录系统 - 旧数据导入模块
// ==========================================
// 职责: 读取旧版 Excel/CSV 文件并写入 RecordStore
// ==========================================

pub mod error;
pub mod sheet_parser;
pub mod workbook_importer;

pub use error::{ImportError, ImportResult};
pub use sheet_parser::{CsvSheetParser, ExcelSheetParser, RawSheet, UniversalSheetParser};
pub use workbook_importer::{ImportSummary, WorkbookImporter, IMPORT_TABLES};

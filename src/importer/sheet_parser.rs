// ==========================================
// 血库记录系统 - 工作表解析器
// ==========================================
// 支持: Excel (.xlsx) / CSV (.csv)
// 输出: 表头 + 按列序的字符串行（保留列顺序）
// ==========================================

use crate::domain::history::HISTORY_TS_FORMAT;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ==========================================
// RawSheet - 原始工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// 列名 → 列序号（忽略大小写与首尾空白）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.header.iter().position(|h| h.trim().to_lowercase() == wanted)
    }
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 完全空白的行
fn is_blank(row: &[String]) -> bool {
    row.iter().all(|v| v.is_empty())
}

// ==========================================
// CSV 解析
// ==========================================
pub struct CsvSheetParser;

impl CsvSheetParser {
    pub fn parse(&self, path: &Path) -> ImportResult<RawSheet> {
        check_exists(path)?;
        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
            if is_blank(&row) {
                continue;
            }
            rows.push(row);
        }

        Ok(RawSheet { header, rows })
    }
}

// ==========================================
// Excel 解析
// ==========================================
pub struct ExcelSheetParser;

impl ExcelSheetParser {
    fn open(&self, path: &Path) -> ImportResult<Xlsx<BufReader<File>>> {
        check_exists(path)?;
        let ext = extension_of(path);
        if ext != "xlsx" {
            return Err(ImportError::UnsupportedFormat(ext));
        }
        Ok(open_workbook(path)?)
    }

    /// 工作簿内全部工作表名
    pub fn sheet_names(&self, path: &Path) -> ImportResult<Vec<String>> {
        Ok(self.open(path)?.sheet_names().to_vec())
    }

    /// 读取指定工作表; None 表示第一个工作表
    pub fn parse_sheet(&self, path: &Path, sheet: Option<&str>) -> ImportResult<RawSheet> {
        let mut workbook = self.open(path)?;
        let names = workbook.sheet_names().to_vec();

        let sheet_name = match sheet {
            Some(wanted) => names
                .iter()
                .find(|n| n.trim().eq_ignore_ascii_case(wanted))
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound(wanted.to_string()))?,
            None => names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        Ok(range_to_sheet(&range))
    }

    /// 一次性读取多个工作表（不存在的表返回 None）
    pub fn parse_sheets(&self, path: &Path, wanted: &[&str]) -> ImportResult<Vec<(String, Option<RawSheet>)>> {
        let mut workbook = self.open(path)?;
        let names = workbook.sheet_names().to_vec();

        let mut result = Vec::with_capacity(wanted.len());
        for table in wanted {
            let found = names.iter().find(|n| n.trim().eq_ignore_ascii_case(table)).cloned();
            let sheet = match found {
                Some(name) => Some(range_to_sheet(&workbook.worksheet_range(&name)?)),
                None => None,
            };
            result.push((table.to_string(), sheet));
        }
        Ok(result)
    }
}

fn range_to_sheet(range: &Range<Data>) -> RawSheet {
    let mut rows_iter = range.rows();
    let header: Vec<String> = match rows_iter.next() {
        Some(first) => first.iter().map(cell_to_string).collect(),
        None => return RawSheet::default(),
    };

    let rows = rows_iter
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<String>>())
        .filter(|r| !is_blank(r))
        .collect();

    RawSheet { header, rows }
}

/// 单元格转字符串
///
/// - 整数值浮点数输出为整数 ("3.0" → "3")
/// - Excel 日期序列号转为历史表时间戳格式
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Excel 序列号 (1899-12-30 起算) → "YYYY-MM-DD HH:MM:SS"
fn excel_serial_to_string(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let ts = epoch.checked_add_signed(Duration::try_seconds(seconds)?)?;
    Some(ts.format(HISTORY_TS_FORMAT).to_string())
}

// ==========================================
// 通用解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalSheetParser;

impl UniversalSheetParser {
    /// 读取单文件（CSV 或 Excel 第一个工作表）
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawSheet> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvSheetParser.parse(path),
            "xlsx" => ExcelSheetParser.parse_sheet(path, None),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f
    }

    #[test]
    fn test_csv_keeps_column_order_and_skips_blank_rows() {
        let f = csv_file(&["Blood Type,Units", "A+,4", ",", "O-, 2 "]);
        let sheet = CsvSheetParser.parse(f.path()).unwrap();

        assert_eq!(sheet.header, vec!["Blood Type", "Units"]);
        assert_eq!(sheet.rows, vec![vec!["A+", "4"], vec!["O-", "2"]]);
        assert_eq!(sheet.column_index("units"), Some(1));
    }

    #[test]
    fn test_missing_file() {
        let err = UniversalSheetParser.parse("no_such_file.csv").unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let f = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = UniversalSheetParser.parse(f.path()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_excel_cell_conversion() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
        // 45292 = 2024-01-01
        assert_eq!(excel_serial_to_string(45292.5).as_deref(), Some("2024-01-01 12:00:00"));
    }

    #[test]
    fn test_excel_serial_out_of_range() {
        assert_eq!(excel_serial_to_string(1e300), None);
        assert_eq!(excel_serial_to_string(1e12), None);
        assert_eq!(excel_serial_to_string(f64::NAN), None);
        assert_eq!(excel_serial_to_string(-1.0), None);
    }
}

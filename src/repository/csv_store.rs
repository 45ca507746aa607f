// ==========================================
// 血库记录系统 - CSV 表格存储
// ==========================================
// 布局: 数据目录下每张表一个 <table>.csv, 首行为表头
// 整表替换: 先写临时文件再 rename 覆盖
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{check_header, RecordStore, Row, TableData};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct CsvRecordStore {
    data_dir: PathBuf,
    // 进程内写入串行化
    write_lock: Mutex<()>,
}

impl CsvRecordStore {
    /// 打开数据目录（不存在则创建）
    pub fn open<P: AsRef<Path>>(data_dir: P) -> RepositoryResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        tracing::debug!("CSV 存储目录: {}", data_dir.display());
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", table))
    }

    fn read_table(&self, table: &str) -> RepositoryResult<TableData> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }

        let file = File::open(&path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(TableData { header, rows })
    }

    fn write_table(&self, table: &str, data: &TableData) -> RepositoryResult<()> {
        let path = self.table_path(table);
        let tmp_path = self.data_dir.join(format!("{}.csv.tmp", table));

        {
            let mut writer = WriterBuilder::new().flexible(true).from_path(&tmp_path)?;
            writer.write_record(&data.header)?;
            for row in &data.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

impl RecordStore for CsvRecordStore {
    fn ensure_table(&self, table: &str, header: &[&str]) -> RepositoryResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        match self.read_table(table) {
            Ok(existing) => check_header(table, header, &existing.header),
            Err(RepositoryError::TableNotFound(_)) => {
                tracing::info!("创建数据表: {}", self.table_path(table).display());
                self.write_table(table, &TableData::new(header))
            }
            Err(e) => Err(e),
        }
    }

    fn load_all(&self, table: &str) -> RepositoryResult<TableData> {
        self.read_table(table)
    }

    fn append(&self, table: &str, row: Row) -> RepositoryResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let path = self.table_path(table);
        if !path.exists() {
            return Err(RepositoryError::TableNotFound(table.to_string()));
        }

        let file = OpenOptions::new().append(true).open(&path)?;
        let mut writer = WriterBuilder::new().flexible(true).from_writer(file);
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    }

    fn replace_all(&self, table: &str, rows: Vec<Row>) -> RepositoryResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let header = self.read_table(table)?.header;
        self.write_table(table, &TableData { header, rows })
    }

    fn backend_name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_csv_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = CsvRecordStore::open(dir.path()).unwrap();
            store.ensure_table("History", &["ID", "Name"]).unwrap();
            store.append("History", row(&["1", "Alice, Jr."])).unwrap();
            store.append("History", row(&["2", "Bob"])).unwrap();
        }

        let store = CsvRecordStore::open(dir.path()).unwrap();
        store.ensure_table("History", &["ID", "Name"]).unwrap();
        let data = store.load_all("History").unwrap();
        assert_eq!(data.rows, vec![row(&["1", "Alice, Jr."]), row(&["2", "Bob"])]);
    }

    #[test]
    fn test_csv_store_replace_all_keeps_header() {
        let dir = TempDir::new().unwrap();
        let store = CsvRecordStore::open(dir.path()).unwrap();
        store.ensure_table("BloodStock", &["Blood Type", "Units"]).unwrap();
        store.append("BloodStock", row(&["A+", "1"])).unwrap();

        store
            .replace_all("BloodStock", vec![row(&["A+", "4"]), row(&["O-", "2"])])
            .unwrap();

        let data = store.load_all("BloodStock").unwrap();
        assert_eq!(data.header, vec!["Blood Type", "Units"]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0], row(&["A+", "4"]));
        assert!(!dir.path().join("BloodStock.csv.tmp").exists());
    }

    #[test]
    fn test_csv_store_append_to_missing_table_fails() {
        let dir = TempDir::new().unwrap();
        let store = CsvRecordStore::open(dir.path()).unwrap();
        let result = store.append("Donors", row(&["1"]));
        assert!(matches!(result, Err(RepositoryError::TableNotFound(_))));
    }
}

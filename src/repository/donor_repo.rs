// ==========================================
// 血库记录系统 - 献血者数据仓储
// ==========================================
// 对齐: Donors 表
// ==========================================

use crate::domain::records::DonorRecord;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{DONORS_HEADER, DONORS_TABLE};
use std::sync::Arc;

pub struct DonorRepository {
    store: Arc<dyn RecordStore>,
}

impl DonorRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> RepositoryResult<Self> {
        store.ensure_table(DONORS_TABLE, &DONORS_HEADER)?;
        Ok(Self { store })
    }

    /// 查询全部献血者（无法解析的行跳过并告警）
    pub fn list(&self) -> RepositoryResult<Vec<DonorRecord>> {
        let data = self.store.load_all(DONORS_TABLE)?;
        Ok(parse_rows(&data.rows))
    }

    /// 记录行数（含无法解析的行）
    pub fn count(&self) -> RepositoryResult<usize> {
        Ok(self.store.load_all(DONORS_TABLE)?.len())
    }

    /// 下一个编号 = 现有最大数字编号 + 1
    pub fn next_id(&self) -> RepositoryResult<u32> {
        let data = self.store.load_all(DONORS_TABLE)?;
        Ok(super::max_numeric_id(&data.rows) + 1)
    }

    pub fn insert(&self, record: &DonorRecord) -> RepositoryResult<()> {
        self.store.append(DONORS_TABLE, record.to_row())
    }

    /// 模糊查询: 任一列包含关键字（不区分大小写）
    pub fn search(&self, query: &str) -> RepositoryResult<Vec<DonorRecord>> {
        let data = self.store.load_all(DONORS_TABLE)?;
        let hits: Vec<Row> = data
            .rows
            .into_iter()
            .filter(|row| super::row_matches(row, query))
            .collect();
        Ok(parse_rows(&hits))
    }

    /// 更新姓名/联系方式/年龄
    ///
    /// # 返回
    /// - Ok(true): 找到并更新
    /// - Ok(false): 编号不存在
    pub fn update_fields(
        &self,
        donor_id: u32,
        name: &str,
        contact: &str,
        age: u32,
    ) -> RepositoryResult<bool> {
        let id = donor_id.to_string();
        let updated = self.store.update_where(
            DONORS_TABLE,
            &|row: &Row| super::id_matches(row, &id),
            &|row: &mut Row| {
                super::set_cell(row, 1, name);
                super::set_cell(row, 2, contact);
                super::set_cell(row, 3, &age.to_string());
            },
        )?;
        Ok(updated > 0)
    }

    pub fn delete(&self, donor_id: u32) -> RepositoryResult<bool> {
        let id = donor_id.to_string();
        let removed = self
            .store
            .delete_where(DONORS_TABLE, &|row: &Row| super::id_matches(row, &id))?;
        Ok(removed > 0)
    }

    pub fn find_by_id(&self, donor_id: u32) -> RepositoryResult<Option<DonorRecord>> {
        Ok(self.list()?.into_iter().find(|d| d.donor_id == donor_id))
    }
}

fn parse_rows(rows: &[Row]) -> Vec<DonorRecord> {
    rows.iter()
        .filter_map(|row| match DonorRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Donors 表行无法解析，已跳过: {}", e);
                None
            }
        })
        .collect()
}

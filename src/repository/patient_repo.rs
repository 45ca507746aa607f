// ==========================================
// 血库记录系统 - 患者数据仓储
// ==========================================
// 对齐: Patients 表
// ==========================================

use crate::domain::records::PatientRecord;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{PATIENTS_HEADER, PATIENTS_TABLE};
use std::sync::Arc;

pub struct PatientRepository {
    store: Arc<dyn RecordStore>,
}

impl PatientRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> RepositoryResult<Self> {
        store.ensure_table(PATIENTS_TABLE, &PATIENTS_HEADER)?;
        Ok(Self { store })
    }

    pub fn list(&self) -> RepositoryResult<Vec<PatientRecord>> {
        let data = self.store.load_all(PATIENTS_TABLE)?;
        Ok(parse_rows(&data.rows))
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        Ok(self.store.load_all(PATIENTS_TABLE)?.len())
    }

    pub fn next_id(&self) -> RepositoryResult<u32> {
        let data = self.store.load_all(PATIENTS_TABLE)?;
        Ok(super::max_numeric_id(&data.rows) + 1)
    }

    pub fn insert(&self, record: &PatientRecord) -> RepositoryResult<()> {
        self.store.append(PATIENTS_TABLE, record.to_row())
    }

    pub fn search(&self, query: &str) -> RepositoryResult<Vec<PatientRecord>> {
        let data = self.store.load_all(PATIENTS_TABLE)?;
        let hits: Vec<Row> = data
            .rows
            .into_iter()
            .filter(|row| super::row_matches(row, query))
            .collect();
        Ok(parse_rows(&hits))
    }

    pub fn update_fields(
        &self,
        patient_id: u32,
        name: &str,
        contact: &str,
        age: u32,
    ) -> RepositoryResult<bool> {
        let id = patient_id.to_string();
        let updated = self.store.update_where(
            PATIENTS_TABLE,
            &|row: &Row| super::id_matches(row, &id),
            &|row: &mut Row| {
                super::set_cell(row, 1, name);
                super::set_cell(row, 2, contact);
                super::set_cell(row, 3, &age.to_string());
            },
        )?;
        Ok(updated > 0)
    }

    pub fn delete(&self, patient_id: u32) -> RepositoryResult<bool> {
        let id = patient_id.to_string();
        let removed = self
            .store
            .delete_where(PATIENTS_TABLE, &|row: &Row| super::id_matches(row, &id))?;
        Ok(removed > 0)
    }

    pub fn find_by_id(&self, patient_id: u32) -> RepositoryResult<Option<PatientRecord>> {
        Ok(self.list()?.into_iter().find(|p| p.patient_id == patient_id))
    }
}

fn parse_rows(rows: &[Row]) -> Vec<PatientRecord> {
    rows.iter()
        .filter_map(|row| match PatientRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Patients 表行无法解析，已跳过: {}", e);
                None
            }
        })
        .collect()
}

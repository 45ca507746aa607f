// ==========================================
// 血库记录系统 - 献血者/患者登记记录
// ==========================================
// 对齐: Donors 表 / Patients 表
// 说明: 核心只关心登记时产生的 (blood_type, units)
// ==========================================

use crate::domain::history::MalformedField;
use crate::domain::types::BloodType;
use serde::{Deserialize, Serialize};

/// 患者不需要输血时血型列的占位值
pub const NO_BLOOD_TYPE: &str = "N/A";

// ==========================================
// DonorRecord - 献血者
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub donor_id: u32,
    pub name: String,
    pub contact: String,
    pub age: u32,
    pub blood_type: BloodType,
    pub units_donated: u32,
    pub date: String,
}

impl DonorRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.donor_id.to_string(),
            self.name.clone(),
            self.contact.clone(),
            self.age.to_string(),
            self.blood_type.as_str().to_string(),
            self.units_donated.to_string(),
            self.date.clone(),
        ]
    }

    pub fn from_row(row: &[String]) -> Result<Self, MalformedField> {
        Ok(Self {
            donor_id: parse_id(row, 0, "Donor ID")?,
            name: cell(row, 1),
            contact: cell(row, 2),
            age: parse_u32_or_zero(&cell(row, 3)),
            blood_type: BloodType::parse(&cell(row, 4)).ok_or_else(|| MalformedField {
                field: "Blood Type",
                value: cell(row, 4),
            })?,
            units_donated: parse_u32_or_zero(&cell(row, 5)),
            date: cell(row, 6),
        })
    }
}

// ==========================================
// PatientRecord - 患者
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: u32,
    pub name: String,
    pub contact: String,
    pub age: u32,
    pub blood_type: Option<BloodType>, // None = 不需要输血 ("N/A")
    pub units_needed: u32,
    pub date: String,
    pub disease: Option<String>,
}

impl PatientRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            self.name.clone(),
            self.contact.clone(),
            self.age.to_string(),
            self.blood_type
                .map(|bt| bt.as_str().to_string())
                .unwrap_or_else(|| NO_BLOOD_TYPE.to_string()),
            self.units_needed.to_string(),
            self.date.clone(),
            self.disease.clone().unwrap_or_default(),
        ]
    }

    pub fn from_row(row: &[String]) -> Result<Self, MalformedField> {
        let raw_bt = cell(row, 4);
        let blood_type = if raw_bt.trim().is_empty() || raw_bt.trim() == NO_BLOOD_TYPE {
            None
        } else {
            Some(BloodType::parse(&raw_bt).ok_or(MalformedField {
                field: "Blood Type",
                value: raw_bt.clone(),
            })?)
        };
        let disease = cell(row, 7);

        Ok(Self {
            patient_id: parse_id(row, 0, "Patient ID")?,
            name: cell(row, 1),
            contact: cell(row, 2),
            age: parse_u32_or_zero(&cell(row, 3)),
            blood_type,
            units_needed: parse_u32_or_zero(&cell(row, 5)),
            date: cell(row, 6),
            disease: if disease.is_empty() { None } else { Some(disease) },
        })
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn parse_id(row: &[String], idx: usize, field: &'static str) -> Result<u32, MalformedField> {
    let raw = cell(row, idx);
    crate::domain::history::parse_unit_cell(&raw).ok_or(MalformedField { field, value: raw })
}

fn parse_u32_or_zero(raw: &str) -> u32 {
    crate::domain::history::parse_unit_cell(raw).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_patient_without_need_uses_placeholder() {
        let p = PatientRecord {
            patient_id: 3,
            name: "Carol".to_string(),
            contact: "555".to_string(),
            age: 40,
            blood_type: None,
            units_needed: 0,
            date: "2024-01-01 10:00:00".to_string(),
            disease: None,
        };
        let row = p.to_row();
        assert_eq!(row[4], NO_BLOOD_TYPE);
        assert_eq!(PatientRecord::from_row(&row).unwrap(), p);
    }

    #[test]
    fn test_donor_from_excel_row_with_float_cells() {
        let d = DonorRecord::from_row(&strings(&["1.0", "Dan", "x", "30", "b-", "2", "2024-01-01"]))
            .unwrap();
        assert_eq!(d.donor_id, 1);
        assert_eq!(d.blood_type, BloodType::BNeg);
    }

    #[test]
    fn test_donor_rejects_missing_id() {
        let err = DonorRecord::from_row(&strings(&["", "Dan"])).unwrap_err();
        assert_eq!(err.field, "Donor ID");
    }
}

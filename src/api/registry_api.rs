// ==========================================
// 血库记录系统 - 登记 API
// ==========================================
// 职责: 献血者/患者登记、查询、修改、删除
// 流程: 登记 → Reconciler 记录库存与历史 → 写入登记表
// 说明: 修改/删除只影响登记表,不回写库存与历史
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::history::HISTORY_TS_FORMAT;
use crate::domain::records::{DonorRecord, PatientRecord};
use crate::domain::types::BloodType;
use crate::engine::reconciler::{validate_units, Reconciler};
use crate::repository::donor_repo::DonorRepository;
use crate::repository::patient_repo::PatientRepository;
use crate::repository::record_store::RecordStore;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 请求/响应类型
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDonor {
    pub name: String,
    pub contact: String,
    pub age: u32,
    pub blood_type: String,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodNeed {
    pub blood_type: String,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub contact: String,
    pub age: u32,
    /// None = 不需要输血
    pub need: Option<BloodNeed>,
    pub disease: Option<String>,
}

/// 登记结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: u32,
    pub blood_type: Option<BloodType>,
    /// 登记后该血型库存（未涉及库存时为 None）
    pub stock_level: Option<u32>,
}

// ==========================================
// RegistryApi - 登记 API
// ==========================================
pub struct RegistryApi {
    reconciler: Arc<Reconciler>,
    donors: DonorRepository,
    patients: PatientRepository,
    // 编号分配与写表串行化
    registration_lock: Mutex<()>,
}

impl RegistryApi {
    pub fn new(store: Arc<dyn RecordStore>, reconciler: Arc<Reconciler>) -> ApiResult<Self> {
        Ok(Self {
            reconciler,
            donors: DonorRepository::new(store.clone())?,
            patients: PatientRepository::new(store)?,
            registration_lock: Mutex::new(()),
        })
    }

    fn now_string() -> String {
        Local::now().naive_local().format(HISTORY_TS_FORMAT).to_string()
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, ()>> {
        self.registration_lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("登记锁获取失败: {}", e)))
    }

    // ==========================================
    // 登记
    // ==========================================

    /// 登记献血者并入库
    ///
    /// 先写献血者表再入库,入库失败时撤回该行
    ///
    /// # 错误
    /// - InvalidInput: 姓名为空
    /// - InvalidBloodType / InvalidUnits: 校验失败,不写任何表
    pub fn register_donor(&self, req: NewDonor) -> ApiResult<Registration> {
        let name = require_name(&req.name)?;
        let blood_type = parse_blood_type(&req.blood_type)?;
        let units = validate_units(req.units)?;
        let _guard = self.lock()?;

        let donor_id = self.donors.next_id()?;
        let record = DonorRecord {
            donor_id,
            name: name.to_string(),
            contact: req.contact.trim().to_string(),
            age: req.age,
            blood_type,
            units_donated: units,
            date: Self::now_string(),
        };
        self.donors.insert(&record)?;

        let level = match self
            .reconciler
            .record_donation_for(donor_id, blood_type.as_str(), req.units, name)
        {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(donor_id, error = %e, "入库失败，撤回献血者记录");
                if let Err(undo) = self.donors.delete(donor_id) {
                    tracing::error!(donor_id, error = %undo, "献血者记录撤回失败");
                }
                return Err(e.into());
            }
        };

        tracing::info!(donor_id, blood_type = %blood_type, stock_level = level, "献血者登记完成");
        Ok(Registration {
            id: donor_id,
            blood_type: Some(blood_type),
            stock_level: Some(level),
        })
    }

    /// 登记患者
    ///
    /// - 有用血需求: 先写患者表再出库,Strict 策略下库存不足时撤回该行
    /// - 无用血需求: 只写患者表,血型记为 N/A
    pub fn register_patient(&self, req: NewPatient) -> ApiResult<Registration> {
        let name = require_name(&req.name)?;
        let need = match &req.need {
            Some(need) => Some((
                parse_blood_type(&need.blood_type)?,
                validate_units(need.units)?,
                need.units,
            )),
            None => None,
        };
        let _guard = self.lock()?;

        let patient_id = self.patients.next_id()?;
        let record = PatientRecord {
            patient_id,
            name: name.to_string(),
            contact: req.contact.trim().to_string(),
            age: req.age,
            blood_type: need.map(|(bt, _, _)| bt),
            units_needed: need.map_or(0, |(_, units, _)| units),
            date: Self::now_string(),
            disease: req
                .disease
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        };
        self.patients.insert(&record)?;

        let level = match need {
            Some((bt, _, requested)) => {
                match self
                    .reconciler
                    .record_need_for(patient_id, bt.as_str(), requested, name)
                {
                    Ok(level) => Some(level),
                    Err(e) => {
                        tracing::warn!(patient_id, error = %e, "出库失败，撤回患者记录");
                        if let Err(undo) = self.patients.delete(patient_id) {
                            tracing::error!(patient_id, error = %undo, "患者记录撤回失败");
                        }
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        tracing::info!(patient_id, needs_blood = need.is_some(), "患者登记完成");
        Ok(Registration {
            id: patient_id,
            blood_type: record.blood_type,
            stock_level: level,
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn list_donors(&self) -> ApiResult<Vec<DonorRecord>> {
        Ok(self.donors.list()?)
    }

    pub fn list_patients(&self) -> ApiResult<Vec<PatientRecord>> {
        Ok(self.patients.list()?)
    }

    pub fn search_donors(&self, query: &str) -> ApiResult<Vec<DonorRecord>> {
        if query.trim().is_empty() {
            return self.list_donors();
        }
        Ok(self.donors.search(query)?)
    }

    pub fn search_patients(&self, query: &str) -> ApiResult<Vec<PatientRecord>> {
        if query.trim().is_empty() {
            return self.list_patients();
        }
        Ok(self.patients.search(query)?)
    }

    pub fn count_donors(&self) -> ApiResult<usize> {
        Ok(self.donors.count()?)
    }

    pub fn count_patients(&self) -> ApiResult<usize> {
        Ok(self.patients.count()?)
    }

    // ==========================================
    // 修改 / 删除
    // ==========================================

    /// 修改献血者姓名/联系方式/年龄（空白字段保留原值）
    pub fn update_donor(&self, donor_id: u32, name: &str, contact: &str, age: &str) -> ApiResult<DonorRecord> {
        let _guard = self.lock()?;
        let current = self
            .donors
            .find_by_id(donor_id)?
            .ok_or_else(|| ApiError::NotFound(format!("献血者(id={})不存在", donor_id)))?;

        let name = keep_or(name, &current.name);
        let contact = keep_or(contact, &current.contact);
        let age = parse_age_or(age, current.age)?;

        self.donors.update_fields(donor_id, &name, &contact, age)?;
        tracing::info!(donor_id, "献血者信息已更新");

        Ok(DonorRecord {
            name,
            contact,
            age,
            ..current
        })
    }

    /// 修改患者姓名/联系方式/年龄（空白字段保留原值）
    pub fn update_patient(
        &self,
        patient_id: u32,
        name: &str,
        contact: &str,
        age: &str,
    ) -> ApiResult<PatientRecord> {
        let _guard = self.lock()?;
        let current = self
            .patients
            .find_by_id(patient_id)?
            .ok_or_else(|| ApiError::NotFound(format!("患者(id={})不存在", patient_id)))?;

        let name = keep_or(name, &current.name);
        let contact = keep_or(contact, &current.contact);
        let age = parse_age_or(age, current.age)?;

        self.patients.update_fields(patient_id, &name, &contact, age)?;
        tracing::info!(patient_id, "患者信息已更新");

        Ok(PatientRecord {
            name,
            contact,
            age,
            ..current
        })
    }

    /// 删除献血者登记（库存与历史不变）
    pub fn delete_donor(&self, donor_id: u32) -> ApiResult<()> {
        let _guard = self.lock()?;
        if !self.donors.delete(donor_id)? {
            return Err(ApiError::NotFound(format!("献血者(id={})不存在", donor_id)));
        }
        tracing::info!(donor_id, "献血者登记已删除");
        Ok(())
    }

    /// 删除患者登记（库存与历史不变）
    pub fn delete_patient(&self, patient_id: u32) -> ApiResult<()> {
        let _guard = self.lock()?;
        if !self.patients.delete(patient_id)? {
            return Err(ApiError::NotFound(format!("患者(id={})不存在", patient_id)));
        }
        tracing::info!(patient_id, "患者登记已删除");
        Ok(())
    }
}

// ==========================================
// 输入解析
// ==========================================

/// 解析数量输入（非数字 → InvalidUnits; 正负由 Reconciler 校验）
pub fn parse_units(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::InvalidUnits(raw.trim().to_string()))
}

/// 解析年龄输入
pub fn parse_age(raw: &str) -> ApiResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ApiError::InvalidInput(format!("年龄必须为非负整数: '{}'", raw.trim())))
}

fn parse_age_or(raw: &str, current: u32) -> ApiResult<u32> {
    if raw.trim().is_empty() {
        Ok(current)
    } else {
        parse_age(raw)
    }
}

fn keep_or(input: &str, current: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        current.to_string()
    } else {
        trimmed.to_string()
    }
}

fn parse_blood_type(raw: &str) -> ApiResult<BloodType> {
    BloodType::parse(raw).ok_or_else(|| ApiError::InvalidBloodType(raw.to_string()))
}

fn require_name(name: &str) -> ApiResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ApiError::InvalidInput("姓名不能为空".to_string()))
    } else {
        Ok(trimmed)
    }
}

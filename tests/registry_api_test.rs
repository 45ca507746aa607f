// ==========================================
// RegistryApi 集成测试
// ==========================================
// 测试范围:
// 1. 献血者/患者登记与库存联动
// 2. 库存不足时不写患者表
// 3. 查询、修改、删除
// 4. 写表失败时登记整体撤回
// ==========================================


use blood_bank::api::{parse_age, parse_units, ApiError, BloodNeed, NewDonor, NewPatient};
use blood_bank::app::StoreBackend;
use blood_bank::api::RegistryApi;
use blood_bank::config::ConfigManager;
use blood_bank::domain::{BloodType, HistoryAction};
use blood_bank::engine::Reconciler;
use blood_bank::repository::schema::{ensure_all_tables, DONORS_TABLE, HISTORY_TABLE, PATIENTS_TABLE};
use blood_bank::repository::{
    MemoryRecordStore, RecordStore, RepositoryError, RepositoryResult, Row, TableData,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use test_helpers::*;

/// 可注入单表追加失败的存储
struct FailingTableStore {
    inner: MemoryRecordStore,
    table: &'static str,
    failing: AtomicBool,
}

impl RecordStore for FailingTableStore {
    fn ensure_table(&self, table: &str, header: &[&str]) -> RepositoryResult<()> {
        self.inner.ensure_table(table, header)
    }
    fn load_all(&self, table: &str) -> RepositoryResult<TableData> {
        self.inner.load_all(table)
    }
    fn append(&self, table: &str, row: Row) -> RepositoryResult<()> {
        if table == self.table && self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::StorageUnavailable("disk full".to_string()));
        }
        self.inner.append(table, row)
    }
    fn replace_all(&self, table: &str, rows: Vec<Row>) -> RepositoryResult<()> {
        self.inner.replace_all(table, rows)
    }
    fn backend_name(&self) -> &'static str {
        "failing-table"
    }
}

fn failing_registry(table: &'static str) -> (Arc<FailingTableStore>, Arc<Reconciler>, RegistryApi) {
    blood_bank::logging::init_test();
    let store = Arc::new(FailingTableStore {
        inner: MemoryRecordStore::new(),
        table,
        failing: AtomicBool::new(true),
    });
    ensure_all_tables(&*store).unwrap();
    let config = Arc::new(ConfigManager::new(store.clone()).unwrap());
    let reconciler = Arc::new(Reconciler::open(store.clone(), config).unwrap());
    let api = RegistryApi::new(store.clone(), reconciler.clone()).unwrap();
    (store, reconciler, api)
}

fn donor(name: &str, blood_type: &str, units: i64) -> NewDonor {
    NewDonor {
        name: name.to_string(),
        contact: "555-0100".to_string(),
        age: 30,
        blood_type: blood_type.to_string(),
        units,
    }
}

fn patient(name: &str, need: Option<(&str, i64)>) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        contact: "555-0200".to_string(),
        age: 45,
        need: need.map(|(bt, units)| BloodNeed {
            blood_type: bt.to_string(),
            units,
        }),
        disease: Some("Anemia".to_string()),
    }
}

// ==========================================
// 登记
// ==========================================

#[test]
fn test_登记献血者() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;

    let first = api.register_donor(donor("Alice", "O-", 3)).expect("登记失败");
    assert_eq!(first.id, 1);
    assert_eq!(first.blood_type, Some(BloodType::ONeg));
    assert_eq!(first.stock_level, Some(3));

    let second = api.register_donor(donor("Bob", "o-", 2)).expect("登记失败");
    assert_eq!(second.id, 2);
    assert_eq!(second.stock_level, Some(5));

    let donors = api.list_donors().unwrap();
    assert_eq!(donors.len(), 2);
    assert_eq!(donors[1].blood_type, BloodType::ONeg);
    assert_eq!(donors[1].units_donated, 2);

    let snap = env.state.reconciler.snapshot().unwrap();
    let last = snap.records.last().unwrap().parse().unwrap();
    assert_eq!(last.actor_id, Some(2));
    assert_eq!(last.actor_name, "Bob");
}

#[test]
fn test_登记献血者校验失败不写任何表() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;

    assert!(matches!(
        api.register_donor(donor("X", "Q+", 1)),
        Err(ApiError::InvalidBloodType(_))
    ));
    assert!(matches!(
        api.register_donor(donor("X", "A+", 0)),
        Err(ApiError::InvalidUnits(_))
    ));
    assert!(matches!(
        api.register_donor(donor("   ", "A+", 1)),
        Err(ApiError::InvalidInput(_))
    ));

    assert_eq!(api.count_donors().unwrap(), 0);
    assert_eq!(env.state.reconciler.history_len().unwrap(), 0);
}

#[test]
fn test_患者用血库存不足不登记() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    api.register_donor(donor("Alice", "A+", 2)).unwrap();

    let err = api.register_patient(patient("Bob", Some(("A+", 5)))).unwrap_err();
    assert!(matches!(
        err,
        ApiError::InsufficientStock {
            available: 2,
            requested: 5,
            ..
        }
    ));

    assert_eq!(api.count_patients().unwrap(), 0);
    assert_eq!(env.state.reconciler.level(BloodType::APos).unwrap(), 2);
    assert_eq!(env.state.reconciler.history_len().unwrap(), 1);
}

#[test]
fn test_患者用血扣减库存() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    api.register_donor(donor("Alice", "B-", 6)).unwrap();

    let reg = api.register_patient(patient("Carl", Some(("B-", 4)))).unwrap();
    assert_eq!(reg.stock_level, Some(2));

    let patients = api.list_patients().unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].blood_type, Some(BloodType::BNeg));
    assert_eq!(patients[0].units_needed, 4);
    assert_eq!(patients[0].disease.as_deref(), Some("Anemia"));

    let snap = env.state.reconciler.snapshot().unwrap();
    let last = snap.records.last().unwrap().parse().unwrap();
    assert_eq!(last.action, HistoryAction::Needed);
}

#[test]
fn test_患者无需输血() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;

    let reg = api.register_patient(patient("Dana", None)).unwrap();
    assert_eq!(reg.blood_type, None);
    assert_eq!(reg.stock_level, None);

    let patients = api.list_patients().unwrap();
    assert_eq!(patients[0].blood_type, None);
    assert_eq!(patients[0].units_needed, 0);
    assert_eq!(env.state.reconciler.history_len().unwrap(), 0, "无用血需求不写历史");
}

// ==========================================
// 查询 / 修改 / 删除
// ==========================================

#[test]
fn test_搜索() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    api.register_donor(donor("Alice Wong", "A+", 1)).unwrap();
    api.register_donor(donor("Bob Lee", "AB-", 1)).unwrap();

    assert_eq!(api.search_donors("alice").unwrap().len(), 1);
    assert_eq!(api.search_donors("ab-").unwrap().len(), 1);
    assert_eq!(api.search_donors("").unwrap().len(), 2, "空关键字返回全部");
    assert!(api.search_donors("zzz").unwrap().is_empty());
}

#[test]
fn test_修改空白字段保留原值() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    let reg = api.register_donor(donor("Alice", "A+", 1)).unwrap();

    let updated = api.update_donor(reg.id, "", "555-9999", "  ").unwrap();
    assert_eq!(updated.name, "Alice");
    assert_eq!(updated.contact, "555-9999");
    assert_eq!(updated.age, 30);

    let stored = api.search_donors("555-9999").unwrap();
    assert_eq!(stored.len(), 1);

    assert!(matches!(
        api.update_donor(reg.id, "", "", "abc"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.update_donor(99, "X", "", ""),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_修改患者() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    let reg = api.register_patient(patient("Eve", None)).unwrap();

    let updated = api.update_patient(reg.id, "Eve Adams", "", "50").unwrap();
    assert_eq!(updated.name, "Eve Adams");
    assert_eq!(updated.contact, "555-0200");
    assert_eq!(updated.age, 50);
}

#[test]
fn test_删除不影响库存与历史() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let api = &env.state.registry_api;
    let d = api.register_donor(donor("Alice", "O+", 8)).unwrap();
    let p = api.register_patient(patient("Bob", Some(("O+", 3)))).unwrap();

    api.delete_donor(d.id).unwrap();
    api.delete_patient(p.id).unwrap();

    assert_eq!(api.count_donors().unwrap(), 0);
    assert_eq!(api.count_patients().unwrap(), 0);
    assert_eq!(env.state.reconciler.level(BloodType::OPos).unwrap(), 5);
    assert_eq!(env.state.reconciler.history_len().unwrap(), 2);

    assert!(matches!(api.delete_donor(d.id), Err(ApiError::NotFound(_))));
    assert!(matches!(api.delete_patient(p.id), Err(ApiError::NotFound(_))));
}

#[test]
fn test_sqlite_登记后重新打开() {
    let env = create_test_env(StoreBackend::Sqlite).expect("无法创建测试环境");
    env.state.registry_api.register_donor(donor("Alice", "AB+", 4)).unwrap();
    env.state
        .registry_api
        .register_patient(patient("Bob", Some(("AB+", 1))))
        .unwrap();

    let reopened = reopen(&env).expect("重新打开失败");
    assert_eq!(reopened.registry_api.count_donors().unwrap(), 1);
    assert_eq!(reopened.registry_api.count_patients().unwrap(), 1);
    assert_eq!(reopened.reconciler.level(BloodType::AbPos).unwrap(), 3);

    // 编号在重新打开后继续递增
    let next = reopened.registry_api.register_donor(donor("Cid", "A-", 1)).unwrap();
    assert_eq!(next.id, 2);
}

// ==========================================
// 输入解析
// ==========================================

#[test]
fn test_输入解析() {
    assert_eq!(parse_units(" 12 ").unwrap(), 12);
    assert_eq!(parse_units("-3").unwrap(), -3);
    assert!(matches!(parse_units("3.5"), Err(ApiError::InvalidUnits(_))));
    assert!(matches!(parse_units("abc"), Err(ApiError::InvalidUnits(_))));

    assert_eq!(parse_age("40").unwrap(), 40);
    assert!(parse_age("-1").is_err());
}

// ==========================================
// 写表失败
// ==========================================

#[test]
fn test_献血者表写入失败时不入库() {
    let (store, reconciler, api) = failing_registry(DONORS_TABLE);

    assert!(matches!(
        api.register_donor(donor("Alice", "O-", 3)),
        Err(ApiError::StorageUnavailable(_))
    ));
    assert_eq!(reconciler.level(BloodType::ONeg).unwrap(), 0);
    assert_eq!(reconciler.history_len().unwrap(), 0);

    // 恢复后编号不与失败的登记重复,历史中只有一条记录
    store.failing.store(false, Ordering::SeqCst);
    let reg = api.register_donor(donor("Bob", "O-", 2)).unwrap();
    assert_eq!(reg.id, 1);
    assert_eq!(reconciler.level(BloodType::ONeg).unwrap(), 2);

    let snap = reconciler.snapshot().unwrap();
    assert_eq!(snap.records.len(), 1);
    let event = snap.records[0].parse().unwrap();
    assert_eq!(event.actor_id, Some(1));
    assert_eq!(event.actor_name, "Bob");
}

#[test]
fn test_历史写入失败时撤回献血者记录() {
    let (store, reconciler, api) = failing_registry(HISTORY_TABLE);

    assert!(api.register_donor(donor("Alice", "A+", 4)).is_err());
    assert_eq!(api.count_donors().unwrap(), 0, "登记失败不应留下献血者记录");
    assert_eq!(reconciler.level(BloodType::APos).unwrap(), 0);

    store.failing.store(false, Ordering::SeqCst);
    assert_eq!(api.register_donor(donor("Alice", "A+", 4)).unwrap().id, 1);
    assert_eq!(api.count_donors().unwrap(), 1);
}

#[test]
fn test_患者表写入失败时不出库() {
    let (store, reconciler, api) = failing_registry(PATIENTS_TABLE);
    reconciler.record_donation("B+", 5, "Donor").unwrap();

    assert!(api.register_patient(patient("Cy", Some(("B+", 2)))).is_err());
    assert_eq!(reconciler.level(BloodType::BPos).unwrap(), 5);
    assert_eq!(reconciler.history_len().unwrap(), 1);

    store.failing.store(false, Ordering::SeqCst);
    let reg = api.register_patient(patient("Cy", Some(("B+", 2)))).unwrap();
    assert_eq!(reg.id, 1);
    assert_eq!(reg.stock_level, Some(3));
}

// ==========================================
// Reconciler 集成测试
// ==========================================
// 测试范围:
// 1. 献血/用血与历史成对记录
// 2. Strict / Clamp 出库策略
// 3. 校验失败不产生任何写入
// 4. 持久化后重新加载
// 5. 并发读者只看到成对状态
// ==========================================


use blood_bank::config::config_keys;
use blood_bank::domain::{BloodType, HistoryAction, StockStatus};
use blood_bank::engine::LedgerError;
use blood_bank::repository::schema::HISTORY_TABLE;
use std::sync::Arc;
use test_helpers::*;

// ==========================================
// 基本场景
// ==========================================

#[test]
fn test_空账本献血() {
    let (_store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");

    let level = r.record_donation("O-", 3, "Alice").expect("献血失败");
    assert_eq!(level, 3);

    let snap = r.snapshot().expect("快照失败");
    assert_eq!(snap.level(BloodType::ONeg), 3);
    assert_eq!(snap.records.len(), 1);

    let event = snap.records[0].parse().expect("历史行应可解析");
    assert_eq!(event.action, HistoryAction::Donated);
    assert_eq!(event.blood_type, BloodType::ONeg);
    assert_eq!(event.units, 3);
    assert_eq!(event.actor_name, "Alice");
}

#[test]
fn test_strict_库存不足拒绝出库() {
    let (_store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");
    r.record_donation("A+", 2, "Donor").expect("献血失败");

    let err = r.record_need("A+", 5, "Bob").unwrap_err();
    match err {
        LedgerError::InsufficientStock {
            blood_type,
            available,
            requested,
        } => {
            assert_eq!(blood_type, "A+");
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("期望 InsufficientStock, 实际 {:?}", other),
    }

    assert_eq!(r.level(BloodType::APos).unwrap(), 2);
    assert_eq!(r.history_len().unwrap(), 1, "拒绝的出库不得写历史");
}

#[test]
fn test_clamp_出库扣减到零并记录请求数量() {
    let (_store, _config, r) =
        memory_reconciler(&[(config_keys::DEBIT_POLICY, "CLAMP")]).expect("无法创建对账器");
    r.record_donation("A+", 2, "Donor").expect("献血失败");

    let level = r.record_need("A+", 5, "Bob").expect("Clamp 模式不应失败");
    assert_eq!(level, 0);

    let snap = r.snapshot().unwrap();
    let last = snap.records.last().unwrap().parse().unwrap();
    assert_eq!(last.units, 5, "历史记录请求数量而非实际扣减量");
    assert_eq!(last.action, HistoryAction::Needed);
}

#[test]
fn test_strict_恰好用完库存() {
    let (_store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");
    r.record_donation("B+", 4, "D").unwrap();
    assert_eq!(r.record_need("B+", 4, "P").unwrap(), 0);
    assert_eq!(r.classify(BloodType::BPos).unwrap(), StockStatus::Critical);
}

// ==========================================
// 校验
// ==========================================

#[test]
fn test_校验失败不写入() {
    let (store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");

    let cases: Vec<(&str, i64)> = vec![("C+", 1), ("", 1), ("A+", 0), ("A+", -3), ("N/A", 2)];
    for (bt, units) in cases {
        assert!(r.record_donation(bt, units, "X").is_err(), "({}, {}) 应失败", bt, units);
        assert!(r.record_need(bt, units, "X").is_err(), "({}, {}) 应失败", bt, units);
    }

    assert_eq!(r.history_len().unwrap(), 0);
    assert_eq!(store.load_all(HISTORY_TABLE).unwrap().len(), 0);
}

#[test]
fn test_每次成功调用恰好增加一条历史() {
    let (_store, _config, r) =
        memory_reconciler(&[(config_keys::DEBIT_POLICY, "CLAMP")]).expect("无法创建对账器");

    let mut expected_len = 0;
    for (i, bt) in BloodType::ALL.iter().enumerate() {
        let units = (i as i64) + 1;
        r.record_donation(bt.as_str(), units, "d").unwrap();
        expected_len += 1;
        assert_eq!(r.history_len().unwrap(), expected_len);

        r.record_need(bt.as_str(), units * 2, "p").unwrap();
        expected_len += 1;
        assert_eq!(r.history_len().unwrap(), expected_len);

        let _ = r.record_need(bt.as_str(), 0, "p");
        assert_eq!(r.history_len().unwrap(), expected_len);
    }
}

// ==========================================
// 库存下限性质
// ==========================================

#[test]
fn test_strict_库存等于入库减出库() {
    let (_store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");

    // 伪随机序列,Strict 下被拒绝的出库不计入
    let mut seed: u64 = 42;
    let mut balance: i64 = 0;
    for _ in 0..200 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let units = ((seed >> 33) % 7 + 1) as i64;
        if (seed >> 20) % 2 == 0 {
            r.record_donation("AB-", units, "d").unwrap();
            balance += units;
        } else if r.record_need("AB-", units, "p").is_ok() {
            balance -= units;
        }
        assert!(balance >= 0);
    }

    assert_eq!(i64::from(r.level(BloodType::AbNeg).unwrap()), balance);
    assert!(r.audit().unwrap().is_consistent());
}

#[test]
fn test_clamp_库存永不为负() {
    let (_store, _config, r) =
        memory_reconciler(&[(config_keys::DEBIT_POLICY, "CLAMP")]).expect("无法创建对账器");

    let mut expected: i64 = 0;
    for (credit, units) in [(false, 3), (true, 2), (false, 5), (true, 10), (false, 4)] {
        if credit {
            r.record_donation("O+", units, "d").unwrap();
            expected += units;
        } else {
            r.record_need("O+", units, "p").unwrap();
            expected = (expected - units).max(0);
        }
    }
    assert_eq!(i64::from(r.level(BloodType::OPos).unwrap()), expected);
    assert_eq!(expected, 6);
}

// ==========================================
// 持久化
// ==========================================

#[test]
fn test_csv_持久化后重新加载() {
    let env = create_test_env(blood_bank::app::StoreBackend::Csv).expect("无法创建测试环境");
    env.state.reconciler.record_donation("A-", 6, "Ann").unwrap();
    env.state.reconciler.record_need("A-", 2, "Ben").unwrap();

    let reopened = reopen(&env).expect("重新打开失败");
    assert_eq!(reopened.reconciler.level(BloodType::ANeg).unwrap(), 4);
    assert_eq!(reopened.reconciler.history_len().unwrap(), 2);
    assert!(reopened.reconciler.audit().unwrap().is_consistent());
}

// ==========================================
// 并发
// ==========================================

#[test]
fn test_并发读者看到成对的库存与历史() {
    let (_store, _config, r) = memory_reconciler(&[]).expect("无法创建对账器");
    let r = Arc::new(r);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let r = r.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    r.record_donation("B-", 1, "w").unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let r = r.clone();
        std::thread::spawn(move || {
            for _ in 0..200 {
                let snap = r.snapshot().unwrap();
                let replayed: u32 = snap
                    .records
                    .iter()
                    .filter_map(|rec| rec.parse().ok())
                    .map(|e| e.units)
                    .sum();
                assert_eq!(snap.level(BloodType::BNeg), replayed);
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(r.level(BloodType::BNeg).unwrap(), 200);
    assert_eq!(r.history_len().unwrap(), 200);
}

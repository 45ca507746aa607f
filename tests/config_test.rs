// ==========================================
// 配置集成测试
// ==========================================
// 测试范围:
// 1. 配置更新后对账器立即生效
// 2. 配置持久化与快照恢复
// ==========================================


use blood_bank::app::StoreBackend;
use blood_bank::config::{config_keys, StockConfigReader};
use blood_bank::domain::{BloodType, DebitPolicy, StockStatus};
use blood_bank::engine::LedgerError;
use test_helpers::*;

#[test]
fn test_出库策略切换立即生效() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let r = &env.state.reconciler;
    r.record_donation("A-", 1, "d").unwrap();

    assert_eq!(r.debit_policy().unwrap(), DebitPolicy::Strict);
    assert!(matches!(
        r.record_need("A-", 3, "p"),
        Err(LedgerError::InsufficientStock { .. })
    ));

    env.state
        .update_config(config_keys::DEBIT_POLICY, "clamp")
        .expect("配置更新失败");
    assert_eq!(r.debit_policy().unwrap(), DebitPolicy::Clamp);
    assert_eq!(r.record_need("A-", 3, "p").unwrap(), 0);
}

#[test]
fn test_阈值调整后重新分级() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let r = &env.state.reconciler;
    r.record_donation("B+", 8, "d").unwrap();
    assert_eq!(r.classify(BloodType::BPos).unwrap(), StockStatus::Low);

    env.state.update_config(config_keys::LOW_STOCK_THRESHOLD, "3").unwrap();
    assert_eq!(r.classify(BloodType::BPos).unwrap(), StockStatus::Healthy);

    env.state
        .update_config(&config_keys::threshold_key(BloodType::BPos), "8")
        .unwrap();
    assert_eq!(r.classify(BloodType::BPos).unwrap(), StockStatus::Critical);
    assert_eq!(r.level(BloodType::BPos).unwrap(), 8, "调整阈值不改变库存");
}

#[test]
fn test_非法配置值回退默认() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    env.state.update_config(config_keys::DEBIT_POLICY, "sometimes").unwrap();
    env.state.update_config(config_keys::REFRESH_INTERVAL_SECS, "0").unwrap();

    assert_eq!(env.state.reconciler.debit_policy().unwrap(), DebitPolicy::Strict);
    let interval = env.state.dashboard_api.refresh_interval().unwrap();
    assert_eq!(interval.as_secs(), 1, "刷新周期至少 1 秒");
}

#[test]
fn test_配置持久化() {
    let env = create_test_env(StoreBackend::Csv).expect("无法创建测试环境");
    env.state.update_config(config_keys::DEBIT_POLICY, "CLAMP").unwrap();
    env.state.update_config(config_keys::TREND_WINDOW_DAYS, "7").unwrap();

    let reopened = reopen(&env).expect("重新打开失败");
    assert_eq!(reopened.reconciler.debit_policy().unwrap(), DebitPolicy::Clamp);
    let settings = reopened.config.get_dashboard_settings().unwrap();
    assert_eq!(settings.trend_window_days, 7);
}

#[test]
fn test_配置快照恢复() {
    let env = create_test_env(StoreBackend::Memory).expect("无法创建测试环境");
    let config = &env.state.config;
    config.update_config(config_keys::LOW_STOCK_THRESHOLD, "6").unwrap();
    let snapshot = config.get_config_snapshot().unwrap();

    config.update_config(config_keys::LOW_STOCK_THRESHOLD, "9").unwrap();
    config.update_config(config_keys::BAR_MAX_LENGTH, "40").unwrap();

    let restored = config.restore_config_from_snapshot(&snapshot).unwrap();
    assert_eq!(restored, 1);
    assert_eq!(
        config.get_config_value(config_keys::LOW_STOCK_THRESHOLD).unwrap().as_deref(),
        Some("6")
    );
    assert_eq!(config.get_config_value(config_keys::BAR_MAX_LENGTH).unwrap(), None);
    assert_eq!(config.get_thresholds().unwrap().threshold_for(BloodType::OPos), 6);
}

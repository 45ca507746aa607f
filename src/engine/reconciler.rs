// ==========================================
// 血库记录系统 - 库存/历史对账器
// ==========================================
// 职责: 献血入库 / 用血出库,库存变更与历史事件成对落地
// 红线:
// - 所有写操作在同一写锁内完成,读者只能看到成对的 (库存, 历史)
// - 校验失败不修改账本,也不写历史
// - 先持久化,后发布到内存; 持久化失败则内存状态不变
// ==========================================

use crate::config::stock_settings::StockConfigReader;
use crate::domain::history::{HistoryEvent, HistoryRecord};
use crate::domain::stock::StockEntry;
use crate::domain::types::{ActorKind, BloodType, DebitPolicy, HistoryAction, StockStatus};
use crate::engine::error::{LedgerError, LedgerResult};
use crate::engine::history_log::HistoryLog;
use crate::engine::stock_ledger::StockLedger;
use crate::repository::history_repo::HistoryRepository;
use crate::repository::record_store::RecordStore;
use crate::repository::stock_repo::StockRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ==========================================
// LedgerSnapshot - 一致性快照
// ==========================================
// 库存与历史取自同一次读锁,二者互相一致
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub ledger: StockLedger,
    pub records: Arc<[HistoryRecord]>,
}

impl LedgerSnapshot {
    pub fn level(&self, blood_type: BloodType) -> u32 {
        self.ledger.level(blood_type)
    }

    pub fn classify(&self, blood_type: BloodType) -> StockStatus {
        self.ledger.classify(blood_type)
    }

    pub fn levels(&self) -> &BTreeMap<BloodType, u32> {
        self.ledger.levels()
    }
}

// ==========================================
// AuditReport - 历史重放对账结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDiscrepancy {
    pub blood_type: BloodType,
    pub ledger_units: u32,
    pub replayed_units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub events_replayed: usize,
    pub skipped_records: usize,
    pub discrepancies: Vec<AuditDiscrepancy>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

// ==========================================
// Reconciler 内部状态
// ==========================================
struct LedgerState {
    ledger: StockLedger,
    log: HistoryLog,
    policy: DebitPolicy,
}

// ==========================================
// Reconciler - 对账器
// ==========================================
pub struct Reconciler {
    state: RwLock<LedgerState>,
    stock_repo: StockRepository,
    history_repo: HistoryRepository,
    config: Arc<dyn StockConfigReader>,
}

impl Reconciler {
    /// 从存储加载库存与历史
    ///
    /// # 参数
    /// - `store`: 表格存储（库存表为空时写入 8 个 0 库存行）
    /// - `config`: 阈值与出库策略来源
    pub fn open(store: Arc<dyn RecordStore>, config: Arc<dyn StockConfigReader>) -> LedgerResult<Self> {
        let stock_repo = StockRepository::new(store.clone());
        let history_repo = HistoryRepository::new(store.clone());

        let thresholds = config
            .get_thresholds()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        let policy = config
            .get_debit_policy()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;

        let ledger = StockLedger::from_levels(stock_repo.load()?, thresholds);
        let log = HistoryLog::from_records(history_repo.load_records()?);

        tracing::info!(
            backend = store.backend_name(),
            history_len = log.len(),
            policy = %policy,
            "对账器已加载"
        );

        Ok(Self {
            state: RwLock::new(LedgerState { ledger, log, policy }),
            stock_repo,
            history_repo,
            config,
        })
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 献血入库
    ///
    /// # 返回
    /// 入库后该血型的库存数量
    pub fn record_donation(&self, blood_type: &str, units: i64, actor_name: &str) -> LedgerResult<u32> {
        self.record(ActorKind::Donor, None, blood_type, units, actor_name)
    }

    /// 用血出库
    ///
    /// # 返回
    /// 出库后该血型的库存数量
    ///
    /// # 错误
    /// - Strict 策略下库存不足返回 InsufficientStock
    pub fn record_need(&self, blood_type: &str, units: i64, actor_name: &str) -> LedgerResult<u32> {
        self.record(ActorKind::Patient, None, blood_type, units, actor_name)
    }

    /// 献血入库（带献血者编号）
    pub fn record_donation_for(
        &self,
        donor_id: u32,
        blood_type: &str,
        units: i64,
        actor_name: &str,
    ) -> LedgerResult<u32> {
        self.record(ActorKind::Donor, Some(donor_id), blood_type, units, actor_name)
    }

    /// 用血出库（带患者编号）
    pub fn record_need_for(
        &self,
        patient_id: u32,
        blood_type: &str,
        units: i64,
        actor_name: &str,
    ) -> LedgerResult<u32> {
        self.record(ActorKind::Patient, Some(patient_id), blood_type, units, actor_name)
    }

    fn record(
        &self,
        actor_kind: ActorKind,
        actor_id: Option<u32>,
        blood_type: &str,
        units: i64,
        actor_name: &str,
    ) -> LedgerResult<u32> {
        // 1. 校验血型
        let bt = BloodType::parse(blood_type)
            .ok_or_else(|| LedgerError::InvalidBloodType(blood_type.to_string()))?;
        // 2. 校验数量
        let units = validate_units(units)?;

        let mut state = self.write_state()?;
        let action = HistoryAction::for_actor(actor_kind);

        // 3. Strict 策略下检查库存
        let available = state.ledger.level(bt);
        if action == HistoryAction::Needed && state.policy == DebitPolicy::Strict && units > available {
            tracing::warn!(blood_type = %bt, available, requested = units, "库存不足，拒绝出库");
            return Err(LedgerError::InsufficientStock {
                blood_type: bt.to_string(),
                available,
                requested: units,
            });
        }

        // 4. 计算变更后的账本
        let mut next = state.ledger.clone();
        let new_level = match action {
            HistoryAction::Donated => next.credit(bt, units),
            HistoryAction::Needed => {
                let applied = next.debit(bt, units);
                if applied < units {
                    tracing::warn!(blood_type = %bt, requested = units, applied, "出库数量超过库存，已扣减至 0");
                }
                next.level(bt)
            }
        };

        // 5. 历史事件记录请求数量
        let mut event = HistoryEvent::now(actor_kind, actor_name.trim(), bt, units, action);
        if let Some(id) = actor_id {
            event = event.with_actor_id(id);
        }

        // 6. 持久化,成功后发布
        let previous = state.ledger.entries();
        self.stock_repo.save(&next.entries())?;
        let record = match self.history_repo.append(&event) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "历史写入失败，回滚库存表");
                self.rollback_stock(&previous);
                return Err(e.into());
            }
        };

        state.ledger = next;
        state.log.push_record(record);

        tracing::info!(
            actor = actor_kind.as_str(),
            action = action.as_str(),
            blood_type = %bt,
            units,
            new_level,
            "库存变更已记录"
        );
        Ok(new_level)
    }

    fn rollback_stock(&self, previous: &[StockEntry]) {
        if let Err(e) = self.stock_repo.save(previous) {
            tracing::error!(error = %e, "库存表回滚失败，存储与内存状态可能不一致");
        }
    }

    /// 重新读取阈值与出库策略
    pub fn reload_config(&self) -> LedgerResult<()> {
        let thresholds = self
            .config
            .get_thresholds()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        let policy = self
            .config
            .get_debit_policy()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;

        let mut state = self.write_state()?;
        state.ledger = StockLedger::from_levels(state.ledger.levels().clone(), thresholds);
        state.policy = policy;
        tracing::info!(policy = %policy, "对账器配置已重新加载");
        Ok(())
    }

    /// 从存储重新加载库存与历史（外部导入后调用）
    pub fn reload_from_store(&self) -> LedgerResult<()> {
        let thresholds = self
            .config
            .get_thresholds()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;

        let mut state = self.write_state()?;
        let levels = self.stock_repo.load()?;
        let records = self.history_repo.load_records()?;
        state.ledger = StockLedger::from_levels(levels, thresholds);
        state.log = HistoryLog::from_records(records);
        tracing::info!(history_len = state.log.len(), "对账器已从存储重新加载");
        Ok(())
    }

    // ==========================================
    // 读操作
    // ==========================================

    /// 一致性快照
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let state = self.read_state()?;
        Ok(LedgerSnapshot {
            ledger: state.ledger.clone(),
            records: state.log.to_shared(),
        })
    }

    pub fn level(&self, blood_type: BloodType) -> LedgerResult<u32> {
        Ok(self.read_state()?.ledger.level(blood_type))
    }

    pub fn classify(&self, blood_type: BloodType) -> LedgerResult<StockStatus> {
        Ok(self.read_state()?.ledger.classify(blood_type))
    }

    pub fn history_len(&self) -> LedgerResult<usize> {
        Ok(self.read_state()?.log.len())
    }

    pub fn debit_policy(&self) -> LedgerResult<DebitPolicy> {
        Ok(self.read_state()?.policy)
    }

    /// 按历史重放核对库存
    ///
    /// 从 0 开始依次重放可解析事件（入库累加,出库扣减到 0 为止）,
    /// 与当前账本逐血型比较
    pub fn audit(&self) -> LedgerResult<AuditReport> {
        let snapshot = self.snapshot()?;

        let mut replayed = StockLedger::new(snapshot.ledger.thresholds().clone());
        let mut events_replayed = 0usize;
        let mut skipped_records = 0usize;
        for (idx, record) in snapshot.records.iter().enumerate() {
            match record.parse() {
                Ok(event) => {
                    match event.action {
                        HistoryAction::Donated => {
                            replayed.credit(event.blood_type, event.units);
                        }
                        HistoryAction::Needed => {
                            replayed.debit(event.blood_type, event.units);
                        }
                    }
                    events_replayed += 1;
                }
                Err(reason) => {
                    skipped_records += 1;
                    let err = LedgerError::MalformedHistoryEvent {
                        row: idx,
                        reason: reason.to_string(),
                    };
                    tracing::warn!(error = %err, "对账时跳过损坏的历史记录");
                }
            }
        }

        let discrepancies: Vec<AuditDiscrepancy> = BloodType::ALL
            .iter()
            .filter(|bt| snapshot.level(**bt) != replayed.level(**bt))
            .map(|bt| AuditDiscrepancy {
                blood_type: *bt,
                ledger_units: snapshot.level(*bt),
                replayed_units: replayed.level(*bt),
            })
            .collect();

        if !discrepancies.is_empty() {
            tracing::warn!(count = discrepancies.len(), "库存与历史重放结果不一致");
        }

        Ok(AuditReport {
            events_replayed,
            skipped_records,
            discrepancies,
        })
    }

    // ==========================================
    // 锁辅助
    // ==========================================

    fn read_state(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|e| LedgerError::LockError(e.to_string()))
    }

    fn write_state(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|e| LedgerError::LockError(e.to_string()))
    }
}

/// 数量必须为正且不超过 u32 范围
pub fn validate_units(units: i64) -> LedgerResult<u32> {
    if units <= 0 {
        return Err(LedgerError::InvalidUnits(units.to_string()));
    }
    u32::try_from(units).map_err(|_| LedgerError::InvalidUnits(units.to_string()))
}

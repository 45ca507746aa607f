// ==========================================
// 血库记录系统 - 驾驶舱 API
// ==========================================
// 职责: 只读聚合（库存条、低库存提醒、当日累计、日趋势）
// 数据来源: Reconciler 一致性快照,刷新期间不会看到半截写入
// 刷新方式: 调用方定时调用 refresh(),或使用 spawn_refresh_loop
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::stock_settings::{DashboardSettings, StockConfigReader};
use crate::domain::stock::StockAlert;
use crate::domain::trend::{DailyTrendPoint, DateWindow, TodayTotals};
use crate::domain::types::{BloodType, StockStatus};
use crate::engine::reconciler::Reconciler;
use crate::engine::trend::TrendAggregator;
use crate::repository::donor_repo::DonorRepository;
use crate::repository::patient_repo::PatientRepository;
use crate::repository::record_store::{RecordStore, Row};
use crate::repository::schema::{DASHBOARD_HEADER, DASHBOARD_TABLE};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// ==========================================
// 驾驶舱数据结构
// ==========================================

/// 单一血型库存条
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockGauge {
    pub blood_type: BloodType,
    pub units: u32,
    pub status: StockStatus,
    pub threshold: u32,
    /// 库存条长度 (0..=bar_max_length)
    pub bar_len: u32,
}

/// 一次刷新的完整结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub stock: Vec<StockGauge>,
    pub alerts: Vec<StockAlert>,
    pub all_healthy: bool,
    pub today: TodayTotals,
    pub series: Vec<DailyTrendPoint>,
    pub skipped_records: usize,
    pub history_len: usize,
    pub total_donors: usize,
    pub total_patients: usize,
    pub refreshed_at: NaiveDateTime,
}

// ==========================================
// TrendBuffer - 趋势环形缓冲
// ==========================================
// 由驾驶舱持有,每次刷新从日序列重新填充
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendBuffer {
    capacity: usize,
    points: VecDeque<DailyTrendPoint>,
}

impl TrendBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加一个点,超出容量时丢弃最旧的点
    pub fn push(&mut self, point: DailyTrendPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// 用日序列重新填充（只保留最近 capacity 个点）
    pub fn refill(&mut self, series: &[DailyTrendPoint]) {
        self.points.clear();
        let start = series.len().saturating_sub(self.capacity);
        self.points.extend(series[start..].iter().copied());
    }

    /// 调整容量（缩小时丢弃最旧的点）
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> Vec<DailyTrendPoint> {
        self.points.iter().copied().collect()
    }

    pub fn donated_series(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.donated_units).collect()
    }

    pub fn used_series(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.used_units).collect()
    }
}

// ==========================================
// DashboardObserver - 刷新结果接收方
// ==========================================
pub trait DashboardObserver: Send + 'static {
    /// 收到新快照; 返回 false 停止刷新循环
    fn on_refresh(&mut self, snapshot: &DashboardSnapshot) -> bool;

    /// 刷新失败; 返回 false 停止刷新循环
    fn on_error(&mut self, error: &ApiError) -> bool {
        tracing::warn!(error = %error, "驾驶舱刷新失败");
        true
    }
}

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    reconciler: Arc<Reconciler>,
    config: Arc<dyn StockConfigReader>,
    store: Arc<dyn RecordStore>,
    donors: DonorRepository,
    patients: PatientRepository,
    aggregator: TrendAggregator,
    trend_buffer: Mutex<TrendBuffer>,
}

impl DashboardApi {
    pub fn new(
        store: Arc<dyn RecordStore>,
        reconciler: Arc<Reconciler>,
        config: Arc<dyn StockConfigReader>,
    ) -> ApiResult<Self> {
        let settings = Self::settings_from(config.as_ref())?;
        Ok(Self {
            reconciler,
            donors: DonorRepository::new(store.clone())?,
            patients: PatientRepository::new(store.clone())?,
            store,
            config,
            aggregator: TrendAggregator::new(),
            trend_buffer: Mutex::new(TrendBuffer::new(settings.trend_buffer_len)),
        })
    }

    fn settings_from(config: &dyn StockConfigReader) -> ApiResult<DashboardSettings> {
        config
            .get_dashboard_settings()
            .map_err(|e| ApiError::StorageUnavailable(format!("驾驶舱配置读取失败: {}", e)))
    }

    /// 配置的刷新周期
    pub fn refresh_interval(&self) -> ApiResult<Duration> {
        let settings = Self::settings_from(self.config.as_ref())?;
        Ok(Duration::from_secs(settings.refresh_interval_secs))
    }

    /// 刷新（以本地日期为“今天”）
    pub fn refresh(&self) -> ApiResult<DashboardSnapshot> {
        self.refresh_on(Local::now().date_naive())
    }

    /// 刷新（指定“今天”）
    pub fn refresh_on(&self, today: NaiveDate) -> ApiResult<DashboardSnapshot> {
        let settings = Self::settings_from(self.config.as_ref())?;
        let snapshot = self.reconciler.snapshot()?;

        // 1. 库存条与提醒
        let stock: Vec<StockGauge> = BloodType::ALL
            .iter()
            .map(|bt| {
                let units = snapshot.level(*bt);
                StockGauge {
                    blood_type: *bt,
                    units,
                    status: snapshot.classify(*bt),
                    threshold: snapshot.ledger.threshold(*bt),
                    bar_len: bar_length(units, &settings),
                }
            })
            .collect();
        let alerts = snapshot.ledger.low_stock_alerts();

        // 2. 日趋势与当日累计
        let window = match settings.trend_window_days {
            0 => None,
            days => Some(DateWindow::trailing(today, days)),
        };
        let series = self.aggregator.daily_series(snapshot.records.iter(), window);
        let (today_totals, _) = self.aggregator.today_totals_on(snapshot.records.iter(), today);

        {
            let mut buffer = self
                .trend_buffer
                .lock()
                .map_err(|e| ApiError::InternalError(format!("趋势缓冲锁获取失败: {}", e)))?;
            buffer.resize(settings.trend_buffer_len);
            buffer.refill(&series.points);
        }

        // 3. 登记人数
        let total_donors = self.donors.count()?;
        let total_patients = self.patients.count()?;

        if series.skipped > 0 {
            tracing::warn!(skipped = series.skipped, "驾驶舱刷新时跳过损坏的历史记录");
        }
        tracing::debug!(alerts = alerts.len(), points = series.points.len(), "驾驶舱已刷新");

        Ok(DashboardSnapshot {
            all_healthy: alerts.is_empty(),
            stock,
            alerts,
            today: today_totals,
            series: series.points,
            skipped_records: series.skipped,
            history_len: snapshot.records.len(),
            total_donors,
            total_patients,
            refreshed_at: Local::now().naive_local(),
        })
    }

    /// 当前趋势缓冲内容
    pub fn trend_buffer(&self) -> ApiResult<TrendBuffer> {
        self.trend_buffer
            .lock()
            .map(|b| b.clone())
            .map_err(|e| ApiError::InternalError(format!("趋势缓冲锁获取失败: {}", e)))
    }

    /// 导出驾驶舱汇总到 Dashboard 表
    ///
    /// 布局: 血型库存行 → 空行 → "Date, Units Donated, Units Used" → 日序列行
    ///
    /// # 返回
    /// 写入的行数
    pub fn export_summary(&self) -> ApiResult<usize> {
        let snap = self.refresh()?;

        let mut rows: Vec<Row> = snap
            .stock
            .iter()
            .map(|g| vec![g.blood_type.to_string(), g.units.to_string(), g.status.to_string()])
            .collect();
        rows.push(vec![String::new(); DASHBOARD_HEADER.len()]);
        rows.push(vec![
            "Date".to_string(),
            "Units Donated".to_string(),
            "Units Used".to_string(),
        ]);
        rows.extend(snap.series.iter().map(|p| {
            vec![
                p.date.format("%Y-%m-%d").to_string(),
                p.donated_units.to_string(),
                p.used_units.to_string(),
            ]
        }));

        let count = rows.len();
        self.store.ensure_table(DASHBOARD_TABLE, &DASHBOARD_HEADER)?;
        self.store.replace_all(DASHBOARD_TABLE, rows)?;
        tracing::info!(rows = count, "驾驶舱汇总已导出");
        Ok(count)
    }
}

/// 库存条长度 = units * bar_max_length / bar_scale_units,不超过 bar_max_length
pub fn bar_length(units: u32, settings: &DashboardSettings) -> u32 {
    let max = u64::from(settings.bar_max_length);
    let scale = u64::from(settings.bar_scale_units.max(1));
    let len = (u64::from(units) * max / scale).min(max);
    len as u32
}

// ==========================================
// 定时刷新
// ==========================================

/// 启动定时刷新任务
///
/// 每个周期在阻塞线程池上调用 refresh(),结果交给 observer;
/// observer 返回 false 或任务被 abort 时停止
pub fn spawn_refresh_loop<O>(api: Arc<DashboardApi>, interval: Duration, mut observer: O) -> JoinHandle<()>
where
    O: DashboardObserver,
{
    let period = if interval.is_zero() {
        Duration::from_millis(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = period.as_millis() as u64, "驾驶舱定时刷新已启动");

        loop {
            ticker.tick().await;

            let api = api.clone();
            let keep_going = match tokio::task::spawn_blocking(move || api.refresh()).await {
                Ok(Ok(snapshot)) => observer.on_refresh(&snapshot),
                Ok(Err(e)) => observer.on_error(&e),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "驾驶舱刷新任务异常退出");
                    false
                }
            };

            if !keep_going {
                tracing::info!("驾驶舱定时刷新已停止");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, donated: u64) -> DailyTrendPoint {
        DailyTrendPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            donated_units: donated,
            used_units: 0,
        }
    }

    #[test]
    fn test_trend_buffer_keeps_latest() {
        let mut buf = TrendBuffer::new(3);
        for d in 1..=5 {
            buf.push(point(d, u64::from(d)));
        }
        assert_eq!(buf.donated_series(), vec![3, 4, 5]);
    }

    #[test]
    fn test_trend_buffer_refill_and_resize() {
        let series: Vec<DailyTrendPoint> = (1..=4).map(|d| point(d, 1)).collect();
        let mut buf = TrendBuffer::new(10);
        buf.refill(&series);
        assert_eq!(buf.len(), 4);

        buf.resize(2);
        assert_eq!(buf.points(), series[2..].to_vec());
        buf.refill(&series);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_bar_length_scales_and_caps() {
        let settings = DashboardSettings::default(); // 30 格 / 50 单位
        assert_eq!(bar_length(0, &settings), 0);
        assert_eq!(bar_length(25, &settings), 15);
        assert_eq!(bar_length(50, &settings), 30);
        assert_eq!(bar_length(500, &settings), 30);
    }
}

// ==========================================
// 血库记录系统 - 趋势聚合引擎
// ==========================================
// 职责: 按自然日汇总献血/用血数量
// 输入: 历史原始行 (可能含损坏行)
// 输出: 稀疏日序列 (仅含有事件的日期,按日期升序)
// 红线: 损坏行跳过并计数,不得中断聚合
// ==========================================

use crate::domain::history::HistoryRecord;
use crate::domain::trend::{DailyTrendPoint, DateWindow, TodayTotals, TrendSeries};
use crate::domain::types::HistoryAction;
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;

// ==========================================
// TrendAggregator - 趋势聚合引擎
// ==========================================
pub struct TrendAggregator {
    // 无状态引擎
}

impl Default for TrendAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 生成日序列
    ///
    /// # 参数
    /// - `records`: 历史行（任意顺序）
    /// - `window`: 日期闭区间; None 表示全部日期
    ///
    /// # 返回
    /// TrendSeries（points 按日期升序, skipped 为损坏行数）
    pub fn daily_series<'a, I>(&self, records: I, window: Option<DateWindow>) -> TrendSeries
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
        let mut skipped = 0usize;

        for (idx, record) in records.into_iter().enumerate() {
            let event = match record.parse() {
                Ok(event) => event,
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(row = idx, reason = %reason, "历史记录损坏，聚合时跳过");
                    continue;
                }
            };

            let date = event.date();
            if window.map(|w| !w.contains(date)).unwrap_or(false) {
                continue;
            }

            let bucket = buckets.entry(date).or_insert((0, 0));
            match event.action {
                HistoryAction::Donated => bucket.0 += u64::from(event.units),
                HistoryAction::Needed => bucket.1 += u64::from(event.units),
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "日序列聚合完成，存在损坏记录");
        }

        TrendSeries {
            points: buckets
                .into_iter()
                .map(|(date, (donated_units, used_units))| DailyTrendPoint {
                    date,
                    donated_units,
                    used_units,
                })
                .collect(),
            skipped,
        }
    }

    /// 当日累计（本地日期）
    pub fn today_totals<'a, I>(&self, records: I) -> (TodayTotals, usize)
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        self.today_totals_on(records, Local::now().date_naive())
    }

    /// 指定日期的累计
    ///
    /// # 返回
    /// (当日累计, 损坏行数)
    pub fn today_totals_on<'a, I>(&self, records: I, today: NaiveDate) -> (TodayTotals, usize)
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        let series = self.daily_series(records, Some(DateWindow::new(today, today)));
        let totals = series
            .points
            .first()
            .map(|p| TodayTotals {
                donated: p.donated_units,
                used: p.used_units,
            })
            .unwrap_or_default();
        (totals, series.skipped)
    }
}

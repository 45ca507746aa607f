// ==========================================
// 血库记录系统 - 趋势统计领域模型
// ==========================================
// 派生数据,不落库; 每次由历史重放计算
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// DailyTrendPoint - 单日献血/用血汇总
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DailyTrendPoint {
    pub date: NaiveDate,
    pub donated_units: u64,
    pub used_units: u64,
}

// ==========================================
// TodayTotals - 当日累计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TodayTotals {
    pub donated: u64,
    pub used: u64,
}

// ==========================================
// TrendSeries - 日序列 + 跳过计数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrendSeries {
    /// 按日期升序,仅包含有事件的日期
    pub points: Vec<DailyTrendPoint>,
    /// 无法解析而被跳过的历史行数
    pub skipped: usize,
}

// ==========================================
// DateWindow - 闭区间日期窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// 截至 `today` 的最近 `days` 天（含当天）
    ///
    /// 超出日期范围时从 `NaiveDate::MIN` 起算
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        let from = Duration::try_days(span)
            .and_then(|d| today.checked_sub_signed(d))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

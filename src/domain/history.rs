// ==========================================
// 血库记录系统 - 历史事件领域模型
// ==========================================
// 红线: 历史只追加,不修改,不删除
// 用途: 审计追踪,趋势统计,库存对账
// 对齐: History 表 (ID, Type, Name, Blood Type, Units, Action, Date)
// ==========================================

use crate::domain::types::{ActorKind, BloodType, HistoryAction};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 历史表时间戳存储格式
pub const HISTORY_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// HistoryEvent - 历史事件（已校验）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub timestamp: NaiveDateTime,  // 发生时间
    pub actor_kind: ActorKind,     // 献血者 / 患者
    pub actor_id: Option<u32>,     // 献血者/患者编号 (无登记记录时为 None)
    pub actor_name: String,        // 姓名
    pub blood_type: BloodType,     // 血型
    pub units: u32,                // 请求数量 (非实际扣减量)
    pub action: HistoryAction,     // 入库 / 出库
}

impl HistoryEvent {
    /// 以当前本地时间创建事件
    pub fn now(
        actor_kind: ActorKind,
        actor_name: &str,
        blood_type: BloodType,
        units: u32,
        action: HistoryAction,
    ) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            actor_kind,
            actor_id: None,
            actor_name: actor_name.to_string(),
            blood_type,
            units,
            action,
        }
    }

    /// 设置操作主体编号
    pub fn with_actor_id(mut self, actor_id: u32) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// 设置时间戳
    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 事件所属日期
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// 是否为入库事件
    pub fn is_credit(&self) -> bool {
        self.action == HistoryAction::Donated
    }
}

// ==========================================
// MalformedField - 历史行解析失败原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for MalformedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "字段 {} 无法解析: '{}'", self.field, self.value)
    }
}

// ==========================================
// HistoryRecord - 历史表原始行
// ==========================================
// 从存储加载的行可能损坏（时间戳/数量无法解析）,
// 由 parse() 在聚合时逐行校验
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub actor_kind: String,
    pub name: String,
    pub blood_type: String,
    pub units: String,
    pub action: String,
    pub date: String,
}

impl HistoryRecord {
    /// 列数 (对齐 History 表头)
    pub const COLUMN_COUNT: usize = 7;

    /// 从表格行构造 (按 History 表头列序)
    ///
    /// 缺失的列按空字符串处理,由 parse() 报告
    pub fn from_row(row: &[String]) -> Self {
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        Self {
            id: cell(0),
            actor_kind: cell(1),
            name: cell(2),
            blood_type: cell(3),
            units: cell(4),
            action: cell(5),
            date: cell(6),
        }
    }

    /// 转换为表格行
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.actor_kind.clone(),
            self.name.clone(),
            self.blood_type.clone(),
            self.units.clone(),
            self.action.clone(),
            self.date.clone(),
        ]
    }

    /// 校验并解析为 HistoryEvent
    pub fn parse(&self) -> Result<HistoryEvent, MalformedField> {
        let timestamp = parse_timestamp(&self.date).ok_or_else(|| MalformedField {
            field: "Date",
            value: self.date.clone(),
        })?;

        let units = parse_unit_cell(&self.units).ok_or_else(|| MalformedField {
            field: "Units",
            value: self.units.clone(),
        })?;

        let blood_type = BloodType::parse(&self.blood_type).ok_or_else(|| MalformedField {
            field: "Blood Type",
            value: self.blood_type.clone(),
        })?;

        let actor_kind = ActorKind::from_str(&self.actor_kind);
        let action = match (self.action.trim().is_empty(), actor_kind) {
            // 动作列为空时按主体类型推断
            (true, Some(kind)) => HistoryAction::for_actor(kind),
            _ => HistoryAction::from_str(&self.action).ok_or_else(|| MalformedField {
                field: "Action",
                value: self.action.clone(),
            })?,
        };
        let actor_kind = actor_kind.unwrap_or(match action {
            HistoryAction::Donated => ActorKind::Donor,
            HistoryAction::Needed => ActorKind::Patient,
        });

        Ok(HistoryEvent {
            timestamp,
            actor_kind,
            actor_id: self.id.trim().parse::<u32>().ok(),
            actor_name: self.name.trim().to_string(),
            blood_type,
            units,
            action,
        })
    }
}

impl From<&HistoryEvent> for HistoryRecord {
    fn from(event: &HistoryEvent) -> Self {
        Self {
            id: event.actor_id.map(|id| id.to_string()).unwrap_or_default(),
            actor_kind: event.actor_kind.as_str().to_string(),
            name: event.actor_name.clone(),
            blood_type: event.blood_type.as_str().to_string(),
            units: event.units.to_string(),
            action: event.action.as_str().to_string(),
            date: event.timestamp.format(HISTORY_TS_FORMAT).to_string(),
        }
    }
}

// ==========================================
// 单元格解析
// ==========================================

/// 解析时间戳
///
/// 支持:
/// - "2024-01-01 10:00:00" (控制台版本)
/// - "2024-01-01T10:00:00.123456" (图形界面版本 isoformat)
/// - "2024-01-01" (仅日期,按 00:00:00 处理)
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = [
        HISTORY_TS_FORMAT,
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// 解析数量单元格
///
/// Excel 数值单元格可能读出 "3.0",整数值按整数接受
pub fn parse_unit_cell(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}

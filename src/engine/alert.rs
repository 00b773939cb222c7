// ==========================================
// 传单配布调度系统 - 告警计算引擎
// ==========================================
// 职责: 读取时派生槽位/计划告警，不落库
// 输入: 计划日期 + 槽位分配 + 订单承诺
// 输出: SlotAlert (Danger / Warning 两级 + reason 列表)
// ==========================================
// 红线: 告警每次读取重新计算，禁止缓存
// ==========================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::commitment::Commitment;
use crate::domain::schedule::SlotAssignment;
use crate::domain::types::AlertReason;

// ==========================================
// SlotAlert - 槽位告警
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotAlert {
    pub is_over_count: bool,
    pub is_before_start: bool,
    pub is_over_spare_date: bool,
    pub is_over_end_date: bool,
    pub is_danger: bool,
    pub is_warning: bool,
    pub alert_reasons: Vec<AlertReason>,

    // ===== 份数调整建议 (仅超量时) =====
    pub excess: i64,
    pub suggested_count: Option<i64>,
}

// ==========================================
// AlertCalculator - 告警计算引擎
// ==========================================
pub struct AlertCalculator {
    // 无状态引擎
}

impl Default for AlertCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单个槽位的告警
    ///
    /// # 参数
    /// - `schedule_date`: 所属计划的配布日期
    /// - `item`: 槽位分配
    /// - `commitment`: 该分配 (order_id, flyer_id) 的承诺；None 视为无上限
    pub fn evaluate_slot(
        &self,
        schedule_date: NaiveDate,
        item: &SlotAssignment,
        commitment: Option<&Commitment>,
    ) -> SlotAlert {
        let is_over_count = commitment.map_or(false, Commitment::is_over);
        let is_before_start = item.start_date.map_or(false, |start| schedule_date < start);
        let is_over_spare_date = item.spare_date.map_or(false, |spare| schedule_date > spare);
        let is_over_end_date = item.end_date.map_or(false, |end| schedule_date > end);

        let is_danger = is_over_count || is_before_start || is_over_spare_date;
        let is_warning = !is_danger && is_over_end_date;

        let mut alert_reasons = Vec::new();
        if is_danger {
            if is_over_count {
                alert_reasons.push(AlertReason::OverCount);
            }
            if is_before_start {
                alert_reasons.push(AlertReason::BeforeStart);
            }
            if is_over_spare_date {
                alert_reasons.push(AlertReason::OverSpareDate);
            }
        } else if is_warning {
            alert_reasons.push(AlertReason::OverEndDate);
        }

        let (excess, suggested_count) = match commitment {
            Some(c) if is_over_count => {
                let excess = c.excess();
                (excess, Some(Self::suggest_count(item.planned_count, excess)))
            }
            _ => (0, None),
        };

        SlotAlert {
            is_over_count,
            is_before_start,
            is_over_spare_date,
            is_over_end_date,
            is_danger,
            is_warning,
            alert_reasons,
            excess,
            suggested_count,
        }
    }

    /// 建议份数 = max(0, 当前份数 - 超出份数)，只提示不自动应用
    pub fn suggest_count(planned_count: i64, excess: i64) -> i64 {
        (planned_count - excess).max(0)
    }

    /// 计划级告警 = 任一槽位 Danger
    pub fn has_alert<'a, I>(alerts: I) -> bool
    where
        I: IntoIterator<Item = &'a SlotAlert>,
    {
        alerts.into_iter().any(|a| a.is_danger)
    }
}

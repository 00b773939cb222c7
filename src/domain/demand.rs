// ==========================================
// 传单配布调度系统 - 配布需求领域模型
// ==========================================
// 来源: 订单确认流程 (按选定的小区域拆分)
// 红线: 一个需求要么在需求池(未分配)，要么已落位为 SlotAssignment，二者必居其一
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::types::DistributionMethod;

// ==========================================
// DemandUnit - 配布需求单元
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandUnit {
    pub demand_id: String,               // 需求ID
    pub order_id: i64,                   // 订单ID
    pub flyer_id: i64,                   // 传单ID
    pub area_id: i64,                    // 小区域ID
    pub method: DistributionMethod,      // 配布方式
    pub planned_count: i64,              // 计划份数
    pub start_date: Option<NaiveDate>,   // 配布开始日
    pub end_date: Option<NaiveDate>,     // 配布结束日
    pub spare_date: Option<NaiveDate>,   // 预备日 (结束日之后的最终期限)
}

impl DemandUnit {
    /// 需求窗口 `[start_date, end_date]` 是否与视图 `[from, to]` 相交
    ///
    /// 任一侧的空边界视为无界: `start <= to AND end >= from`
    pub fn intersects_view(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        let start_ok = match (self.start_date, to) {
            (Some(start), Some(to)) => start <= to,
            _ => true,
        };
        let end_ok = match (self.end_date, from) {
            (Some(end), Some(from)) => end >= from,
            _ => true,
        };
        start_ok && end_ok
    }

    /// 日期是否落在需求自身窗口内（空边界视为无界）
    pub fn window_contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }

    /// 比较业务字段（忽略 demand_id）
    pub fn same_payload(&self, other: &DemandUnit) -> bool {
        self.order_id == other.order_id
            && self.flyer_id == other.flyer_id
            && self.area_id == other.area_id
            && self.method == other.method
            && self.planned_count == other.planned_count
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.spare_date == other.spare_date
    }
}

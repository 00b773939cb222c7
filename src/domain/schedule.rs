// ==========================================
// 传单配布调度系统 - 配布计划领域模型
// ==========================================
// Schedule: 日期 + 小区域 的配布容器，最多 6 个槽位
// SlotAssignment: 某一传单在计划中的落位
// 红线: 槽位内传单必须与计划区域一致 (分配时校验，不冗余存储)
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::demand::DemandUnit;
use crate::domain::types::{DistributionMethod, ScheduleStatus};

/// 每个配布计划的槽位上限
pub const MAX_SLOTS: u8 = 6;

/// 槽位号是否合法 (1..=6)
pub fn is_valid_slot_index(slot_index: i64) -> bool {
    (1..=MAX_SLOTS as i64).contains(&slot_index)
}

// ==========================================
// Schedule - 配布计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,            // 计划ID
    pub schedule_date: NaiveDate,       // 配布日期
    pub area_id: i64,                   // 小区域ID
    pub branch_id: Option<i64>,         // 营业所
    pub distributor_id: Option<i64>,    // 配布员
    pub status: ScheduleStatus,         // 状态 (仅展示)
    pub created_at: NaiveDateTime,      // 创建时间
    pub updated_at: NaiveDateTime,      // 更新时间
}

impl Schedule {
    /// 创建空计划 (状态 UNSTARTED)
    pub fn new(
        schedule_date: NaiveDate,
        area_id: i64,
        branch_id: Option<i64>,
        distributor_id: Option<i64>,
    ) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            schedule_id: uuid::Uuid::new_v4().to_string(),
            schedule_date,
            area_id,
            branch_id,
            distributor_id,
            status: ScheduleStatus::Unstarted,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// SlotAssignment - 槽位分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub item_id: String,                // 分配ID
    pub schedule_id: String,            // 所属计划
    pub slot_index: u8,                 // 槽位号 1..=6
    pub flyer_id: i64,                  // 传单ID
    pub order_id: i64,                  // 订单ID
    pub method: DistributionMethod,     // 配布方式
    pub planned_count: i64,             // 计划份数 (可单独修正)
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub spare_date: Option<NaiveDate>,
}

impl SlotAssignment {
    /// 由需求单元物化为槽位分配
    pub fn from_demand(demand: &DemandUnit, schedule_id: &str, slot_index: u8) -> Self {
        Self {
            item_id: uuid::Uuid::new_v4().to_string(),
            schedule_id: schedule_id.to_string(),
            slot_index,
            flyer_id: demand.flyer_id,
            order_id: demand.order_id,
            method: demand.method,
            planned_count: demand.planned_count,
            start_date: demand.start_date,
            end_date: demand.end_date,
            spare_date: demand.spare_date,
        }
    }

    /// 还原为需求单元 (区域取自所属计划，生成新ID)
    pub fn to_demand(&self, area_id: i64) -> DemandUnit {
        DemandUnit {
            demand_id: uuid::Uuid::new_v4().to_string(),
            order_id: self.order_id,
            flyer_id: self.flyer_id,
            area_id,
            method: self.method,
            planned_count: self.planned_count,
            start_date: self.start_date,
            end_date: self.end_date,
            spare_date: self.spare_date,
        }
    }
}

// ==========================================
// ScheduleFieldUpdate - 计划字段修改
// ==========================================
// 可自由修改; 告警在下次读取时重新计算
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleFieldUpdate {
    Date(NaiveDate),
    BranchId(Option<i64>),
    DistributorId(Option<i64>),
    Status(ScheduleStatus),
}

impl ScheduleFieldUpdate {
    /// 字段名 (用于日志与错误信息)
    pub fn field_name(&self) -> &'static str {
        match self {
            ScheduleFieldUpdate::Date(_) => "date",
            ScheduleFieldUpdate::BranchId(_) => "branch_id",
            ScheduleFieldUpdate::DistributorId(_) => "distributor_id",
            ScheduleFieldUpdate::Status(_) => "status",
        }
    }

    /// 应用到计划
    pub fn apply(&self, schedule: &mut Schedule) {
        match self {
            ScheduleFieldUpdate::Date(date) => schedule.schedule_date = *date,
            ScheduleFieldUpdate::BranchId(id) => schedule.branch_id = *id,
            ScheduleFieldUpdate::DistributorId(id) => schedule.distributor_id = *id,
            ScheduleFieldUpdate::Status(status) => schedule.status = *status,
        }
    }

    /// 从 `{field: value}` 形式解析
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self, String> {
        match field {
            "date" => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| "date 必须为 YYYY-MM-DD 字符串".to_string())?;
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map(ScheduleFieldUpdate::Date)
                    .map_err(|e| format!("日期格式错误（应为YYYY-MM-DD）: {}", e))
            }
            "branch_id" => parse_optional_id(field, value).map(ScheduleFieldUpdate::BranchId),
            "distributor_id" => {
                parse_optional_id(field, value).map(ScheduleFieldUpdate::DistributorId)
            }
            "status" => value
                .as_str()
                .and_then(ScheduleStatus::parse)
                .map(ScheduleFieldUpdate::Status)
                .ok_or_else(|| format!("无效的状态值: {}", value)),
            other => Err(format!("字段{}不可修改", other)),
        }
    }
}

fn parse_optional_id(field: &str, value: &serde_json::Value) -> Result<Option<i64>, String> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_i64()
        .map(Some)
        .ok_or_else(|| format!("{} 必须为整数或 null", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slot_index_range() {
        assert!(!is_valid_slot_index(0));
        assert!(is_valid_slot_index(1));
        assert!(is_valid_slot_index(6));
        assert!(!is_valid_slot_index(7));
    }

    #[test]
    fn test_demand_slot_round_trip_keeps_payload() {
        let demand = DemandUnit {
            demand_id: "D1".to_string(),
            order_id: 100,
            flyer_id: 7,
            area_id: 5,
            method: DistributionMethod::MultiFamily,
            planned_count: 1200,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            spare_date: NaiveDate::from_ymd_opt(2026, 3, 12),
        };
        let item = SlotAssignment::from_demand(&demand, "S1", 3);
        assert_eq!(item.slot_index, 3);
        assert_eq!(item.schedule_id, "S1");

        let back = item.to_demand(5);
        assert_ne!(back.demand_id, demand.demand_id);
        assert!(back.same_payload(&demand));
    }

    #[test]
    fn test_field_update_from_json() {
        assert_eq!(
            ScheduleFieldUpdate::from_json("date", &json!("2026-04-06")).unwrap(),
            ScheduleFieldUpdate::Date(NaiveDate::from_ymd_opt(2026, 4, 6).unwrap())
        );
        assert_eq!(
            ScheduleFieldUpdate::from_json("branch_id", &json!(null)).unwrap(),
            ScheduleFieldUpdate::BranchId(None)
        );
        assert_eq!(
            ScheduleFieldUpdate::from_json("status", &json!("completed")).unwrap(),
            ScheduleFieldUpdate::Status(ScheduleStatus::Completed)
        );
        assert!(ScheduleFieldUpdate::from_json("area_id", &json!(3)).is_err());
        assert!(ScheduleFieldUpdate::from_json("distributor_id", &json!("x")).is_err());
    }

    #[test]
    fn test_status_can_move_backwards() {
        let mut s = Schedule::new(NaiveDate::from_ymd_opt(2026, 4, 3).unwrap(), 5, None, None);
        ScheduleFieldUpdate::Status(ScheduleStatus::Completed).apply(&mut s);
        ScheduleFieldUpdate::Status(ScheduleStatus::Unstarted).apply(&mut s);
        assert_eq!(s.status, ScheduleStatus::Unstarted);
    }
}

// ==========================================
// 传单配布调度系统 - API DTO 定义
// ==========================================
// 职责: 定义调度/查询/受理接口的请求和响应结构
// 约定: 请求中的日期为 YYYY-MM-DD 字符串，由 API 层解析
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::commitment::{Commitment, OrderFlyerAuthorization};
use crate::domain::demand::DemandUnit;
use crate::domain::schedule::{Schedule, SlotAssignment};
use crate::domain::types::{DistributionMethod, ScheduleStatus};
use crate::engine::alert::SlotAlert;
use crate::engine::allocation::TargetDate;
use crate::engine::listing::ListingRow;

// ==========================================
// 计划创建
// ==========================================

/// 新建空计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    /// 配布日期 (YYYY-MM-DD)
    pub date: String,
    pub area_id: i64,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub distributor_id: Option<i64>,
}

/// 由需求生成计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFromDemandRequest {
    pub demand_id: String,
    /// 操作员请求的日期 (YYYY-MM-DD)
    pub date: String,
    /// 操作员当前视图 (可选，用于判断是否需要扩展视图)
    #[serde(default)]
    pub view_from: Option<String>,
    #[serde(default)]
    pub view_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFromDemandResponse {
    pub schedule: Schedule,
    pub item: SlotAssignment,
    pub target: TargetDate,
    /// 首槽封顶后放回需求池的剩余需求
    pub residual_demand: Option<DemandUnit>,
}

// ==========================================
// 槽位操作
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub schedule_id: String,
    pub slot_index: i64,
    pub demand_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub item_id: String,
    pub target_schedule_id: String,
    pub target_slot_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub item_id: String,
    pub planned_count: i64,
}

/// 删除计划结果
#[derive(Debug, Clone, Serialize)]
pub struct DeleteScheduleResponse {
    pub schedule_id: String,
    /// 放回需求池的需求
    pub returned_demands: Vec<DemandUnit>,
}

// ==========================================
// 列表视图
// ==========================================

/// 列表查询参数 (全部可选)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSchedulesRequest {
    #[serde(default, alias = "from")]
    pub date_from: Option<String>,
    #[serde(default, alias = "to")]
    pub date_to: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default, alias = "sort")]
    pub sort_key: Option<String>,
    #[serde(default, alias = "dir")]
    pub sort_dir: Option<String>,
}

/// 槽位视图 (含实时告警)
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub item_id: String,
    pub slot_index: u8,
    pub flyer_id: i64,
    pub flyer_name: Option<String>,
    pub flyer_code: Option<String>,
    pub order_id: i64,
    pub method: DistributionMethod,
    pub planned_count: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub spare_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub alert: SlotAlert,
}

/// 计划视图 (关联主数据名称 + 槽位)
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub schedule_id: String,
    pub schedule_date: NaiveDate,
    pub area_id: i64,
    pub area_code: Option<String>,
    pub area_name: Option<String>,
    pub branch_id: Option<i64>,
    pub branch_name: Option<String>,
    pub distributor_id: Option<i64>,
    pub distributor_name: Option<String>,
    pub status: ScheduleStatus,
    pub has_alert: bool,
    pub slots: Vec<SlotView>,
}

impl ListingRow for ScheduleView {
    fn schedule_date(&self) -> NaiveDate {
        self.schedule_date
    }

    fn status(&self) -> ScheduleStatus {
        self.status
    }

    fn area_code(&self) -> Option<&str> {
        self.area_code.as_deref()
    }

    fn branch_name(&self) -> Option<&str> {
        self.branch_name.as_deref()
    }

    fn search_texts(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = Vec::with_capacity(self.slots.len() + 2);
        texts.extend(self.distributor_name.as_deref());
        texts.extend(self.area_name.as_deref());
        texts.extend(self.slots.iter().filter_map(|s| s.flyer_name.as_deref()));
        texts
    }
}

// ==========================================
// 订单配布确认 (需求受理)
// ==========================================

/// 选定小区域及其计划份数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaAllocation {
    pub area_id: i64,
    pub planned_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDistributionRequest {
    pub order_id: i64,
    pub flyer_id: i64,
    /// DOOR_TO_DOOR / MULTI_FAMILY / CAPPED_WITH_EXCLUSIONS
    pub method: String,
    /// 订单授权份数 (Commitment 上限)
    pub authorized_count: i64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub spare_date: Option<String>,
    pub areas: Vec<AreaAllocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmDistributionResponse {
    pub authorization: OrderFlyerAuthorization,
    pub demands: Vec<DemandUnit>,
}

/// 承诺视图
#[derive(Debug, Clone, Serialize)]
pub struct CommitmentView {
    pub order_id: i64,
    pub flyer_id: i64,
    pub authorized_count: Option<i64>,
    pub total_assigned: i64,
    pub excess: i64,
    pub is_over: bool,
}

impl From<Commitment> for CommitmentView {
    fn from(c: Commitment) -> Self {
        Self {
            excess: c.excess(),
            is_over: c.is_over(),
            order_id: c.order_id,
            flyer_id: c.flyer_id,
            authorized_count: c.authorized_count,
            total_assigned: c.total_assigned,
        }
    }
}

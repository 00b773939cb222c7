// ==========================================
// 传单配布调度系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录 (与业务写入同一事务)
// 用途: 审计追踪，人工调整复盘
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID
    pub action_type: String,             // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,        // 操作时间戳
    pub actor: String,                   // 操作人

    // ===== 操作对象 =====
    pub target_id: Option<String>,       // 计划ID / 分配ID / 需求ID
    pub schedule_date: Option<NaiveDate>, // 影响的配布日期

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateSchedule,           // 新建计划
    CreateScheduleFromDemand, // 由需求生成计划
    Assign,                   // 需求落位
    MoveItem,                 // 移动落位
    Unassign,                 // 取消落位
    UpdateQuantity,           // 修正份数
    UpdateScheduleField,      // 修改计划字段
    DeleteSchedule,           // 删除计划
    ConfirmDistribution,      // 订单配布确认 (生成需求)
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateSchedule => "CreateSchedule",
            ActionType::CreateScheduleFromDemand => "CreateScheduleFromDemand",
            ActionType::Assign => "Assign",
            ActionType::MoveItem => "MoveItem",
            ActionType::Unassign => "Unassign",
            ActionType::UpdateQuantity => "UpdateQuantity",
            ActionType::UpdateScheduleField => "UpdateScheduleField",
            ActionType::DeleteSchedule => "DeleteSchedule",
            ActionType::ConfirmDistribution => "ConfirmDistribution",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CreateSchedule" => Some(ActionType::CreateSchedule),
            "CreateScheduleFromDemand" => Some(ActionType::CreateScheduleFromDemand),
            "Assign" => Some(ActionType::Assign),
            "MoveItem" => Some(ActionType::MoveItem),
            "Unassign" => Some(ActionType::Unassign),
            "UpdateQuantity" => Some(ActionType::UpdateQuantity),
            "UpdateScheduleField" => Some(ActionType::UpdateScheduleField),
            "DeleteSchedule" => Some(ActionType::DeleteSchedule),
            "ConfirmDistribution" => Some(ActionType::ConfirmDistribution),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        let actor = if actor.trim().is_empty() { "system" } else { actor.trim() };
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            target_id: None,
            schedule_date: None,
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作对象
    pub fn with_target(mut self, target_id: &str) -> Self {
        self.target_id = Some(target_id.to_string());
        self
    }

    /// 设置影响日期
    pub fn with_schedule_date(mut self, date: NaiveDate) -> Self {
        self.schedule_date = Some(date);
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

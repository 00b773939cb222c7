// ==========================================
// 传单配布调度系统 - 领域类型定义
// ==========================================
// 职责: 配布方式 / 计划状态 / 告警原因 / 排序键等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 配布方式 (Distribution Method)
// ==========================================
// 决定从区域产能中取哪一个数值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionMethod {
    DoorToDoor,          // 全户配布
    MultiFamily,         // 集合住宅
    CappedWithExclusions, // 排除指定户后的上限数
}

impl fmt::Display for DistributionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DistributionMethod {
    /// 从字符串解析配布方式（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DOOR_TO_DOOR" => Some(DistributionMethod::DoorToDoor),
            "MULTI_FAMILY" => Some(DistributionMethod::MultiFamily),
            "CAPPED_WITH_EXCLUSIONS" => Some(DistributionMethod::CappedWithExclusions),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DistributionMethod::DoorToDoor => "DOOR_TO_DOOR",
            DistributionMethod::MultiFamily => "MULTI_FAMILY",
            DistributionMethod::CappedWithExclusions => "CAPPED_WITH_EXCLUSIONS",
        }
    }
}

// ==========================================
// 配布计划状态 (Schedule Status)
// ==========================================
// 仅供展示: 不校验迁移顺序，允许回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Unstarted,  // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ScheduleStatus {
    /// 从字符串解析状态（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UNSTARTED" => Some(ScheduleStatus::Unstarted),
            "IN_PROGRESS" => Some(ScheduleStatus::InProgress),
            "COMPLETED" => Some(ScheduleStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Unstarted => "UNSTARTED",
            ScheduleStatus::InProgress => "IN_PROGRESS",
            ScheduleStatus::Completed => "COMPLETED",
        }
    }
}

// ==========================================
// 告警原因 (Alert Reason)
// ==========================================
// 顺序即优先级: OverCount > BeforeStart > OverSpareDate (危险), OverEndDate (警告)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertReason {
    OverCount,     // 超出订单授权数量
    BeforeStart,   // 早于配布开始日
    OverSpareDate, // 超过预备日
    OverEndDate,   // 超过配布结束日
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::OverCount => write!(f, "overCount"),
            AlertReason::BeforeStart => write!(f, "beforeStart"),
            AlertReason::OverSpareDate => write!(f, "overSpareDate"),
            AlertReason::OverEndDate => write!(f, "overEndDate"),
        }
    }
}

// ==========================================
// 列表排序 (Sort Key / Sort Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleSortKey {
    AreaCode, // 区域代码
    Branch,   // 营业所
    Date,     // 配布日期
}

impl ScheduleSortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "areacode" | "area_code" => Some(ScheduleSortKey::AreaCode),
            "branch" => Some(ScheduleSortKey::Branch),
            "date" => Some(ScheduleSortKey::Date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

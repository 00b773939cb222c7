// ==========================================
// 传单配布调度系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、外部协作接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod area;
pub mod commitment;
pub mod demand;
pub mod master;
pub mod schedule;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use area::{AreaCapacity, AreaCapacityProvider};
pub use commitment::{Commitment, OrderFlyerAuthorization};
pub use demand::DemandUnit;
pub use master::{Area, Branch, Distributor, Flyer};
pub use schedule::{is_valid_slot_index, Schedule, ScheduleFieldUpdate, SlotAssignment, MAX_SLOTS};
pub use types::{AlertReason, DistributionMethod, ScheduleSortKey, ScheduleStatus, SortDirection};

// ==========================================
// 传单配布调度系统 - 引擎层
// ==========================================
// 职责: 落位校验、告警派生、列表过滤排序
// 红线: Engine 不拼 SQL, 所有拒绝必须输出 reason
// ==========================================

pub mod alert;
pub mod allocation;
pub mod listing;

// 重导出核心引擎
pub use alert::{AlertCalculator, SlotAlert};
pub use allocation::{
    AllocationEngine, AllocationViolation, CappedCount, PlacementCandidate, SlotOccupant, TargetDate,
};
pub use listing::{ListingEngine, ListingRow, ScheduleFilter};

// ==========================================
// 传单配布调度系统 - 配布计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: dispatch_schedule / slot_assignment
// ==========================================

mod schedule;
mod slot;

#[cfg(test)]
mod tests;

pub use schedule::ScheduleRepository;
pub use slot::SlotAssignmentRepository;

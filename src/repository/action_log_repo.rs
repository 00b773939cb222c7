// ==========================================
// 传单配布调度系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录，且与业务写入同一事务
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
